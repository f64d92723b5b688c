// Path: crates/types/src/ibc/client.rs
//! On-chain representation of a counterparty light client.

use super::Height;
use parity_scale_codec::{Decode, Encode};

/// The stored state of a light client tracking a counterparty chain.
///
/// `data` is opaque to the core and is interpreted only by the verifier
/// registered for `client_type`.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ClientState {
    /// The client-type tag selecting the verifier (e.g. `07-tendermint`).
    pub client_type: String,
    /// The latest height the client has a consensus state for.
    pub latest_height: Height,
    /// Set once misbehaviour has been proven. A frozen client never unfreezes.
    pub frozen_height: Option<Height>,
    /// Verifier-specific client parameters.
    pub data: Vec<u8>,
}

impl ClientState {
    /// Returns true if the client has been frozen by misbehaviour.
    pub fn is_frozen(&self) -> bool {
        self.frozen_height.is_some()
    }

    /// Returns the client's current status.
    pub fn status(&self) -> ClientStatus {
        if self.is_frozen() {
            ClientStatus::Frozen
        } else {
            ClientStatus::Active
        }
    }
}

/// A trusted snapshot of the counterparty at one height.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ConsensusState {
    /// The counterparty block timestamp in nanoseconds.
    pub timestamp: u64,
    /// The counterparty commitment root proofs are verified against.
    pub root: Vec<u8>,
    /// Verifier-specific consensus data (e.g. next validator hash).
    pub data: Vec<u8>,
}

/// Host-side bookkeeping for when a consensus state was stored, used to
/// enforce connection delay periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct ConsensusMeta {
    /// Host timestamp at which the consensus state was stored.
    pub processed_time: u64,
    /// Host height at which the consensus state was stored.
    pub processed_height: Height,
}

/// The usability of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatus {
    /// The client accepts updates and verifies proofs.
    Active,
    /// The client was frozen by misbehaviour.
    Frozen,
}

/// The result of applying a verified client message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientUpdate {
    /// The height of the new consensus state.
    pub height: Height,
    /// The new consensus state.
    pub consensus_state: ConsensusState,
}
