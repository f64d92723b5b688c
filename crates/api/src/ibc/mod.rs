// Path: crates/api/src/ibc/mod.rs
//! The light-client verification contract the IBC core depends on.
//!
//! The core never interprets headers, proofs or consensus data itself. It
//! selects a [`ClientVerifier`] by the client's type tag and hands it a
//! [`ClientContext`] with read access to the client's stored consensus states.

use ioi_types::codec::from_bytes_canonical;
use ioi_types::error::{ClientError, StateError};
use ioi_types::ibc::{ClientId, ClientState, ClientUpdate, ConsensusState, Height, MerklePath, Path};

use crate::state::StateAccessor;

/// Read-only access to one client's stored state, handed to verifiers.
pub struct ClientContext<'a> {
    /// The client being verified against.
    pub client_id: &'a ClientId,
    /// Its current client state.
    pub client_state: &'a ClientState,
    store: &'a dyn StateAccessor,
}

impl<'a> ClientContext<'a> {
    /// Creates a context over `store`.
    pub fn new(
        client_id: &'a ClientId,
        client_state: &'a ClientState,
        store: &'a dyn StateAccessor,
    ) -> Self {
        Self {
            client_id,
            client_state,
            store,
        }
    }

    /// Loads the consensus state stored at `height`, if any.
    pub fn try_consensus_state(&self, height: Height) -> Result<Option<ConsensusState>, ClientError> {
        let key = Path::ClientConsensusState(self.client_id.clone(), height).to_key();
        match self.store.get(&key)? {
            Some(bytes) => from_bytes_canonical(&bytes)
                .map(Some)
                .map_err(|e| ClientError::State(StateError::InvalidValue(e))),
            None => Ok(None),
        }
    }

    /// Loads the consensus state stored at `height`.
    pub fn consensus_state(&self, height: Height) -> Result<ConsensusState, ClientError> {
        self.try_consensus_state(height)?
            .ok_or(ClientError::ConsensusStateNotFound(height))
    }
}

/// A light-client verifier for one client type.
///
/// Implementations must be pure: the same inputs always give the same result
/// and nothing is written. State changes derived from a client message are
/// returned from [`ClientVerifier::update_state`] and persisted by the core.
pub trait ClientVerifier: Send + Sync {
    /// The client-type tag this verifier handles (e.g. `07-tendermint`).
    fn client_type(&self) -> &str;

    /// Validates the initial state of a client about to be created.
    fn validate_initial_state(
        &self,
        _client_state: &ClientState,
        _consensus_state: &ConsensusState,
    ) -> Result<(), ClientError> {
        Ok(())
    }

    /// Verifies that `value` is stored at `path` in the counterparty state at `height`.
    fn verify_membership(
        &self,
        ctx: &ClientContext<'_>,
        height: Height,
        proof: &[u8],
        path: &MerklePath,
        value: &[u8],
    ) -> Result<(), ClientError>;

    /// Verifies that nothing is stored at `path` in the counterparty state at `height`.
    fn verify_non_membership(
        &self,
        ctx: &ClientContext<'_>,
        height: Height,
        proof: &[u8],
        path: &MerklePath,
    ) -> Result<(), ClientError>;

    /// Returns the counterparty block timestamp (nanoseconds) at `height`.
    fn timestamp_at_height(&self, ctx: &ClientContext<'_>, height: Height) -> Result<u64, ClientError> {
        Ok(ctx.consensus_state(height)?.timestamp)
    }

    /// Verifies a header or misbehaviour submission.
    fn verify_client_message(&self, ctx: &ClientContext<'_>, message: &[u8]) -> Result<(), ClientError>;

    /// Returns true if `message` proves the counterparty misbehaved.
    fn check_for_misbehaviour(&self, ctx: &ClientContext<'_>, message: &[u8]) -> Result<bool, ClientError>;

    /// Derives the new consensus state from a verified header.
    fn update_state(&self, ctx: &ClientContext<'_>, message: &[u8]) -> Result<ClientUpdate, ClientError>;
}
