// Path: crates/types/src/ibc/channel.rs
//! Channel ends (ICS-04).

use super::{ChannelId, ConnectionId, PortId};
use crate::error::IbcError;
use parity_scale_codec::{Decode, Encode};
use std::fmt;

/// The state of a channel end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum ChannelState {
    /// No channel is stored.
    Uninitialized,
    /// The handshake was started locally.
    Init,
    /// The handshake was started by the counterparty and accepted locally.
    TryOpen,
    /// The channel carries packets.
    Open,
    /// The channel is closed for good.
    Closed,
    /// An upgrade is draining in-flight packets.
    Flushing,
    /// All local in-flight packets of the pre-upgrade channel are settled.
    FlushComplete,
}

/// The delivery guarantee of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum Order {
    /// Packets may be received in any order, each exactly once.
    Unordered,
    /// Packets are received strictly in sequence; a timeout closes the channel.
    Ordered,
}

impl Order {
    /// The connection version feature that allows this ordering.
    pub fn as_feature(&self) -> &'static str {
        match self {
            Order::Unordered => "ORDER_UNORDERED",
            Order::Ordered => "ORDER_ORDERED",
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_feature())
    }
}

/// The counterparty of a channel end.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ChannelCounterparty {
    /// The counterparty port.
    pub port_id: PortId,
    /// The counterparty channel, unknown until the counterparty runs its step.
    pub channel_id: Option<ChannelId>,
}

impl ChannelCounterparty {
    /// Creates a counterparty reference.
    pub fn new(port_id: PortId, channel_id: Option<ChannelId>) -> Self {
        Self {
            port_id,
            channel_id,
        }
    }
}

/// One end of a channel between two application modules.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ChannelEnd {
    /// The handshake / upgrade state.
    pub state: ChannelState,
    /// The delivery guarantee.
    pub ordering: Order,
    /// The counterparty end.
    pub counterparty: ChannelCounterparty,
    /// The connections the channel runs over (exactly one hop).
    pub connection_hops: Vec<ConnectionId>,
    /// The application version negotiated by the modules.
    pub version: String,
    /// The number of upgrades attempted on this channel.
    pub upgrade_sequence: u64,
}

impl ChannelEnd {
    /// Returns true if the channel is OPEN.
    pub fn is_open(&self) -> bool {
        self.state == ChannelState::Open
    }

    /// Fails unless the channel is in one of `expected`.
    pub fn verify_state(&self, expected: &[ChannelState]) -> Result<(), IbcError> {
        if expected.contains(&self.state) {
            Ok(())
        } else {
            Err(IbcError::InvalidChannelState {
                expected: expected.to_vec(),
                actual: self.state,
            })
        }
    }

    /// Returns the single connection hop.
    pub fn connection_id(&self) -> Result<&ConnectionId, IbcError> {
        match self.connection_hops.as_slice() {
            [hop] => Ok(hop),
            hops => Err(IbcError::InvalidState(format!(
                "channel must have exactly one connection hop, found {}",
                hops.len()
            ))),
        }
    }

    /// Returns the counterparty channel identifier.
    pub fn counterparty_channel_id(&self) -> Result<&ChannelId, IbcError> {
        self.counterparty
            .channel_id
            .as_ref()
            .ok_or_else(|| IbcError::InvalidState("counterparty channel id not set".into()))
    }
}
