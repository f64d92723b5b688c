// Path: crates/types/src/ibc/response.rs
//! Per-message results returned to the submitter.

use super::{ChannelId, ClientId, ConnectionId, IbcEvent, Upgrade};
use parity_scale_codec::{Decode, Encode};

/// Whether a packet or upgrade message changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum ResponseResult {
    /// State transitioned.
    Success,
    /// The message was redundant (already relayed) and nothing changed.
    NoOp,
    /// The message was processed but the operation it requested was aborted.
    Failure,
}

/// The typed response for each message kind.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum MsgResponse {
    /// The id of the created client.
    CreateClient {
        /// The new client.
        client_id: ClientId,
    },
    /// The client was updated (or was already at that height).
    UpdateClient,
    /// Evidence was processed.
    SubmitMisbehaviour,
    /// The id of the created connection.
    ConnectionOpenInit {
        /// The new connection.
        connection_id: ConnectionId,
    },
    /// The id of the created connection.
    ConnectionOpenTry {
        /// The new connection.
        connection_id: ConnectionId,
    },
    /// The connection opened.
    ConnectionOpenAck,
    /// The connection opened.
    ConnectionOpenConfirm,
    /// The created channel and its stored version.
    ChannelOpenInit {
        /// The new channel.
        channel_id: ChannelId,
        /// The version the module chose.
        version: String,
    },
    /// The created channel and its stored version.
    ChannelOpenTry {
        /// The new channel.
        channel_id: ChannelId,
        /// The version the module chose.
        version: String,
    },
    /// The channel opened.
    ChannelOpenAck,
    /// The channel opened.
    ChannelOpenConfirm,
    /// The channel closed.
    ChannelCloseInit,
    /// The channel closed.
    ChannelCloseConfirm,
    /// Outcome of a packet receipt.
    RecvPacket(ResponseResult),
    /// Outcome of an acknowledgement.
    Acknowledgement(ResponseResult),
    /// Outcome of a timeout.
    Timeout(ResponseResult),
    /// Outcome of a timeout on close.
    TimeoutOnClose(ResponseResult),
    /// The stored upgrade and the channel's new upgrade sequence.
    ChannelUpgradeInit {
        /// The stored proposal.
        upgrade: Upgrade,
        /// The channel's upgrade sequence.
        upgrade_sequence: u64,
    },
    /// Outcome of an upgrade TRY.
    ChannelUpgradeTry {
        /// Success, or Failure when the attempt was aborted.
        result: ResponseResult,
        /// The stored proposal on success.
        upgrade: Option<Upgrade>,
        /// The channel's upgrade sequence.
        upgrade_sequence: u64,
    },
    /// Outcome of an upgrade ACK.
    ChannelUpgradeAck(ResponseResult),
    /// Outcome of an upgrade CONFIRM.
    ChannelUpgradeConfirm(ResponseResult),
    /// The upgraded channel opened.
    ChannelUpgradeOpen,
    /// The upgrade timed out and was aborted.
    ChannelUpgradeTimeout,
    /// The upgrade was cancelled.
    ChannelUpgradeCancel,
}

impl MsgResponse {
    /// The packet or upgrade result carried by this response, `Success` otherwise.
    pub fn result(&self) -> ResponseResult {
        match self {
            Self::RecvPacket(r)
            | Self::Acknowledgement(r)
            | Self::Timeout(r)
            | Self::TimeoutOnClose(r)
            | Self::ChannelUpgradeAck(r)
            | Self::ChannelUpgradeConfirm(r) => *r,
            Self::ChannelUpgradeTry { result, .. } => *result,
            _ => ResponseResult::Success,
        }
    }
}

/// A committed message: its response and the events it emitted, in order.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgOutcome {
    /// The typed response.
    pub response: MsgResponse,
    /// Events from the core and from application callbacks.
    pub events: Vec<IbcEvent>,
}
