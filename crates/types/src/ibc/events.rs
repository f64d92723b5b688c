// Path: crates/types/src/ibc/events.rs
//! Events emitted by the core and by application callbacks.

use super::{ChannelId, ClientId, ConnectionId, Height, Packet, PortId};
use parity_scale_codec::{Decode, Encode};

/// A structured event produced while executing a message.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum IbcEvent {
    /// A client was created.
    CreateClient {
        /// The new client.
        client_id: ClientId,
        /// Its verifier type.
        client_type: String,
        /// The initial consensus height.
        consensus_height: Height,
    },
    /// A client accepted a header.
    UpdateClient {
        /// The updated client.
        client_id: ClientId,
        /// The consensus height that was stored.
        consensus_height: Height,
    },
    /// A client was frozen on misbehaviour evidence.
    ClientMisbehaviour {
        /// The frozen client.
        client_id: ClientId,
    },
    /// A connection entered INIT.
    OpenInitConnection {
        /// The new connection.
        connection_id: ConnectionId,
        /// Its client.
        client_id: ClientId,
    },
    /// A connection entered TRYOPEN.
    OpenTryConnection {
        /// The new connection.
        connection_id: ConnectionId,
        /// Its client.
        client_id: ClientId,
        /// The counterparty connection.
        counterparty_connection_id: ConnectionId,
    },
    /// An INIT connection opened.
    OpenAckConnection {
        /// The connection.
        connection_id: ConnectionId,
        /// The counterparty connection.
        counterparty_connection_id: ConnectionId,
    },
    /// A TRYOPEN connection opened.
    OpenConfirmConnection {
        /// The connection.
        connection_id: ConnectionId,
    },
    /// A channel entered INIT.
    OpenInitChannel {
        /// The local port.
        port_id: PortId,
        /// The new channel.
        channel_id: ChannelId,
        /// The connection it runs over.
        connection_id: ConnectionId,
        /// The stored version.
        version: String,
    },
    /// A channel entered TRYOPEN.
    OpenTryChannel {
        /// The local port.
        port_id: PortId,
        /// The new channel.
        channel_id: ChannelId,
        /// The counterparty channel.
        counterparty_channel_id: ChannelId,
        /// The stored version.
        version: String,
    },
    /// An INIT channel opened.
    OpenAckChannel {
        /// The local port.
        port_id: PortId,
        /// The channel.
        channel_id: ChannelId,
    },
    /// A TRYOPEN channel opened.
    OpenConfirmChannel {
        /// The local port.
        port_id: PortId,
        /// The channel.
        channel_id: ChannelId,
    },
    /// A channel was closed locally.
    CloseInitChannel {
        /// The local port.
        port_id: PortId,
        /// The channel.
        channel_id: ChannelId,
    },
    /// A channel was closed after the counterparty closed.
    CloseConfirmChannel {
        /// The local port.
        port_id: PortId,
        /// The channel.
        channel_id: ChannelId,
    },
    /// An ORDERED channel closed because one of its packets timed out.
    ChannelClosed {
        /// The local port.
        port_id: PortId,
        /// The channel.
        channel_id: ChannelId,
    },
    /// A packet was committed for sending.
    SendPacket {
        /// The packet.
        packet: Packet,
    },
    /// A packet was received.
    RecvPacket {
        /// The packet.
        packet: Packet,
    },
    /// An acknowledgement was written for a received packet.
    WriteAcknowledgement {
        /// The packet.
        packet: Packet,
        /// The acknowledgement bytes.
        acknowledgement: Vec<u8>,
    },
    /// A sent packet was acknowledged.
    AcknowledgePacket {
        /// The packet.
        packet: Packet,
    },
    /// A sent packet timed out.
    TimeoutPacket {
        /// The packet.
        packet: Packet,
    },
    /// A channel upgrade step completed.
    ChannelUpgrade {
        /// The step, e.g. `init` or `open`.
        step: String,
        /// The local port.
        port_id: PortId,
        /// The channel.
        channel_id: ChannelId,
        /// The channel's upgrade sequence after the step.
        upgrade_sequence: u64,
    },
    /// An upgrade attempt was aborted and an error receipt written.
    ChannelUpgradeError {
        /// The local port.
        port_id: PortId,
        /// The channel.
        channel_id: ChannelId,
        /// The aborted upgrade sequence.
        upgrade_sequence: u64,
        /// Why it was aborted.
        message: String,
    },
    /// An application-defined event.
    Module {
        /// The event kind.
        kind: String,
        /// Key/value attributes.
        attributes: Vec<(String, String)>,
    },
}

impl IbcEvent {
    /// Creates an application event.
    pub fn module(kind: impl Into<String>, attributes: Vec<(String, String)>) -> Self {
        Self::Module {
            kind: kind.into(),
            attributes,
        }
    }

    /// The event kind, matching the names relayers index on.
    pub fn kind(&self) -> &str {
        match self {
            Self::CreateClient { .. } => "create_client",
            Self::UpdateClient { .. } => "update_client",
            Self::ClientMisbehaviour { .. } => "client_misbehaviour",
            Self::OpenInitConnection { .. } => "connection_open_init",
            Self::OpenTryConnection { .. } => "connection_open_try",
            Self::OpenAckConnection { .. } => "connection_open_ack",
            Self::OpenConfirmConnection { .. } => "connection_open_confirm",
            Self::OpenInitChannel { .. } => "channel_open_init",
            Self::OpenTryChannel { .. } => "channel_open_try",
            Self::OpenAckChannel { .. } => "channel_open_ack",
            Self::OpenConfirmChannel { .. } => "channel_open_confirm",
            Self::CloseInitChannel { .. } => "channel_close_init",
            Self::CloseConfirmChannel { .. } => "channel_close_confirm",
            Self::ChannelClosed { .. } => "channel_closed",
            Self::SendPacket { .. } => "send_packet",
            Self::RecvPacket { .. } => "recv_packet",
            Self::WriteAcknowledgement { .. } => "write_acknowledgement",
            Self::AcknowledgePacket { .. } => "acknowledge_packet",
            Self::TimeoutPacket { .. } => "timeout_packet",
            Self::ChannelUpgrade { .. } => "channel_upgrade",
            Self::ChannelUpgradeError { .. } => "channel_upgrade_error",
            Self::Module { kind, .. } => kind,
        }
    }
}
