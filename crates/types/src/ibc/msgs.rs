// Path: crates/types/src/ibc/msgs.rs
//! Relayer-submitted messages, one per externally invocable command.

use super::{
    ChannelCounterparty, ChannelEnd, ChannelId, ChannelState, ClientId, ClientState,
    ConnectionCounterparty, ConnectionId, ConsensusState, ErrorReceipt, Height, Order, Packet,
    PortId, Sequence, Upgrade, UpgradeFields, Version,
};
use crate::error::IbcError;
use parity_scale_codec::{Decode, Encode};

fn require_signer(signer: &str) -> Result<(), IbcError> {
    if signer.trim().is_empty() {
        return Err(IbcError::InvalidMessage("signer cannot be empty".into()));
    }
    Ok(())
}

fn require_proof(name: &str, proof: &[u8]) -> Result<(), IbcError> {
    if proof.is_empty() {
        return Err(IbcError::InvalidMessage(format!("{name} cannot be empty")));
    }
    Ok(())
}

fn require_height(name: &str, height: &Height) -> Result<(), IbcError> {
    if height.is_zero() {
        return Err(IbcError::InvalidMessage(format!("{name} cannot be zero")));
    }
    Ok(())
}

fn require_single_hop(hops: &[ConnectionId]) -> Result<(), IbcError> {
    if hops.len() != 1 {
        return Err(IbcError::InvalidMessage(format!(
            "expected exactly one connection hop, got {}",
            hops.len()
        )));
    }
    Ok(())
}

/// Creates a light client of the counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgCreateClient {
    /// The initial client state.
    pub client_state: ClientState,
    /// The initial consensus state at `client_state.latest_height`.
    pub consensus_state: ConsensusState,
    /// The submitter.
    pub signer: String,
}

/// Updates a client with a new header.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgUpdateClient {
    /// The client to update.
    pub client_id: ClientId,
    /// The verifier-specific header.
    pub client_message: Vec<u8>,
    /// The submitter.
    pub signer: String,
}

/// Submits evidence of counterparty misbehaviour.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgSubmitMisbehaviour {
    /// The client to freeze.
    pub client_id: ClientId,
    /// The verifier-specific evidence.
    pub misbehaviour: Vec<u8>,
    /// The submitter.
    pub signer: String,
}

/// Step 1 of the connection handshake.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgConnectionOpenInit {
    /// The local client tracking the counterparty.
    pub client_id: ClientId,
    /// The counterparty client and prefix; the connection id must be unset.
    pub counterparty: ConnectionCounterparty,
    /// A specific version to propose, or all supported versions if unset.
    pub version: Option<Version>,
    /// Delay period in nanoseconds.
    pub delay_period: u64,
    /// The submitter.
    pub signer: String,
}

/// Step 2 of the connection handshake.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgConnectionOpenTry {
    /// The local client tracking the counterparty.
    pub client_id: ClientId,
    /// The counterparty end, including its INIT connection id.
    pub counterparty: ConnectionCounterparty,
    /// Delay period in nanoseconds.
    pub delay_period: u64,
    /// The versions the counterparty proposed at INIT.
    pub counterparty_versions: Vec<Version>,
    /// Canonical bytes of the counterparty's client state of this chain.
    pub client_state: Vec<u8>,
    /// Canonical bytes of the counterparty's consensus state of this chain at `consensus_height`.
    pub consensus_state: Vec<u8>,
    /// Proof of the counterparty INIT connection.
    pub proof_init: Vec<u8>,
    /// Proof of `client_state`.
    pub proof_client: Vec<u8>,
    /// Proof of `consensus_state`.
    pub proof_consensus: Vec<u8>,
    /// The counterparty height the proofs were taken at.
    pub proof_height: Height,
    /// The host height the counterparty's consensus state refers to.
    pub consensus_height: Height,
    /// The submitter.
    pub signer: String,
}

/// Step 3 of the connection handshake.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgConnectionOpenAck {
    /// The local INIT connection.
    pub connection_id: ConnectionId,
    /// The counterparty TRYOPEN connection.
    pub counterparty_connection_id: ConnectionId,
    /// The version the counterparty picked.
    pub version: Version,
    /// Canonical bytes of the counterparty's client state of this chain.
    pub client_state: Vec<u8>,
    /// Canonical bytes of the counterparty's consensus state of this chain at `consensus_height`.
    pub consensus_state: Vec<u8>,
    /// Proof of the counterparty TRYOPEN connection.
    pub proof_try: Vec<u8>,
    /// Proof of `client_state`.
    pub proof_client: Vec<u8>,
    /// Proof of `consensus_state`.
    pub proof_consensus: Vec<u8>,
    /// The counterparty height the proofs were taken at.
    pub proof_height: Height,
    /// The host height the counterparty's consensus state refers to.
    pub consensus_height: Height,
    /// The submitter.
    pub signer: String,
}

/// Step 4 of the connection handshake.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgConnectionOpenConfirm {
    /// The local TRYOPEN connection.
    pub connection_id: ConnectionId,
    /// Proof of the counterparty OPEN connection.
    pub proof_ack: Vec<u8>,
    /// The counterparty height the proof was taken at.
    pub proof_height: Height,
    /// The submitter.
    pub signer: String,
}

/// Step 1 of the channel handshake.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgChannelOpenInit {
    /// The local port, bound to the owning module.
    pub port_id: PortId,
    /// The requested ordering.
    pub ordering: Order,
    /// The connection to run over.
    pub connection_hops: Vec<ConnectionId>,
    /// The counterparty port.
    pub counterparty_port_id: PortId,
    /// The proposed application version (the module may override it).
    pub version: String,
    /// The submitter.
    pub signer: String,
}

/// Step 2 of the channel handshake.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgChannelOpenTry {
    /// The local port, bound to the owning module.
    pub port_id: PortId,
    /// The ordering of the counterparty INIT channel.
    pub ordering: Order,
    /// The connection to run over.
    pub connection_hops: Vec<ConnectionId>,
    /// The counterparty INIT channel.
    pub counterparty: ChannelCounterparty,
    /// The version stored by the counterparty at INIT.
    pub counterparty_version: String,
    /// Proof of the counterparty INIT channel.
    pub proof_init: Vec<u8>,
    /// The counterparty height the proof was taken at.
    pub proof_height: Height,
    /// The submitter.
    pub signer: String,
}

/// Step 3 of the channel handshake.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgChannelOpenAck {
    /// The local port.
    pub port_id: PortId,
    /// The local INIT channel.
    pub channel_id: ChannelId,
    /// The counterparty TRYOPEN channel.
    pub counterparty_channel_id: ChannelId,
    /// The version the counterparty chose at TRY.
    pub counterparty_version: String,
    /// Proof of the counterparty TRYOPEN channel.
    pub proof_try: Vec<u8>,
    /// The counterparty height the proof was taken at.
    pub proof_height: Height,
    /// The submitter.
    pub signer: String,
}

/// Step 4 of the channel handshake.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgChannelOpenConfirm {
    /// The local port.
    pub port_id: PortId,
    /// The local TRYOPEN channel.
    pub channel_id: ChannelId,
    /// Proof of the counterparty OPEN channel.
    pub proof_ack: Vec<u8>,
    /// The counterparty height the proof was taken at.
    pub proof_height: Height,
    /// The submitter.
    pub signer: String,
}

/// Closes a channel locally.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgChannelCloseInit {
    /// The local port.
    pub port_id: PortId,
    /// The channel to close.
    pub channel_id: ChannelId,
    /// The submitter.
    pub signer: String,
}

/// Closes a channel after the counterparty closed its end.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgChannelCloseConfirm {
    /// The local port.
    pub port_id: PortId,
    /// The channel to close.
    pub channel_id: ChannelId,
    /// Proof of the counterparty CLOSED channel.
    pub proof_init: Vec<u8>,
    /// The counterparty height the proof was taken at.
    pub proof_height: Height,
    /// The counterparty channel's upgrade sequence.
    pub counterparty_upgrade_sequence: u64,
    /// The submitter.
    pub signer: String,
}

/// Delivers a packet sent by the counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgRecvPacket {
    /// The packet.
    pub packet: Packet,
    /// Proof of the packet commitment on the sender.
    pub proof_commitment: Vec<u8>,
    /// The counterparty height the proof was taken at.
    pub proof_height: Height,
    /// The relayer.
    pub signer: String,
}

/// Relays the counterparty's acknowledgement of a sent packet.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgAcknowledgement {
    /// The packet originally sent by this chain.
    pub packet: Packet,
    /// The acknowledgement bytes written by the receiver.
    pub acknowledgement: Vec<u8>,
    /// Proof of the acknowledgement commitment on the receiver.
    pub proof_acked: Vec<u8>,
    /// The counterparty height the proof was taken at.
    pub proof_height: Height,
    /// The relayer.
    pub signer: String,
}

/// Proves a sent packet timed out without being received.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgTimeout {
    /// The packet originally sent by this chain.
    pub packet: Packet,
    /// The receiver's next receive sequence (ORDERED channels).
    pub next_sequence_recv: Sequence,
    /// Proof of receipt absence (UNORDERED) or of `next_sequence_recv` (ORDERED).
    pub proof_unreceived: Vec<u8>,
    /// The counterparty height the proof was taken at.
    pub proof_height: Height,
    /// The relayer.
    pub signer: String,
}

/// Proves a sent packet can never be received because the counterparty closed.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgTimeoutOnClose {
    /// The packet originally sent by this chain.
    pub packet: Packet,
    /// The receiver's next receive sequence (ORDERED channels).
    pub next_sequence_recv: Sequence,
    /// Proof of receipt absence (UNORDERED) or of `next_sequence_recv` (ORDERED).
    pub proof_unreceived: Vec<u8>,
    /// Proof of the counterparty CLOSED channel.
    pub proof_close: Vec<u8>,
    /// The counterparty height the proofs were taken at.
    pub proof_height: Height,
    /// The counterparty channel's upgrade sequence.
    pub counterparty_upgrade_sequence: u64,
    /// The relayer.
    pub signer: String,
}

/// Proposes an in-place channel upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgChannelUpgradeInit {
    /// The local port.
    pub port_id: PortId,
    /// The channel to upgrade.
    pub channel_id: ChannelId,
    /// The proposed fields.
    pub fields: UpgradeFields,
    /// The submitter.
    pub signer: String,
}

/// Accepts the counterparty's upgrade proposal.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgChannelUpgradeTry {
    /// The local port.
    pub port_id: PortId,
    /// The channel to upgrade.
    pub channel_id: ChannelId,
    /// The local hops for the upgraded channel.
    pub proposed_connection_hops: Vec<ConnectionId>,
    /// The counterparty's stored upgrade.
    pub counterparty_upgrade: Upgrade,
    /// The counterparty channel's upgrade sequence.
    pub counterparty_upgrade_sequence: u64,
    /// Proof of the counterparty channel.
    pub proof_channel: Vec<u8>,
    /// Proof of the counterparty upgrade.
    pub proof_upgrade: Vec<u8>,
    /// The counterparty height the proofs were taken at.
    pub proof_height: Height,
    /// The relayer.
    pub signer: String,
}

/// Acknowledges the counterparty's TRY.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgChannelUpgradeAck {
    /// The local port.
    pub port_id: PortId,
    /// The channel to upgrade.
    pub channel_id: ChannelId,
    /// The counterparty's stored upgrade.
    pub counterparty_upgrade: Upgrade,
    /// Proof of the counterparty FLUSHING channel.
    pub proof_channel: Vec<u8>,
    /// Proof of the counterparty upgrade.
    pub proof_upgrade: Vec<u8>,
    /// The counterparty height the proofs were taken at.
    pub proof_height: Height,
    /// The relayer.
    pub signer: String,
}

/// Confirms the counterparty's ACK.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgChannelUpgradeConfirm {
    /// The local port.
    pub port_id: PortId,
    /// The channel to upgrade.
    pub channel_id: ChannelId,
    /// The counterparty channel state (FLUSHING or FLUSHCOMPLETE).
    pub counterparty_channel_state: ChannelState,
    /// The counterparty's stored upgrade.
    pub counterparty_upgrade: Upgrade,
    /// Proof of the counterparty channel.
    pub proof_channel: Vec<u8>,
    /// Proof of the counterparty upgrade.
    pub proof_upgrade: Vec<u8>,
    /// The counterparty height the proofs were taken at.
    pub proof_height: Height,
    /// The relayer.
    pub signer: String,
}

/// Opens the upgraded channel once both ends flushed.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgChannelUpgradeOpen {
    /// The local port.
    pub port_id: PortId,
    /// The channel to open.
    pub channel_id: ChannelId,
    /// The counterparty channel state (FLUSHCOMPLETE or OPEN).
    pub counterparty_channel_state: ChannelState,
    /// The counterparty channel's upgrade sequence.
    pub counterparty_upgrade_sequence: u64,
    /// Proof of the counterparty channel.
    pub proof_channel: Vec<u8>,
    /// The counterparty height the proof was taken at.
    pub proof_height: Height,
    /// The relayer.
    pub signer: String,
}

/// Aborts an upgrade the counterparty failed to finish in time.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgChannelUpgradeTimeout {
    /// The local port.
    pub port_id: PortId,
    /// The channel being upgraded.
    pub channel_id: ChannelId,
    /// The counterparty channel end at `proof_height`.
    pub counterparty_channel: ChannelEnd,
    /// Proof of `counterparty_channel`.
    pub proof_channel: Vec<u8>,
    /// The counterparty height the proof was taken at.
    pub proof_height: Height,
    /// The relayer.
    pub signer: String,
}

/// Aborts an upgrade the counterparty already aborted.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MsgChannelUpgradeCancel {
    /// The local port.
    pub port_id: PortId,
    /// The channel being upgraded.
    pub channel_id: ChannelId,
    /// The counterparty's error receipt.
    pub error_receipt: ErrorReceipt,
    /// Proof of `error_receipt`.
    pub proof_error_receipt: Vec<u8>,
    /// The counterparty height the proof was taken at.
    pub proof_height: Height,
    /// The relayer.
    pub signer: String,
}

/// Any message the core accepts.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum MsgEnvelope {
    /// See [`MsgCreateClient`].
    CreateClient(MsgCreateClient),
    /// See [`MsgUpdateClient`].
    UpdateClient(MsgUpdateClient),
    /// See [`MsgSubmitMisbehaviour`].
    SubmitMisbehaviour(MsgSubmitMisbehaviour),
    /// See [`MsgConnectionOpenInit`].
    ConnectionOpenInit(MsgConnectionOpenInit),
    /// See [`MsgConnectionOpenTry`].
    ConnectionOpenTry(MsgConnectionOpenTry),
    /// See [`MsgConnectionOpenAck`].
    ConnectionOpenAck(MsgConnectionOpenAck),
    /// See [`MsgConnectionOpenConfirm`].
    ConnectionOpenConfirm(MsgConnectionOpenConfirm),
    /// See [`MsgChannelOpenInit`].
    ChannelOpenInit(MsgChannelOpenInit),
    /// See [`MsgChannelOpenTry`].
    ChannelOpenTry(MsgChannelOpenTry),
    /// See [`MsgChannelOpenAck`].
    ChannelOpenAck(MsgChannelOpenAck),
    /// See [`MsgChannelOpenConfirm`].
    ChannelOpenConfirm(MsgChannelOpenConfirm),
    /// See [`MsgChannelCloseInit`].
    ChannelCloseInit(MsgChannelCloseInit),
    /// See [`MsgChannelCloseConfirm`].
    ChannelCloseConfirm(MsgChannelCloseConfirm),
    /// See [`MsgRecvPacket`].
    RecvPacket(MsgRecvPacket),
    /// See [`MsgAcknowledgement`].
    Acknowledgement(MsgAcknowledgement),
    /// See [`MsgTimeout`].
    Timeout(MsgTimeout),
    /// See [`MsgTimeoutOnClose`].
    TimeoutOnClose(MsgTimeoutOnClose),
    /// See [`MsgChannelUpgradeInit`].
    ChannelUpgradeInit(MsgChannelUpgradeInit),
    /// See [`MsgChannelUpgradeTry`].
    ChannelUpgradeTry(MsgChannelUpgradeTry),
    /// See [`MsgChannelUpgradeAck`].
    ChannelUpgradeAck(MsgChannelUpgradeAck),
    /// See [`MsgChannelUpgradeConfirm`].
    ChannelUpgradeConfirm(MsgChannelUpgradeConfirm),
    /// See [`MsgChannelUpgradeOpen`].
    ChannelUpgradeOpen(MsgChannelUpgradeOpen),
    /// See [`MsgChannelUpgradeTimeout`].
    ChannelUpgradeTimeout(MsgChannelUpgradeTimeout),
    /// See [`MsgChannelUpgradeCancel`].
    ChannelUpgradeCancel(MsgChannelUpgradeCancel),
}

impl MsgEnvelope {
    /// A short name for logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::CreateClient(_) => "create_client",
            Self::UpdateClient(_) => "update_client",
            Self::SubmitMisbehaviour(_) => "submit_misbehaviour",
            Self::ConnectionOpenInit(_) => "connection_open_init",
            Self::ConnectionOpenTry(_) => "connection_open_try",
            Self::ConnectionOpenAck(_) => "connection_open_ack",
            Self::ConnectionOpenConfirm(_) => "connection_open_confirm",
            Self::ChannelOpenInit(_) => "channel_open_init",
            Self::ChannelOpenTry(_) => "channel_open_try",
            Self::ChannelOpenAck(_) => "channel_open_ack",
            Self::ChannelOpenConfirm(_) => "channel_open_confirm",
            Self::ChannelCloseInit(_) => "channel_close_init",
            Self::ChannelCloseConfirm(_) => "channel_close_confirm",
            Self::RecvPacket(_) => "recv_packet",
            Self::Acknowledgement(_) => "acknowledgement",
            Self::Timeout(_) => "timeout",
            Self::TimeoutOnClose(_) => "timeout_on_close",
            Self::ChannelUpgradeInit(_) => "channel_upgrade_init",
            Self::ChannelUpgradeTry(_) => "channel_upgrade_try",
            Self::ChannelUpgradeAck(_) => "channel_upgrade_ack",
            Self::ChannelUpgradeConfirm(_) => "channel_upgrade_confirm",
            Self::ChannelUpgradeOpen(_) => "channel_upgrade_open",
            Self::ChannelUpgradeTimeout(_) => "channel_upgrade_timeout",
            Self::ChannelUpgradeCancel(_) => "channel_upgrade_cancel",
        }
    }

    /// Stateless validation run before any state is read.
    pub fn validate_basic(&self) -> Result<(), IbcError> {
        match self {
            Self::CreateClient(m) => {
                require_signer(&m.signer)?;
                require_height("latest height", &m.client_state.latest_height)?;
                if m.client_state.is_frozen() {
                    return Err(IbcError::InvalidMessage(
                        "cannot create a frozen client".into(),
                    ));
                }
                Ok(())
            }
            Self::UpdateClient(m) => {
                require_signer(&m.signer)?;
                require_proof("client message", &m.client_message)
            }
            Self::SubmitMisbehaviour(m) => {
                require_signer(&m.signer)?;
                require_proof("misbehaviour", &m.misbehaviour)
            }
            Self::ConnectionOpenInit(m) => {
                require_signer(&m.signer)?;
                if m.counterparty.connection_id.is_some() {
                    return Err(IbcError::InvalidMessage(
                        "counterparty connection id must be empty at init".into(),
                    ));
                }
                Ok(())
            }
            Self::ConnectionOpenTry(m) => {
                require_signer(&m.signer)?;
                if m.counterparty.connection_id.is_none() {
                    return Err(IbcError::InvalidMessage(
                        "counterparty connection id is required".into(),
                    ));
                }
                if m.counterparty_versions.is_empty() {
                    return Err(IbcError::InvalidMessage(
                        "counterparty versions cannot be empty".into(),
                    ));
                }
                require_proof("proof init", &m.proof_init)?;
                require_proof("proof client", &m.proof_client)?;
                require_proof("proof consensus", &m.proof_consensus)?;
                require_height("proof height", &m.proof_height)?;
                require_height("consensus height", &m.consensus_height)
            }
            Self::ConnectionOpenAck(m) => {
                require_signer(&m.signer)?;
                require_proof("proof try", &m.proof_try)?;
                require_proof("proof client", &m.proof_client)?;
                require_proof("proof consensus", &m.proof_consensus)?;
                require_height("proof height", &m.proof_height)?;
                require_height("consensus height", &m.consensus_height)
            }
            Self::ConnectionOpenConfirm(m) => {
                require_signer(&m.signer)?;
                require_proof("proof ack", &m.proof_ack)?;
                require_height("proof height", &m.proof_height)
            }
            Self::ChannelOpenInit(m) => {
                require_signer(&m.signer)?;
                require_single_hop(&m.connection_hops)
            }
            Self::ChannelOpenTry(m) => {
                require_signer(&m.signer)?;
                require_single_hop(&m.connection_hops)?;
                if m.counterparty.channel_id.is_none() {
                    return Err(IbcError::InvalidMessage(
                        "counterparty channel id is required".into(),
                    ));
                }
                require_proof("proof init", &m.proof_init)?;
                require_height("proof height", &m.proof_height)
            }
            Self::ChannelOpenAck(m) => {
                require_signer(&m.signer)?;
                require_proof("proof try", &m.proof_try)?;
                require_height("proof height", &m.proof_height)
            }
            Self::ChannelOpenConfirm(m) => {
                require_signer(&m.signer)?;
                require_proof("proof ack", &m.proof_ack)?;
                require_height("proof height", &m.proof_height)
            }
            Self::ChannelCloseInit(m) => require_signer(&m.signer),
            Self::ChannelCloseConfirm(m) => {
                require_signer(&m.signer)?;
                require_proof("proof init", &m.proof_init)?;
                require_height("proof height", &m.proof_height)
            }
            Self::RecvPacket(m) => {
                require_signer(&m.signer)?;
                require_proof("proof commitment", &m.proof_commitment)?;
                require_height("proof height", &m.proof_height)
            }
            Self::Acknowledgement(m) => {
                require_signer(&m.signer)?;
                require_proof("acknowledgement", &m.acknowledgement)?;
                require_proof("proof acked", &m.proof_acked)?;
                require_height("proof height", &m.proof_height)
            }
            Self::Timeout(m) => {
                require_signer(&m.signer)?;
                require_proof("proof unreceived", &m.proof_unreceived)?;
                require_height("proof height", &m.proof_height)
            }
            Self::TimeoutOnClose(m) => {
                require_signer(&m.signer)?;
                require_proof("proof unreceived", &m.proof_unreceived)?;
                require_proof("proof close", &m.proof_close)?;
                require_height("proof height", &m.proof_height)
            }
            Self::ChannelUpgradeInit(m) => {
                require_signer(&m.signer)?;
                require_single_hop(&m.fields.connection_hops)?;
                if m.fields.version.trim().is_empty() {
                    return Err(IbcError::InvalidMessage(
                        "upgrade version cannot be empty".into(),
                    ));
                }
                Ok(())
            }
            Self::ChannelUpgradeTry(m) => {
                require_signer(&m.signer)?;
                require_single_hop(&m.proposed_connection_hops)?;
                require_proof("proof channel", &m.proof_channel)?;
                require_proof("proof upgrade", &m.proof_upgrade)?;
                require_height("proof height", &m.proof_height)
            }
            Self::ChannelUpgradeAck(m) => {
                require_signer(&m.signer)?;
                require_proof("proof channel", &m.proof_channel)?;
                require_proof("proof upgrade", &m.proof_upgrade)?;
                require_height("proof height", &m.proof_height)
            }
            Self::ChannelUpgradeConfirm(m) => {
                require_signer(&m.signer)?;
                if !matches!(
                    m.counterparty_channel_state,
                    ChannelState::Flushing | ChannelState::FlushComplete
                ) {
                    return Err(IbcError::InvalidMessage(format!(
                        "counterparty channel state must be FLUSHING or FLUSHCOMPLETE, got {:?}",
                        m.counterparty_channel_state
                    )));
                }
                require_proof("proof channel", &m.proof_channel)?;
                require_proof("proof upgrade", &m.proof_upgrade)?;
                require_height("proof height", &m.proof_height)
            }
            Self::ChannelUpgradeOpen(m) => {
                require_signer(&m.signer)?;
                if !matches!(
                    m.counterparty_channel_state,
                    ChannelState::Open | ChannelState::FlushComplete
                ) {
                    return Err(IbcError::InvalidMessage(format!(
                        "counterparty channel state must be OPEN or FLUSHCOMPLETE, got {:?}",
                        m.counterparty_channel_state
                    )));
                }
                require_proof("proof channel", &m.proof_channel)?;
                require_height("proof height", &m.proof_height)
            }
            Self::ChannelUpgradeTimeout(m) => {
                require_signer(&m.signer)?;
                require_proof("proof channel", &m.proof_channel)?;
                require_height("proof height", &m.proof_height)
            }
            Self::ChannelUpgradeCancel(m) => {
                require_signer(&m.signer)?;
                require_proof("proof error receipt", &m.proof_error_receipt)?;
                require_height("proof height", &m.proof_height)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_basic_rejects_missing_signer_and_proof() {
        let msg = MsgEnvelope::ConnectionOpenConfirm(MsgConnectionOpenConfirm {
            connection_id: ConnectionId::new_indexed(0),
            proof_ack: vec![1],
            proof_height: Height::new(0, 1),
            signer: String::new(),
        });
        assert!(matches!(msg.validate_basic(), Err(IbcError::InvalidMessage(_))));

        let msg = MsgEnvelope::ChannelCloseConfirm(MsgChannelCloseConfirm {
            port_id: PortId::new("transfer").unwrap(),
            channel_id: ChannelId::new_indexed(0),
            proof_init: vec![],
            proof_height: Height::new(0, 1),
            counterparty_upgrade_sequence: 0,
            signer: "relayer".into(),
        });
        assert!(matches!(msg.validate_basic(), Err(IbcError::InvalidMessage(_))));
    }

    #[test]
    fn channel_open_init_requires_one_hop() {
        let msg = MsgEnvelope::ChannelOpenInit(MsgChannelOpenInit {
            port_id: PortId::new("transfer").unwrap(),
            ordering: Order::Unordered,
            connection_hops: vec![],
            counterparty_port_id: PortId::new("transfer").unwrap(),
            version: "ics20-1".into(),
            signer: "relayer".into(),
        });
        assert!(msg.validate_basic().is_err());
    }
}
