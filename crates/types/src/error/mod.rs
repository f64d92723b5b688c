// Path: crates/types/src/error/mod.rs
//! Core error types for the IBC core.

use crate::ibc::{ChannelState, ConnectionState, Height, Sequence};
use thiserror::Error;

/// Errors related to the key/value store backing the IBC state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The requested key was not found in the state.
    #[error("Key not found: {0}")]
    KeyNotFound(String),
    /// An error occurred in the state backend.
    #[error("State backend error: {0}")]
    Backend(String),
    /// The stored value could not be decoded.
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Errors returned by light-client verifiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The proof does not verify against the trusted root.
    #[error("Invalid proof: {0}")]
    InvalidProof(String),
    /// No consensus state is stored for the requested height.
    #[error("Consensus state not found at height {0}")]
    ConsensusStateNotFound(Height),
    /// The client message (header, misbehaviour) is malformed or does not verify.
    #[error("Invalid client message: {0}")]
    InvalidClientMessage(String),
    /// The client state or consensus state is malformed.
    #[error("Invalid client state: {0}")]
    InvalidClientState(String),
    /// A state access failed while the verifier was reading consensus data.
    #[error("State error: {0}")]
    State(#[from] StateError),
}

/// The error taxonomy of the transport, authentication and ordering layer.
///
/// Every variant aborts the current message without side effects. Replayed or
/// already-processed messages are not errors: they are reported as
/// `ResponseResult::NoOp`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IbcError {
    /// A counterparty proof failed verification.
    #[error("Proof verification failed for path {path}: {reason}")]
    ProofVerificationFailed {
        /// The counterparty store path that was proven.
        path: String,
        /// The verifier's rejection reason.
        reason: String,
    },
    /// The caller did not present a valid capability for the path.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// The capability path is already bound.
    #[error("Capability already claimed: {0}")]
    CapabilityAlreadyClaimed(String),
    /// A handshake step was attempted from the wrong connection state.
    #[error("Invalid connection state: expected {expected:?}, found {actual:?}")]
    InvalidConnectionState {
        /// The state the step requires.
        expected: ConnectionState,
        /// The stored state.
        actual: ConnectionState,
    },
    /// A handshake, packet or upgrade step was attempted from the wrong channel state.
    #[error("Invalid channel state: expected one of {expected:?}, found {actual:?}")]
    InvalidChannelState {
        /// The states the step accepts.
        expected: Vec<ChannelState>,
        /// The stored state.
        actual: ChannelState,
    },
    /// Generic precondition failure not covered by a more specific variant.
    #[error("Invalid state: {0}")]
    InvalidState(String),
    /// An ORDERED channel received a sequence out of order.
    #[error("Sequence mismatch: expected {expected}, got {got}")]
    SequenceMismatch {
        /// The next expected sequence.
        expected: Sequence,
        /// The sequence carried by the message.
        got: Sequence,
    },
    /// A timeout was submitted before the packet's timeout elapsed on the counterparty.
    #[error("Timeout not reached for sequence {sequence}: proof height {proof_height}, counterparty timestamp {timestamp}")]
    TimeoutNotReached {
        /// The packet sequence.
        sequence: Sequence,
        /// The height of the submitted proof.
        proof_height: Height,
        /// The counterparty timestamp at the proof height.
        timestamp: u64,
    },
    /// The packet timeout has already elapsed.
    #[error("Packet with sequence {0} has already timed out")]
    PacketAlreadyTimedOut(Sequence),
    /// The packet has neither a timeout height nor a timeout timestamp.
    #[error("Invalid packet timeout: {0}")]
    InvalidTimeout(String),
    /// An identifier violates the ICS-24 host identifier rules.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    /// A message failed stateless validation.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),
    /// No client is stored under the identifier.
    #[error("Client not found: {0}")]
    ClientNotFound(String),
    /// The client is frozen and can no longer be used.
    #[error("Client {0} is frozen")]
    ClientFrozen(String),
    /// The client type has no registered verifier or is not enabled.
    #[error("Client type not allowed: {0}")]
    ClientTypeNotAllowed(String),
    /// A client update or misbehaviour submission was rejected.
    #[error("Client {client_id} rejected message: {reason}")]
    ClientUpdateFailed {
        /// The client identifier.
        client_id: String,
        /// The verifier's rejection reason.
        reason: String,
    },
    /// No connection is stored under the identifier.
    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),
    /// No channel is stored under the port/channel pair.
    #[error("Channel not found: port {port_id}, channel {channel_id}")]
    ChannelNotFound {
        /// The port identifier.
        port_id: String,
        /// The channel identifier.
        channel_id: String,
    },
    /// The port is not bound to any module.
    #[error("Port {0} is not bound")]
    PortNotBound(String),
    /// The module owning a port has no route in the router.
    #[error("No route found to module {0}")]
    RouteNotFound(String),
    /// Version negotiation found no common version.
    #[error("No common version: {0}")]
    NoCommonVersion(String),
    /// The proposed version is not supported.
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(String),
    /// The channel ordering is not allowed by the connection version.
    #[error("Ordering {0} not supported by connection version")]
    UnsupportedOrdering(String),
    /// The connection delay period has not elapsed for the proof height.
    #[error("Delay period not passed: {0}")]
    DelayPeriodNotPassed(String),
    /// The stored packet commitment does not match the packet.
    #[error("Packet commitment mismatch for sequence {0}")]
    CommitmentMismatch(Sequence),
    /// An acknowledgement is already written for the sequence.
    #[error("Acknowledgement already exists for sequence {0}")]
    AcknowledgementExists(Sequence),
    /// The packet's source/destination does not match the channel counterparty.
    #[error("Packet route mismatch: {0}")]
    InvalidPacketRoute(String),
    /// A channel upgrade step failed a precondition.
    #[error("Channel upgrade error: {0}")]
    Upgrade(String),
    /// No upgrade is in progress for the channel.
    #[error("Upgrade not found for port {port_id}, channel {channel_id}")]
    UpgradeNotFound {
        /// The port identifier.
        port_id: String,
        /// The channel identifier.
        channel_id: String,
    },
    /// An application callback rejected the step.
    #[error("Application callback failed for port {port_id}, channel {channel_id}: {reason}")]
    AppCallback {
        /// The port identifier.
        port_id: String,
        /// The channel identifier.
        channel_id: String,
        /// The application's error message.
        reason: String,
    },
    /// A light-client verifier failed for a reason other than an invalid proof.
    #[error("Client error: {0}")]
    Client(#[from] ClientError),
    /// An error occurred while accessing the state.
    #[error("State error: {0}")]
    State(#[from] StateError),
    /// A stored or submitted value could not be decoded.
    #[error("Codec error: {0}")]
    Codec(String),
    /// The service entry point was called with an unknown method.
    #[error("IBC service does not support method '{0}'")]
    UnsupportedMethod(String),
}
