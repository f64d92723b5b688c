// Path: crates/types/src/ibc/packet.rs
//! Packets, acknowledgements and their commitments.

use super::{ChannelId, Height, PortId, Sequence, Timeout};
use crate::error::IbcError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The value stored under a receipt path.
pub const RECEIPT_MARKER: &[u8] = &[1];

/// An immutable packet. Only its commitment is ever persisted.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Packet {
    /// The sequence allocated by the sending end.
    pub sequence: Sequence,
    /// The sending port.
    pub source_port: PortId,
    /// The sending channel.
    pub source_channel: ChannelId,
    /// The receiving port.
    pub destination_port: PortId,
    /// The receiving channel.
    pub destination_channel: ChannelId,
    /// Opaque application payload.
    pub data: Vec<u8>,
    /// Counterparty height at which the packet times out, zero if unused.
    pub timeout_height: Height,
    /// Counterparty timestamp (nanoseconds) at which the packet times out, zero if unused.
    pub timeout_timestamp: u64,
}

impl Packet {
    /// Returns the packet's timeout bounds.
    pub fn timeout(&self) -> Timeout {
        Timeout::new(self.timeout_height, self.timeout_timestamp)
    }

    /// Returns the commitment the sending end stores for this packet.
    pub fn commitment(&self) -> Vec<u8> {
        packet_commitment(&self.data, self.timeout_height, self.timeout_timestamp)
    }
}

/// `sha256(timeout_timestamp || revision_number || revision_height || sha256(data))`,
/// integers big-endian.
pub fn packet_commitment(data: &[u8], timeout_height: Height, timeout_timestamp: u64) -> Vec<u8> {
    let data_hash = Sha256::digest(data);
    let mut hasher = Sha256::new();
    hasher.update(timeout_timestamp.to_be_bytes());
    hasher.update(timeout_height.revision_number.to_be_bytes());
    hasher.update(timeout_height.revision_height.to_be_bytes());
    hasher.update(data_hash);
    hasher.finalize().to_vec()
}

/// The commitment stored for an acknowledgement.
pub fn ack_commitment(ack: &[u8]) -> Vec<u8> {
    Sha256::digest(ack).to_vec()
}

/// The standard application acknowledgement envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Acknowledgement {
    /// The application processed the packet.
    #[serde(rename = "result")]
    Result(String),
    /// The application rejected the packet.
    #[serde(rename = "error")]
    Error(String),
}

impl Acknowledgement {
    /// A success acknowledgement carrying `result`.
    pub fn success(result: &[u8]) -> Self {
        Self::Result(BASE64.encode(result))
    }

    /// A failure acknowledgement carrying `message`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// Returns true if this acknowledges success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Result(_))
    }

    /// The JSON bytes written to the acknowledgement commitment.
    pub fn to_bytes(&self) -> Result<Vec<u8>, IbcError> {
        serde_json::to_vec(self).map_err(|e| IbcError::Codec(format!("acknowledgement: {e}")))
    }

    /// Parses acknowledgement bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IbcError> {
        serde_json::from_slice(bytes).map_err(|e| IbcError::Codec(format!("acknowledgement: {e}")))
    }

    /// Decodes the success payload.
    pub fn result_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Self::Result(encoded) => BASE64.decode(encoded).ok(),
            Self::Error(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_json_envelope() {
        let ack = Acknowledgement::success(b"ok");
        let bytes = ack.to_bytes().unwrap();
        assert_eq!(bytes, br#"{"result":"b2s="}"#.to_vec());
        assert_eq!(Acknowledgement::from_bytes(&bytes).unwrap(), ack);
        assert_eq!(ack.result_bytes(), Some(b"ok".to_vec()));

        let failed = Acknowledgement::error("boom");
        assert_eq!(failed.to_bytes().unwrap(), br#"{"error":"boom"}"#.to_vec());
        assert!(!failed.is_success());
    }

    #[test]
    fn commitment_binds_timeout() {
        let base = packet_commitment(b"data", Height::new(0, 10), 0);
        assert_eq!(base.len(), 32);
        assert_ne!(base, packet_commitment(b"data", Height::new(0, 11), 0));
        assert_ne!(base, packet_commitment(b"data", Height::new(0, 10), 1));
        assert_ne!(base, packet_commitment(b"other", Height::new(0, 10), 0));
    }
}
