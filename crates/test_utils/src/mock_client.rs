// Path: crates/test_utils/src/mock_client.rs
//! A hash-based light client for tests.
//!
//! A mock "proof" is a digest binding the counterparty's state root at the
//! proof height to the proven path and value. The prover ([`crate::MockChain`])
//! only emits membership proofs for values it actually stores and absence
//! proofs for keys it does not, so a proof verifies exactly when the claimed
//! state existed at that height.

use ioi_api::ibc::{ClientContext, ClientVerifier};
use ioi_types::codec::from_bytes_canonical;
use ioi_types::error::ClientError;
use ioi_types::ibc::{ClientState, ClientUpdate, ConsensusState, Height, MerklePath};
use parity_scale_codec::{Decode, Encode};
use sha2::{Digest, Sha256};

/// The client type served by [`MockVerifier`].
pub const MOCK_CLIENT_TYPE: &str = "9999-mock";

/// A header of the mock counterparty chain.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MockHeader {
    /// The header height.
    pub height: Height,
    /// The block timestamp in nanoseconds.
    pub timestamp: u64,
    /// The state root committed at `height`.
    pub root: Vec<u8>,
}

impl MockHeader {
    /// The consensus state a client stores for this header.
    pub fn consensus_state(&self) -> ConsensusState {
        ConsensusState {
            timestamp: self.timestamp,
            root: self.root.clone(),
            data: Vec::new(),
        }
    }

    /// A fresh client state whose latest height is this header's.
    pub fn client_state(&self) -> ClientState {
        ClientState {
            client_type: MOCK_CLIENT_TYPE.to_string(),
            latest_height: self.height,
            frozen_height: None,
            data: Vec::new(),
        }
    }
}

fn proof_digest(tag: &[u8], root: &[u8], path: &MerklePath, value: Option<&[u8]>) -> Vec<u8> {
    let mut hasher = Sha256::new();
    for part in [tag, root, path.prefix.as_slice(), path.path.as_bytes()] {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    if let Some(value) = value {
        hasher.update((value.len() as u64).to_be_bytes());
        hasher.update(value);
    }
    hasher.finalize().to_vec()
}

/// Proof that `value` is stored at `path` under `root`.
pub fn membership_proof(root: &[u8], path: &MerklePath, value: &[u8]) -> Vec<u8> {
    proof_digest(b"member", root, path, Some(value))
}

/// Proof that nothing is stored at `path` under `root`.
pub fn non_membership_proof(root: &[u8], path: &MerklePath) -> Vec<u8> {
    proof_digest(b"absent", root, path, None)
}

/// Verifies mock proofs against the roots of stored consensus states.
#[derive(Debug, Default, Clone)]
pub struct MockVerifier;

impl MockVerifier {
    fn decode_header(message: &[u8]) -> Result<MockHeader, ClientError> {
        from_bytes_canonical(message).map_err(ClientError::InvalidClientMessage)
    }
}

impl ClientVerifier for MockVerifier {
    fn client_type(&self) -> &str {
        MOCK_CLIENT_TYPE
    }

    fn validate_initial_state(
        &self,
        client_state: &ClientState,
        consensus_state: &ConsensusState,
    ) -> Result<(), ClientError> {
        if client_state.latest_height.is_zero() {
            return Err(ClientError::InvalidClientState("latest height is zero".into()));
        }
        if consensus_state.root.is_empty() {
            return Err(ClientError::InvalidClientState("empty root".into()));
        }
        Ok(())
    }

    fn verify_membership(
        &self,
        ctx: &ClientContext<'_>,
        height: Height,
        proof: &[u8],
        path: &MerklePath,
        value: &[u8],
    ) -> Result<(), ClientError> {
        let consensus = ctx.consensus_state(height)?;
        if proof != membership_proof(&consensus.root, path, value).as_slice() {
            return Err(ClientError::InvalidProof(format!(
                "membership proof for {path} does not match root at {height}"
            )));
        }
        Ok(())
    }

    fn verify_non_membership(
        &self,
        ctx: &ClientContext<'_>,
        height: Height,
        proof: &[u8],
        path: &MerklePath,
    ) -> Result<(), ClientError> {
        let consensus = ctx.consensus_state(height)?;
        if proof != non_membership_proof(&consensus.root, path).as_slice() {
            return Err(ClientError::InvalidProof(format!(
                "absence proof for {path} does not match root at {height}"
            )));
        }
        Ok(())
    }

    fn verify_client_message(&self, _ctx: &ClientContext<'_>, message: &[u8]) -> Result<(), ClientError> {
        let header = Self::decode_header(message)?;
        if header.height.is_zero() || header.root.is_empty() {
            return Err(ClientError::InvalidClientMessage(
                "header needs a height and a root".into(),
            ));
        }
        Ok(())
    }

    fn check_for_misbehaviour(&self, ctx: &ClientContext<'_>, message: &[u8]) -> Result<bool, ClientError> {
        let header = Self::decode_header(message)?;
        Ok(ctx
            .try_consensus_state(header.height)?
            .is_some_and(|existing| existing.root != header.root))
    }

    fn update_state(&self, _ctx: &ClientContext<'_>, message: &[u8]) -> Result<ClientUpdate, ClientError> {
        let header = Self::decode_header(message)?;
        Ok(ClientUpdate {
            height: header.height,
            consensus_state: header.consensus_state(),
        })
    }
}
