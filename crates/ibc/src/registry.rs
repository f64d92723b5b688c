// Path: crates/ibc/src/registry.rs
//! Light-client verifiers, selected by client type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ioi_api::ibc::ClientVerifier;
use ioi_types::error::IbcError;

/// The verifiers available to `CreateClient` and proof verification.
pub struct VerifierRegistry {
    verifiers: HashMap<String, Arc<dyn ClientVerifier>>,
}

impl fmt::Debug for VerifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierRegistry")
            .field("registered_client_types", &self.verifiers.keys())
            .finish()
    }
}

impl Default for VerifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl VerifierRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            verifiers: HashMap::new(),
        }
    }

    /// Registers a verifier under its client type, replacing any previous one.
    pub fn register(&mut self, verifier: Arc<dyn ClientVerifier>) {
        let client_type = verifier.client_type().to_string();
        tracing::info!(target: "ibc", client_type = %client_type, "registering light client verifier");
        self.verifiers.insert(client_type, verifier);
    }

    /// Returns the verifier for `client_type`.
    pub fn get(&self, client_type: &str) -> Result<Arc<dyn ClientVerifier>, IbcError> {
        self.verifiers
            .get(client_type)
            .cloned()
            .ok_or_else(|| IbcError::ClientTypeNotAllowed(client_type.to_string()))
    }
}
