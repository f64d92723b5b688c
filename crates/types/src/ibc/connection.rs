// Path: crates/types/src/ibc/connection.rs
//! Connection ends and version negotiation (ICS-03).

use super::{ClientId, ConnectionId, Order};
use crate::error::IbcError;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// The state of a connection end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum ConnectionState {
    /// No connection is stored.
    Uninitialized,
    /// The handshake was started locally.
    Init,
    /// The handshake was started by the counterparty and accepted locally.
    TryOpen,
    /// The handshake is complete.
    Open,
}

/// The store prefix under which a chain commits its IBC state.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct CommitmentPrefix(Vec<u8>);

impl CommitmentPrefix {
    /// Creates a prefix. Empty prefixes are rejected.
    pub fn new(prefix: impl Into<Vec<u8>>) -> Result<Self, IbcError> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(IbcError::InvalidMessage(
                "commitment prefix cannot be empty".into(),
            ));
        }
        Ok(Self(prefix))
    }

    /// Returns the prefix bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// The counterparty of a connection end.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ConnectionCounterparty {
    /// The client on the counterparty that tracks this chain.
    pub client_id: ClientId,
    /// The counterparty connection, unknown until the counterparty runs its step.
    pub connection_id: Option<ConnectionId>,
    /// The counterparty's commitment prefix.
    pub prefix: CommitmentPrefix,
}

/// A connection version: an identifier plus the feature set it allows.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct Version {
    /// The version identifier.
    pub identifier: String,
    /// The features (channel orderings) the version allows.
    pub features: Vec<String>,
}

impl Version {
    /// Returns true if the version lists `feature`.
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// Checks that channels of `ordering` may be opened over this version.
    pub fn verify_supported_ordering(&self, ordering: Order) -> Result<(), IbcError> {
        if self.has_feature(ordering.as_feature()) {
            Ok(())
        } else {
            Err(IbcError::UnsupportedOrdering(ordering.as_feature().into()))
        }
    }
}

impl Default for Version {
    fn default() -> Self {
        Self {
            identifier: "1".into(),
            features: vec![
                Order::Ordered.as_feature().into(),
                Order::Unordered.as_feature().into(),
            ],
        }
    }
}

/// Returns true if `proposed` is a subset of one of the `supported` versions.
pub fn is_supported_version(supported: &[Version], proposed: &Version) -> bool {
    supported.iter().any(|v| {
        v.identifier == proposed.identifier
            && !proposed.features.is_empty()
            && proposed.features.iter().all(|f| v.has_feature(f))
    })
}

/// Picks the version to use from the counterparty's proposal.
///
/// Walks `supported` in preference order and returns the first version whose
/// identifier the counterparty also proposes, restricted to the feature
/// intersection. Fails if no identifier matches or the intersection of
/// features is empty.
pub fn pick_version(supported: &[Version], counterparty: &[Version]) -> Result<Version, IbcError> {
    for ours in supported {
        let Some(theirs) = counterparty
            .iter()
            .find(|v| v.identifier == ours.identifier)
        else {
            continue;
        };
        let features: Vec<String> = ours
            .features
            .iter()
            .filter(|f| theirs.has_feature(f))
            .cloned()
            .collect();
        if features.is_empty() {
            return Err(IbcError::NoCommonVersion(format!(
                "no common features for version {}",
                ours.identifier
            )));
        }
        return Ok(Version {
            identifier: ours.identifier.clone(),
            features,
        });
    }
    Err(IbcError::NoCommonVersion(
        "no version identifier in common with counterparty".into(),
    ))
}

/// One end of a connection between two clients.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ConnectionEnd {
    /// The handshake state.
    pub state: ConnectionState,
    /// The local client tracking the counterparty.
    pub client_id: ClientId,
    /// The counterparty end.
    pub counterparty: ConnectionCounterparty,
    /// Candidate versions while in INIT, the negotiated version afterwards.
    pub versions: Vec<Version>,
    /// Delay period in nanoseconds applied to packet proofs.
    pub delay_period: u64,
}

impl ConnectionEnd {
    /// Returns true if the connection is OPEN.
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Returns the negotiated version of an established connection.
    pub fn version(&self) -> Result<&Version, IbcError> {
        match self.versions.as_slice() {
            [version] => Ok(version),
            _ => Err(IbcError::InvalidState(format!(
                "connection has {} versions, expected exactly one",
                self.versions.len()
            ))),
        }
    }

    /// Returns the counterparty connection identifier.
    pub fn counterparty_connection_id(&self) -> Result<&ConnectionId, IbcError> {
        self.counterparty
            .connection_id
            .as_ref()
            .ok_or_else(|| IbcError::InvalidState("counterparty connection id not set".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(id: &str, features: &[&str]) -> Version {
        Version {
            identifier: id.into(),
            features: features.iter().map(|f| f.to_string()).collect(),
        }
    }

    #[test]
    fn pick_version_intersects_features() {
        let supported = vec![Version::default()];
        let counterparty = vec![version("1", &["ORDER_UNORDERED", "ORDER_DAG"])];
        let picked = pick_version(&supported, &counterparty).unwrap();
        assert_eq!(picked, version("1", &["ORDER_UNORDERED"]));
    }

    #[test]
    fn pick_version_fails_on_empty_intersection() {
        let supported = vec![Version::default()];
        assert!(matches!(
            pick_version(&supported, &[version("1", &["ORDER_DAG"])]),
            Err(IbcError::NoCommonVersion(_))
        ));
        assert!(matches!(
            pick_version(&supported, &[version("2", &["ORDER_ORDERED"])]),
            Err(IbcError::NoCommonVersion(_))
        ));
    }

    #[test]
    fn supported_version_must_be_subset() {
        let supported = vec![Version::default()];
        assert!(is_supported_version(
            &supported,
            &version("1", &["ORDER_ORDERED"])
        ));
        assert!(!is_supported_version(
            &supported,
            &version("1", &["ORDER_DAG"])
        ));
        assert!(!is_supported_version(&supported, &version("1", &[])));
    }
}
