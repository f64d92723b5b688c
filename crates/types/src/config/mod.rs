// Path: crates/types/src/config/mod.rs

//! Configuration for the IBC core.
use crate::ibc::Version;
use serde::{Deserialize, Serialize};

/// Relative timeout applied to an upgrade when this end starts flushing.
///
/// Offsets are added to the counterparty client's latest height and consensus
/// timestamp; a zero offset leaves that bound unused.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UpgradeTimeoutConfig {
    /// Blocks of counterparty height, zero if unused.
    #[serde(default)]
    pub height_offset: u64,
    /// Nanoseconds of counterparty time, zero if unused.
    #[serde(default = "default_upgrade_timestamp_offset")]
    pub timestamp_offset: u64,
}

impl Default for UpgradeTimeoutConfig {
    fn default() -> Self {
        Self {
            height_offset: 0,
            timestamp_offset: default_upgrade_timestamp_offset(),
        }
    }
}

/// Configuration for the IBC service.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IbcConfig {
    /// Client types accepted by `CreateClient`; `"*"` enables every registered verifier.
    #[serde(default = "default_enabled_clients")]
    pub enabled_clients: Vec<String>,
    /// The key prefix this chain commits IBC state under.
    #[serde(default = "default_commitment_prefix")]
    pub commitment_prefix: String,
    /// Expected block time in nanoseconds, used to turn a time delay into a block delay.
    #[serde(default = "default_max_expected_time_per_block")]
    pub max_expected_time_per_block: u64,
    /// Timeout stamped onto upgrades when flushing starts.
    #[serde(default)]
    pub upgrade_timeout: UpgradeTimeoutConfig,
    /// Connection versions this chain supports, in preference order.
    #[serde(default = "default_connection_versions")]
    pub connection_versions: Vec<Version>,
}

impl IbcConfig {
    /// Parses a config from TOML, filling unset fields with defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Returns true if `client_type` may be instantiated.
    pub fn is_client_enabled(&self, client_type: &str) -> bool {
        self.enabled_clients
            .iter()
            .any(|c| c == "*" || c == client_type)
    }
}

impl Default for IbcConfig {
    fn default() -> Self {
        Self {
            enabled_clients: default_enabled_clients(),
            commitment_prefix: default_commitment_prefix(),
            max_expected_time_per_block: default_max_expected_time_per_block(),
            upgrade_timeout: UpgradeTimeoutConfig::default(),
            connection_versions: default_connection_versions(),
        }
    }
}

fn default_enabled_clients() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_commitment_prefix() -> String {
    "ibc".to_string()
}
fn default_max_expected_time_per_block() -> u64 {
    30_000_000_000
}
fn default_upgrade_timestamp_offset() -> u64 {
    600_000_000_000
}
fn default_connection_versions() -> Vec<Version> {
    vec![Version::default()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = IbcConfig::from_toml_str("").unwrap();
        assert_eq!(config, IbcConfig::default());
        assert!(config.is_client_enabled("07-tendermint"));
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = IbcConfig::from_toml_str(
            r#"
            enabled_clients = ["9999-mock"]
            commitment_prefix = "store"

            [upgrade_timeout]
            height_offset = 50
            "#,
        )
        .unwrap();
        assert!(config.is_client_enabled("9999-mock"));
        assert!(!config.is_client_enabled("07-tendermint"));
        assert_eq!(config.commitment_prefix, "store");
        assert_eq!(config.upgrade_timeout.height_offset, 50);
        assert_eq!(config.upgrade_timeout.timestamp_offset, 600_000_000_000);
        assert_eq!(config.connection_versions, vec![Version::default()]);
    }
}
