// Path: crates/types/src/ibc/identifier.rs
//! ICS-24 host identifiers and sequence numbers.

use crate::error::IbcError;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const VALID_SPECIAL_CHARS: &str = "._+-#[]<>";

/// Checks an identifier against the ICS-24 character set and length bounds.
fn validate_identifier(id: &str, min: usize, max: usize) -> Result<(), IbcError> {
    if id.len() < min || id.len() > max {
        return Err(IbcError::InvalidIdentifier(format!(
            "identifier {id:?} must be between {min} and {max} characters"
        )));
    }
    if id.contains('/') {
        return Err(IbcError::InvalidIdentifier(format!(
            "identifier {id:?} cannot contain a path separator"
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || VALID_SPECIAL_CHARS.contains(c))
    {
        return Err(IbcError::InvalidIdentifier(format!(
            "identifier {id:?} contains invalid characters"
        )));
    }
    Ok(())
}

macro_rules! define_identifier {
    ($(#[$meta:meta])* $name:ident, $min:expr, $max:expr) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, Serialize, Deserialize,
        )]
        pub struct $name(String);

        impl $name {
            /// Validates and wraps an identifier.
            pub fn new(id: impl Into<String>) -> Result<Self, IbcError> {
                let id = id.into();
                validate_identifier(&id, $min, $max)?;
                Ok(Self(id))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = IbcError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_identifier!(
    /// Identifies a light client, e.g. `07-tendermint-0`.
    ClientId,
    9,
    64
);
define_identifier!(
    /// Identifies a connection, e.g. `connection-0`.
    ConnectionId,
    10,
    64
);
define_identifier!(
    /// Identifies a channel within a port, e.g. `channel-0`.
    ChannelId,
    8,
    64
);
define_identifier!(
    /// Identifies a port, e.g. `transfer`.
    PortId,
    2,
    128
);

impl ClientId {
    /// Builds the identifier allocated to the `counter`-th client of `client_type`.
    pub fn new_indexed(client_type: &str, counter: u64) -> Result<Self, IbcError> {
        Self::new(format!("{client_type}-{counter}"))
    }
}

impl ConnectionId {
    /// Builds the identifier allocated to the `counter`-th connection.
    pub fn new_indexed(counter: u64) -> Self {
        Self(format!("connection-{counter}"))
    }
}

impl ChannelId {
    /// Builds the identifier allocated to the `counter`-th channel.
    pub fn new_indexed(counter: u64) -> Self {
        Self(format!("channel-{counter}"))
    }
}

/// Identifies the application module that owns a port.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
pub struct ModuleId(String);

impl ModuleId {
    /// Creates a module identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A packet sequence number. Sequences start at 1.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Encode,
    Decode,
    Serialize,
    Deserialize,
)]
pub struct Sequence(pub u64);

impl Sequence {
    /// Returns the raw sequence value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Returns the following sequence.
    pub fn increment(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl From<u64> for Sequence {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_identifiers() {
        assert!(PortId::new("transfer").is_ok());
        assert!(ChannelId::new("channel-7").is_ok());
        assert!(ConnectionId::new("connection-12").is_ok());
        assert!(ClientId::new("07-tendermint-0").is_ok());
        assert_eq!(ChannelId::new_indexed(3).as_str(), "channel-3");
        assert_eq!(
            ClientId::new_indexed("07-tendermint", 1).map(|id| id.to_string()),
            Ok("07-tendermint-1".to_string())
        );
    }

    #[test]
    fn rejects_malformed_identifiers() {
        assert!(PortId::new("a").is_err());
        assert!(PortId::new("bad/port").is_err());
        assert!(ChannelId::new("chan").is_err());
        assert!(PortId::new("white space").is_err());
        assert!(ClientId::new("x".repeat(65)).is_err());
    }
}
