// Path: crates/types/src/ibc/height.rs

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A revision-aware block height.
///
/// Heights order lexicographically by `(revision_number, revision_height)`.
/// The zero height is used as "unset" in timeouts.
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
pub struct Height {
    /// The chain revision (bumped on chain restarts/upgrades).
    pub revision_number: u64,
    /// The block height within the revision.
    pub revision_height: u64,
}

impl Height {
    /// Creates a new height.
    pub const fn new(revision_number: u64, revision_height: u64) -> Self {
        Self {
            revision_number,
            revision_height,
        }
    }

    /// The zero height, meaning "unset".
    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    /// Returns true if this is the zero height.
    pub fn is_zero(&self) -> bool {
        self.revision_number == 0 && self.revision_height == 0
    }

    /// Returns the next height in the same revision.
    pub fn increment(&self) -> Self {
        Self::new(self.revision_number, self.revision_height.saturating_add(1))
    }

    /// Returns this height advanced by `delta` blocks in the same revision.
    pub fn add(&self, delta: u64) -> Self {
        Self::new(
            self.revision_number,
            self.revision_height.saturating_add(delta),
        )
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.revision_number, self.revision_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_revision_first() {
        assert!(Height::new(1, 1) > Height::new(0, 100));
        assert!(Height::new(0, 2) > Height::new(0, 1));
        assert!(Height::zero().is_zero());
        assert_eq!(Height::new(0, 9).increment(), Height::new(0, 10));
        assert_eq!(Height::new(2, 7).to_string(), "2-7");
    }
}
