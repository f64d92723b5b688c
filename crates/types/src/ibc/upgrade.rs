// Path: crates/types/src/ibc/upgrade.rs
//! Channel upgrade proposals and error receipts.

use super::{ChannelEnd, ConnectionId, Height, Order, Sequence};
use parity_scale_codec::{Decode, Encode};

/// The channel parameters an upgrade renegotiates.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct UpgradeFields {
    /// The proposed ordering.
    pub ordering: Order,
    /// The proposed connection hops.
    pub connection_hops: Vec<ConnectionId>,
    /// The proposed application version.
    pub version: String,
}

impl UpgradeFields {
    /// Returns true if applying these fields would leave `channel` unchanged.
    pub fn matches_channel(&self, channel: &ChannelEnd) -> bool {
        self.ordering == channel.ordering
            && self.connection_hops == channel.connection_hops
            && self.version == channel.version
    }
}

/// A timeout expressed as a height and/or a timestamp; zero values are unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Encode, Decode)]
pub struct Timeout {
    /// Timeout height on the counterparty, zero if unused.
    pub height: Height,
    /// Timeout timestamp (nanoseconds) on the counterparty, zero if unused.
    pub timestamp: u64,
}

impl Timeout {
    /// Creates a timeout.
    pub fn new(height: Height, timestamp: u64) -> Self {
        Self { height, timestamp }
    }

    /// Returns true if at least one bound is set.
    pub fn is_set(&self) -> bool {
        !self.height.is_zero() || self.timestamp != 0
    }

    /// Returns true if EITHER set bound has been reached at `height` / `timestamp`.
    pub fn has_elapsed(&self, height: Height, timestamp: u64) -> bool {
        let height_elapsed = !self.height.is_zero() && height >= self.height;
        let timestamp_elapsed = self.timestamp != 0 && timestamp >= self.timestamp;
        height_elapsed || timestamp_elapsed
    }
}

/// An in-progress channel upgrade as stored by one end.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Upgrade {
    /// The proposed fields.
    pub fields: UpgradeFields,
    /// When the counterparty must have finished; stamped when flushing starts.
    pub timeout: Timeout,
    /// The next send sequence at flush start: every lower sequence is pre-upgrade traffic.
    pub next_sequence_send: Sequence,
    /// The channel as it was before the upgrade started, restored on abort.
    pub prior_channel: ChannelEnd,
}

/// Proof that an end aborted the upgrade with the given sequence.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ErrorReceipt {
    /// The upgrade sequence that was aborted.
    pub sequence: u64,
    /// Why it was aborted.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_elapses_on_either_bound() {
        let timeout = Timeout::new(Height::new(0, 100), 5_000);
        assert!(!timeout.has_elapsed(Height::new(0, 99), 4_999));
        assert!(timeout.has_elapsed(Height::new(0, 100), 0));
        assert!(timeout.has_elapsed(Height::new(0, 1), 5_000));
    }

    #[test]
    fn zero_bounds_are_unused() {
        let height_only = Timeout::new(Height::new(0, 10), 0);
        assert!(!height_only.has_elapsed(Height::new(0, 9), u64::MAX));
        let unset = Timeout::default();
        assert!(!unset.is_set());
        assert!(!unset.has_elapsed(Height::new(9, 9), u64::MAX));
    }
}
