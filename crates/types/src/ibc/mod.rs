// Path: crates/types/src/ibc/mod.rs
//! Core data structures for the IBC transport, authentication and ordering layer.

mod channel;
mod client;
mod connection;
mod events;
mod height;
mod identifier;
mod msgs;
mod packet;
mod path;
mod response;
mod upgrade;

pub use channel::*;
pub use client::*;
pub use connection::*;
pub use events::*;
pub use height::*;
pub use identifier::*;
pub use msgs::*;
pub use packet::*;
pub use path::*;
pub use response::*;
pub use upgrade::*;

use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Deterministic host metadata for the block executing a message.
///
/// Both values come from the block header, never from wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct BlockContext {
    /// The host height (`{revision_number, revision_height}`).
    pub height: Height,
    /// The host timestamp in nanoseconds since the Unix epoch.
    pub timestamp: u64,
}

impl BlockContext {
    /// Creates a block context at revision 0.
    pub fn new(revision_height: u64, timestamp: u64) -> Self {
        Self {
            height: Height::new(0, revision_height),
            timestamp,
        }
    }
}
