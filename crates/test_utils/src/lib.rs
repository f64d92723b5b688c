// Path: crates/test_utils/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # IOI IBC Test Utilities
//!
//! A hash-based mock light client, a scriptable application module and a
//! two-chain [`Coordinator`] that relays real handshake, packet and upgrade
//! messages between two [`MockChain`]s.

pub mod chain;
pub mod coordinator;
pub mod mock_client;
pub mod mock_module;

pub use chain::MockChain;
pub use coordinator::{mock_port, sent_packet, written_ack, Coordinator, Link, Side, RELAYER};
pub use mock_client::{MockHeader, MockVerifier, MOCK_CLIENT_TYPE};
pub use mock_module::{MockCalls, MockConfig, MockHandle, MockModule};

/// Installs a test log subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
