// Path: crates/api/src/lib.rs
#![forbid(unsafe_code)]
#![warn(missing_docs)]
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
//! # IOI IBC API
//!
//! Core traits and interfaces for the IBC core. This crate defines the
//! stable contract between the protocol engines and their collaborators:
//! the key/value store they write through and the light clients they
//! verify proofs with.

pub mod ibc;
pub mod state;

/// A curated set of the most commonly used traits and types.
pub mod prelude {
    pub use crate::ibc::{ClientContext, ClientVerifier};
    pub use crate::state::{InMemoryState, StateAccessor, StateOverlay};
}
