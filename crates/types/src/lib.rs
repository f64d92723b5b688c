// Path: crates/types/src/lib.rs
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

//! # IOI IBC Types
//!
//! This crate is the foundational library for the IBC core, containing all
//! value types, identifiers, store paths, message schemas, events, error
//! enums and configuration objects.
//!
//! ## Architectural Role
//!
//! As the base crate, `ioi-types` has minimal dependencies and is itself a
//! dependency of every other crate in the workspace. This keeps the state
//! interfaces (`ioi-api`) and the protocol engines (`ioi-ibc`) free of
//! circular dependencies and gives both chains of a connection one canonical
//! definition of every value they prove to each other.

/// The canonical, deterministic binary codec for consensus-critical state.
pub mod codec;
/// Shared configuration structures (e.g., `IbcConfig`).
pub mod config;
/// A unified set of all error types used across the IBC core.
pub mod error;
/// Core data structures for the IBC transport, authentication and ordering layer.
pub mod ibc;
