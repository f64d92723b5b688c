// Path: crates/ibc/src/lib.rs
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
//! # IOI IBC
//!
//! The transport, authentication and ordering layer of IBC: connection and
//! channel handshakes, the packet lifecycle, in-place channel upgrades and
//! the capability registry that binds ports and channels to their owning
//! application modules.
//!
//! Every relayer message enters through [`IbcCore::dispatch`] (or the
//! `msg_dispatch@v1` service call) and executes on a copy-on-write branch of
//! the host state that is committed only if the whole message succeeds.

pub mod capability;
mod channel;
mod client;
mod connection;
mod context;
pub mod core;
mod execution;
pub mod module;
pub mod registry;
pub mod router;
pub mod store;

pub use crate::capability::{Capability, CapabilityRegistry};
pub use crate::core::{IbcCore, MSG_DISPATCH_METHOD};
pub use crate::module::{IbcModule, ModuleCtx};
pub use crate::registry::VerifierRegistry;
pub use crate::router::Router;
pub use crate::store::IbcStore;
