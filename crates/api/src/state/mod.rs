// Path: crates/api/src/state/mod.rs
//! State access for the IBC core: the dyn-safe accessor trait, a
//! copy-on-write overlay used for speculative execution, and a simple
//! in-memory backend.

mod accessor;
mod memory;
mod overlay;

pub use accessor::*;
pub use memory::*;
pub use overlay::*;
