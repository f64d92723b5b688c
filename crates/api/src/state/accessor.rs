// Path: crates/api/src/state/accessor.rs
//! A dyn-safe trait for key/value state access.

use crate::state::StateChangeSet;
use ioi_types::error::StateError;

/// A dyn-safe view of an ordered key/value store.
///
/// Engines and application callbacks interact with state only through this
/// trait, so the same code runs against the committed store or a speculative
/// [`StateOverlay`](crate::state::StateOverlay) branch.
pub trait StateAccessor: Send + Sync {
    /// Gets a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError>;
    /// Inserts a key-value pair.
    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError>;
    /// Deletes a key-value pair.
    fn delete(&mut self, key: &[u8]) -> Result<(), StateError>;
    /// Returns every pair whose key starts with `prefix`, in key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StateError>;

    /// Sets multiple key-value pairs in a single batch operation.
    fn batch_set(&mut self, updates: &[(Vec<u8>, Vec<u8>)]) -> Result<(), StateError> {
        for (key, value) in updates {
            self.insert(key, value)?;
        }
        Ok(())
    }

    /// Applies a change set produced by an overlay: inserts first, then deletes.
    fn apply_changes(&mut self, changes: StateChangeSet) -> Result<(), StateError> {
        let (inserts, deletes) = changes;
        self.batch_set(&inserts)?;
        for key in deletes {
            self.delete(&key)?;
        }
        Ok(())
    }
}
