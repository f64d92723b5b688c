// Path: crates/api/src/state/overlay.rs

//! A copy-on-write state overlay for speculative execution.

use crate::state::StateAccessor;
use ioi_types::error::StateError;
use std::collections::BTreeMap;

/// A batch of key-value pairs to be inserted or updated in the state.
pub type StateInserts = Vec<(Vec<u8>, Vec<u8>)>;

/// A batch of keys to be deleted from the state.
pub type StateDeletes = Vec<Vec<u8>>;

/// A complete set of state changes (inserts/updates and deletes) from one branch.
pub type StateChangeSet = (StateInserts, StateDeletes);

/// An in-memory, copy-on-write overlay for any `StateAccessor`.
///
/// Reads are first checked against the local `writes` cache. If a key is not
/// found, the read is passed through to the underlying `base` state.
/// All writes are captured in the local cache and do not affect the `base` state
/// until the branch is committed with [`StateAccessor::apply_changes`].
/// Dropping the overlay discards the branch.
#[derive(Clone)]
pub struct StateOverlay<'a> {
    base: &'a dyn StateAccessor,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>, // BTreeMap for deterministic commit order.
}

impl<'a> StateOverlay<'a> {
    /// Creates a new, empty overlay on top of a base state accessor.
    pub fn new(base: &'a dyn StateAccessor) -> Self {
        Self {
            base,
            writes: BTreeMap::new(),
        }
    }

    /// Returns true if the branch holds no writes.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Consumes the overlay and returns its writes in a deterministic order.
    pub fn into_ordered_batch(self) -> StateChangeSet {
        let mut inserts = Vec::new();
        let mut deletes = Vec::new();

        for (key, value_opt) in self.writes {
            match value_opt {
                Some(value) => inserts.push((key, value)),
                None => deletes.push(key),
            }
        }
        (inserts, deletes)
    }
}

impl<'a> StateAccessor for StateOverlay<'a> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        match self.writes.get(key) {
            // A cached value, or `None` for a pending delete.
            Some(value_opt) => Ok(value_opt.clone()),
            None => self.base.get(key),
        }
    }

    fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StateError> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.base.prefix_scan(prefix)?.into_iter().collect();

        for (key, value_opt) in self.writes.range(prefix.to_vec()..) {
            if !key.starts_with(prefix) {
                break;
            }
            match value_opt {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        Ok(merged.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::InMemoryState;

    fn base() -> InMemoryState {
        let mut state = InMemoryState::new();
        state.insert(b"a/1", b"one").unwrap();
        state.insert(b"a/2", b"two").unwrap();
        state.insert(b"b/1", b"other").unwrap();
        state
    }

    #[test]
    fn reads_fall_through_and_writes_shadow() {
        let state = base();
        let mut overlay = StateOverlay::new(&state);
        overlay.insert(b"a/1", b"uno").unwrap();
        overlay.delete(b"a/2").unwrap();

        assert_eq!(overlay.get(b"a/1").unwrap(), Some(b"uno".to_vec()));
        assert_eq!(overlay.get(b"a/2").unwrap(), None);
        assert_eq!(overlay.get(b"b/1").unwrap(), Some(b"other".to_vec()));
        // The base is untouched until the branch is applied.
        assert_eq!(state.get(b"a/2").unwrap(), Some(b"two".to_vec()));
    }

    #[test]
    fn prefix_scan_merges_pending_writes() {
        let state = base();
        let mut overlay = StateOverlay::new(&state);
        overlay.insert(b"a/3", b"three").unwrap();
        overlay.delete(b"a/1").unwrap();

        let keys: Vec<Vec<u8>> = overlay
            .prefix_scan(b"a/")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![b"a/2".to_vec(), b"a/3".to_vec()]);
    }

    #[test]
    fn nested_branches_commit_inward() {
        let mut state = base();
        let outer_changes = {
            let mut outer = StateOverlay::new(&state);
            outer.insert(b"c/1", b"outer").unwrap();
            let inner_changes = {
                let mut inner = StateOverlay::new(&outer);
                inner.insert(b"c/2", b"inner").unwrap();
                inner.into_ordered_batch()
            };
            outer.apply_changes(inner_changes).unwrap();
            outer.into_ordered_batch()
        };
        state.apply_changes(outer_changes).unwrap();
        assert_eq!(state.get(b"c/1").unwrap(), Some(b"outer".to_vec()));
        assert_eq!(state.get(b"c/2").unwrap(), Some(b"inner".to_vec()));
    }

    #[test]
    fn dropped_branch_leaves_base_unchanged() {
        let state = base();
        let before = state.clone();
        {
            let mut overlay = StateOverlay::new(&state);
            overlay.insert(b"a/1", b"changed").unwrap();
        }
        assert_eq!(state, before);
    }
}
