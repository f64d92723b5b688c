// Path: crates/ibc/src/execution.rs
//! Speculative execution: copy-on-write branches with explicit commit.
//!
//! A branch is a [`StateOverlay`] over its parent. Committing writes the
//! branch's change set into the parent in key order; dropping it discards
//! every write.

use ioi_api::state::{StateAccessor, StateChangeSet, StateOverlay};
use ioi_types::error::IbcError;

/// The result of a packet-level step: either it transitioned state or the
/// message was redundant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome<T> {
    /// State transitioned.
    Success(T),
    /// Already relayed; nothing was written.
    NoOp,
}

/// Writes a branch's change set into `state`.
pub(crate) fn commit_changes(
    state: &mut dyn StateAccessor,
    changes: StateChangeSet,
) -> Result<(), IbcError> {
    let (inserts, deletes) = changes;
    for (k, v) in inserts {
        tracing::trace!(target: "ibc.state", op = "insert", path = %String::from_utf8_lossy(&k), bytes = v.len());
        state.insert(&k, &v)?;
    }
    for k in deletes {
        tracing::trace!(target: "ibc.state", op = "delete", path = %String::from_utf8_lossy(&k));
        state.delete(&k)?;
    }
    Ok(())
}

/// Runs `f` on a fresh branch of `state`, committing the branch only if `f` succeeds.
pub(crate) fn in_branch<T>(
    state: &mut dyn StateAccessor,
    f: impl FnOnce(&mut dyn StateAccessor) -> Result<T, IbcError>,
) -> Result<T, IbcError> {
    let (out, changes) = {
        let mut branch = StateOverlay::new(&*state);
        let out = f(&mut branch)?;
        (out, branch.into_ordered_batch())
    };
    commit_changes(state, changes)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ioi_api::state::InMemoryState;

    #[test]
    fn failed_branch_leaves_no_writes() {
        let mut state = InMemoryState::new();
        let res: Result<(), IbcError> = in_branch(&mut state, |s| {
            s.insert(b"k", b"v")?;
            Err(IbcError::InvalidState("boom".into()))
        });
        assert!(res.is_err());
        assert!(state.is_empty());
    }

    #[test]
    fn successful_branch_commits_inserts_and_deletes() {
        let mut state = InMemoryState::new();
        state.insert(b"old", b"x").unwrap();
        in_branch(&mut state, |s| {
            s.insert(b"new", b"y")?;
            s.delete(b"old")?;
            Ok(())
        })
        .unwrap();
        assert_eq!(state.get(b"new").unwrap(), Some(b"y".to_vec()));
        assert_eq!(state.get(b"old").unwrap(), None);
    }
}
