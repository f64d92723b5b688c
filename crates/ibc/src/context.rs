// Path: crates/ibc/src/context.rs
//! Message-scoped execution context shared by every handler.

use ioi_api::state::{StateAccessor, StateOverlay};
use ioi_types::config::IbcConfig;
use ioi_types::error::IbcError;
use ioi_types::ibc::{BlockContext, CommitmentPrefix, IbcEvent, ModuleId};

use crate::execution::commit_changes;
use crate::module::{IbcModule, ModuleCtx};
use crate::registry::VerifierRegistry;
use crate::router::Router;

/// Host metadata, collaborators and accumulated events for one message.
pub(crate) struct ExecCtx<'c> {
    pub(crate) config: &'c IbcConfig,
    pub(crate) verifiers: &'c VerifierRegistry,
    pub(crate) router: &'c mut Router,
    /// Deterministic block height and timestamp, never wall-clock.
    pub(crate) block: BlockContext,
    /// Events emitted so far, core and application alike.
    pub(crate) events: Vec<IbcEvent>,
}

impl<'c> ExecCtx<'c> {
    pub(crate) fn new(
        config: &'c IbcConfig,
        verifiers: &'c VerifierRegistry,
        router: &'c mut Router,
        block: BlockContext,
    ) -> Self {
        Self {
            config,
            verifiers,
            router,
            block,
            events: Vec::new(),
        }
    }

    pub(crate) fn emit(&mut self, event: IbcEvent) {
        self.events.push(event);
    }

    /// This chain's commitment prefix, as the counterparty proves against it.
    pub(crate) fn commitment_prefix(&self) -> Result<CommitmentPrefix, IbcError> {
        CommitmentPrefix::new(self.config.commitment_prefix.as_bytes())
    }

    /// Runs an application callback on its own branch of `state`.
    ///
    /// The branch is committed if the callback returns `Ok`, discarded
    /// otherwise. Infrastructure failures (no route, state errors) are
    /// returned as the outer error; the callback's own result is returned
    /// as is.
    pub(crate) fn callback<T>(
        &mut self,
        module_id: &ModuleId,
        state: &mut dyn StateAccessor,
        f: impl FnOnce(&mut dyn IbcModule, &mut ModuleCtx<'_>) -> anyhow::Result<T>,
    ) -> Result<anyhow::Result<T>, IbcError> {
        self.callback_with(module_id, state, f, |result| result.is_ok())
    }

    /// Like [`ExecCtx::callback`], but `keep` decides whether the branch is committed.
    pub(crate) fn callback_with<T>(
        &mut self,
        module_id: &ModuleId,
        state: &mut dyn StateAccessor,
        f: impl FnOnce(&mut dyn IbcModule, &mut ModuleCtx<'_>) -> anyhow::Result<T>,
        keep: impl FnOnce(&anyhow::Result<T>) -> bool,
    ) -> Result<anyhow::Result<T>, IbcError> {
        let block = self.block;
        let module = self.router.route_mut(module_id)?;
        let (result, changes) = {
            let mut branch = StateOverlay::new(&*state);
            let result = {
                let mut module_ctx = ModuleCtx::new(&mut branch, block, &mut self.events);
                f(module, &mut module_ctx)
            };
            let changes = keep(&result).then(|| branch.into_ordered_batch());
            (result, changes)
        };
        match changes {
            Some(changes) => commit_changes(state, changes)?,
            None => {
                tracing::debug!(target: "ibc", module_id = %module_id, "discarded application state branch")
            }
        }
        Ok(result)
    }
}
