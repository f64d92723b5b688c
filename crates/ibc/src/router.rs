// Path: crates/ibc/src/router.rs
//! Routes callbacks to application modules by module id.

use std::collections::BTreeMap;
use std::fmt;

use ioi_types::error::IbcError;
use ioi_types::ibc::ModuleId;

use crate::module::IbcModule;

/// The application modules known to the core.
///
/// Which module owns a port is recorded in the capability registry; the
/// router only maps module ids to implementations.
#[derive(Default)]
pub struct Router {
    modules: BTreeMap<ModuleId, Box<dyn IbcModule>>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("modules", &self.modules.keys())
            .finish()
    }
}

impl Router {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module. Each id may be routed once.
    pub fn add_route(&mut self, module_id: ModuleId, module: Box<dyn IbcModule>) -> Result<(), IbcError> {
        if self.modules.contains_key(&module_id) {
            return Err(IbcError::InvalidState(format!(
                "module {module_id} is already routed"
            )));
        }
        tracing::info!(target: "ibc", module_id = %module_id, "registered IBC module");
        self.modules.insert(module_id, module);
        Ok(())
    }

    /// Returns true if `module_id` is routed.
    pub fn has_route(&self, module_id: &ModuleId) -> bool {
        self.modules.contains_key(module_id)
    }

    /// Returns the module routed under `module_id`.
    pub fn route_mut(&mut self, module_id: &ModuleId) -> Result<&mut (dyn IbcModule + '_), IbcError> {
        match self.modules.get_mut(module_id) {
            Some(b) => Ok(&mut **b),
            None => Err(IbcError::RouteNotFound(module_id.to_string())),
        }
    }
}
