// Path: crates/ibc/src/capability.rs
//! Object-capability registry binding ports and channels to their owners.
//!
//! A [`Capability`] is an opaque handle into a state-persisted arena. Only
//! this module can mint one, so holding a capability for a name proves the
//! holder was granted it by the core. Each name records the modules that own
//! its capability; the core itself is always the first owner.

use ioi_api::state::StateAccessor;
use ioi_types::error::IbcError;
use ioi_types::ibc::{ModuleId, Path};
use parity_scale_codec::{Decode, Encode};

use crate::store::IbcStore;

/// The module id the core uses when it creates capabilities for itself.
pub const CORE_MODULE_ID: &str = "ibc";

/// The core's own module id.
pub fn core_module_id() -> ModuleId {
    ModuleId::new(CORE_MODULE_ID)
}

/// An unforgeable token authorising its holder to act on one port or channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    index: u64,
}

impl Capability {
    /// The arena index of the capability.
    pub fn index(&self) -> u64 {
        self.index
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
struct CapabilityRecord {
    index: u64,
    owners: Vec<ModuleId>,
}

/// Creates, claims and authenticates capabilities.
pub struct CapabilityRegistry;

impl CapabilityRegistry {
    fn record(state: &dyn StateAccessor, name: &str) -> Result<Option<CapabilityRecord>, IbcError> {
        state.get_value(&Path::CapabilityOwner(name.to_string()))
    }

    /// Creates the capability for `name`, owned by `owner`.
    ///
    /// Fails with `CapabilityAlreadyClaimed` if a capability for `name` exists.
    pub fn new_capability(
        state: &mut dyn StateAccessor,
        owner: &ModuleId,
        name: &str,
    ) -> Result<Capability, IbcError> {
        if Self::record(&*state, name)?.is_some() {
            return Err(IbcError::CapabilityAlreadyClaimed(name.to_string()));
        }
        // Index 0 is never handed out.
        let index = state.next_counter(&Path::CapabilityIndex)?.saturating_add(1);
        let record = CapabilityRecord {
            index,
            owners: vec![owner.clone()],
        };
        state.put_value(&Path::CapabilityOwner(name.to_string()), &record)?;
        tracing::debug!(target: "ibc", capability = %name, index, owner = %owner, "created capability");
        Ok(Capability { index })
    }

    /// Adds `owner` to the owners of `capability`, which must be the capability for `name`.
    pub fn claim(
        state: &mut dyn StateAccessor,
        owner: &ModuleId,
        capability: &Capability,
        name: &str,
    ) -> Result<(), IbcError> {
        let mut record = Self::record(&*state, name)?
            .filter(|r| r.index == capability.index)
            .ok_or_else(|| IbcError::Unauthorized(format!("capability does not match {name}")))?;
        if record.owners.contains(owner) {
            return Err(IbcError::CapabilityAlreadyClaimed(name.to_string()));
        }
        record.owners.push(owner.clone());
        state.put_value(&Path::CapabilityOwner(name.to_string()), &record)
    }

    /// Returns true if `capability` is the capability for `name`.
    pub fn authenticate(
        state: &dyn StateAccessor,
        capability: &Capability,
        name: &str,
    ) -> Result<bool, IbcError> {
        Ok(Self::record(state, name)?.is_some_and(|r| r.index == capability.index))
    }

    /// Returns the capability for `name` if `owner` owns it.
    pub fn get_capability(
        state: &dyn StateAccessor,
        owner: &ModuleId,
        name: &str,
    ) -> Result<Option<Capability>, IbcError> {
        Ok(Self::record(state, name)?
            .filter(|r| r.owners.contains(owner))
            .map(|r| Capability { index: r.index }))
    }

    /// Returns the application modules owning `name`, excluding the core.
    pub fn lookup_modules(state: &dyn StateAccessor, name: &str) -> Result<Vec<ModuleId>, IbcError> {
        let core = core_module_id();
        Ok(Self::record(state, name)?
            .map(|r| r.owners.into_iter().filter(|m| *m != core).collect())
            .unwrap_or_default())
    }

    /// Resolves the single application module owning `name` along with its capability.
    ///
    /// Fails with `Unauthorized` unless exactly one module owns `name` and its
    /// capability authenticates.
    pub fn lookup_owner(
        state: &dyn StateAccessor,
        name: &str,
    ) -> Result<(ModuleId, Capability), IbcError> {
        let module_id = match Self::lookup_modules(state, name)?.as_slice() {
            [module_id] => module_id.clone(),
            [] => return Err(IbcError::Unauthorized(format!("no module owns {name}"))),
            _ => {
                return Err(IbcError::Unauthorized(format!(
                    "more than one module owns {name}"
                )))
            }
        };
        let capability = Self::get_capability(state, &module_id, name)?
            .ok_or_else(|| IbcError::Unauthorized(format!("{module_id} holds no capability for {name}")))?;
        if !Self::authenticate(state, &capability, name)? {
            return Err(IbcError::Unauthorized(format!(
                "capability held by {module_id} does not authenticate {name}"
            )));
        }
        Ok((module_id, capability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ioi_api::state::InMemoryState;

    #[test]
    fn binding_twice_is_rejected() {
        let mut state = InMemoryState::new();
        let module = ModuleId::new("transfer");
        CapabilityRegistry::new_capability(&mut state, &module, "ports/transfer").unwrap();
        assert_eq!(
            CapabilityRegistry::new_capability(&mut state, &module, "ports/transfer"),
            Err(IbcError::CapabilityAlreadyClaimed("ports/transfer".into()))
        );
    }

    #[test]
    fn capabilities_authenticate_only_their_own_name() {
        let mut state = InMemoryState::new();
        let core = core_module_id();
        let a = CapabilityRegistry::new_capability(&mut state, &core, "ports/a").unwrap();
        let b = CapabilityRegistry::new_capability(&mut state, &core, "ports/b").unwrap();
        assert_ne!(a, b);
        assert!(CapabilityRegistry::authenticate(&state, &a, "ports/a").unwrap());
        assert!(!CapabilityRegistry::authenticate(&state, &a, "ports/b").unwrap());
        assert!(!CapabilityRegistry::authenticate(&state, &b, "ports/missing").unwrap());
    }

    #[test]
    fn claim_adds_an_owner_once() {
        let mut state = InMemoryState::new();
        let core = core_module_id();
        let app = ModuleId::new("transfer");
        let cap = CapabilityRegistry::new_capability(&mut state, &core, "ports/transfer").unwrap();
        assert!(CapabilityRegistry::get_capability(&state, &app, "ports/transfer")
            .unwrap()
            .is_none());

        CapabilityRegistry::claim(&mut state, &app, &cap, "ports/transfer").unwrap();
        assert_eq!(
            CapabilityRegistry::get_capability(&state, &app, "ports/transfer").unwrap(),
            Some(cap.clone())
        );
        assert_eq!(
            CapabilityRegistry::lookup_modules(&state, "ports/transfer").unwrap(),
            vec![app.clone()]
        );
        assert!(matches!(
            CapabilityRegistry::claim(&mut state, &app, &cap, "ports/transfer"),
            Err(IbcError::CapabilityAlreadyClaimed(_))
        ));
        let (owner, owned) = CapabilityRegistry::lookup_owner(&state, "ports/transfer").unwrap();
        assert_eq!(owner, app);
        assert_eq!(owned, cap);
    }

    #[test]
    fn claiming_with_a_foreign_capability_is_unauthorized() {
        let mut state = InMemoryState::new();
        let core = core_module_id();
        let foreign = CapabilityRegistry::new_capability(&mut state, &core, "ports/a").unwrap();
        CapabilityRegistry::new_capability(&mut state, &core, "ports/b").unwrap();
        assert!(matches!(
            CapabilityRegistry::claim(&mut state, &ModuleId::new("evil"), &foreign, "ports/b"),
            Err(IbcError::Unauthorized(_))
        ));
    }
}
