//! Module Registry
//!
//! Owns the module table and the id counter. Authorization is enforced here
//! for creator-only mutations; the ledger supplies the caller.

use alloy_primitives::{Address, U256};
use std::collections::BTreeMap;

use crate::core::guard::ensure_creator;
use crate::models::errors::{LedgerError, LedgerResult};
use crate::models::types::{Module, ModuleId, ModuleState};
use crate::utils::constants::FIRST_MODULE_ID;

/// Module table with monotonically increasing ids
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    modules: BTreeMap<ModuleId, Module>,
    next_id: ModuleId,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            modules: BTreeMap::new(),
            next_id: FIRST_MODULE_ID,
        }
    }

    /// Register a module and return its id
    pub fn create(&mut self, creator: Address, metadata: String, price: U256) -> LedgerResult<ModuleId> {
        if price.is_zero() {
            return Err(LedgerError::validation("price must be greater than zero"));
        }

        let id = self.next_id;
        let next_id = id
            .checked_add(1)
            .ok_or_else(|| LedgerError::validation("module id space exhausted"))?;

        self.modules.insert(id, Module::new(id, creator, metadata, price));
        self.next_id = next_id;
        Ok(id)
    }

    pub fn get(&self, id: ModuleId) -> LedgerResult<&Module> {
        self.modules.get(&id).ok_or(LedgerError::NotFound(id))
    }

    pub fn get_mut(&mut self, id: ModuleId) -> LedgerResult<&mut Module> {
        self.modules.get_mut(&id).ok_or(LedgerError::NotFound(id))
    }

    /// Look up a module that must still be active
    pub fn get_active(&self, id: ModuleId) -> LedgerResult<&Module> {
        let module = self.get(id)?;
        if !module.is_active {
            return Err(LedgerError::Inactive(id));
        }
        Ok(module)
    }

    /// Creator-only price change; returns the previous price
    pub fn update_price(&mut self, caller: Address, id: ModuleId, new_price: U256) -> LedgerResult<U256> {
        let module = self.get_mut(id)?;
        ensure_creator(module, caller)?;
        if new_price.is_zero() {
            return Err(LedgerError::validation("price must be greater than zero"));
        }
        Ok(std::mem::replace(&mut module.price, new_price))
    }

    /// Creator-only, idempotent. Returns true on the Active -> Inactive transition.
    pub fn deactivate(&mut self, caller: Address, id: ModuleId) -> LedgerResult<bool> {
        let module = self.get_mut(id)?;
        ensure_creator(module, caller)?;
        let was_active = module.is_active;
        module.is_active = false;
        Ok(was_active)
    }

    pub fn state_of(&self, id: ModuleId) -> ModuleState {
        self.modules
            .get(&id)
            .map(Module::state)
            .unwrap_or(ModuleState::NonExistent)
    }

    /// Snapshot page in id order
    pub fn list(&self, offset: usize, limit: usize) -> Vec<Module> {
        self.modules.values().skip(offset).take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Id the next `create` will assign
    pub fn next_id(&self) -> ModuleId {
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::Role;
    use alloy_primitives::address;

    const ALICE: Address = address!("00000000000000000000000000000000000000a1");
    const BOB: Address = address!("00000000000000000000000000000000000000b0");

    #[test]
    fn test_ids_are_sequential() {
        let mut registry = ModuleRegistry::new();
        for expected in 1..=5u64 {
            let id = registry
                .create(ALICE, format!("module-{}", expected), U256::from(100))
                .unwrap();
            assert_eq!(id, expected);
        }
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.next_id(), 6);
    }

    #[test]
    fn test_zero_price_rejected_without_consuming_id() {
        let mut registry = ModuleRegistry::new();
        assert!(matches!(
            registry.create(ALICE, "m".into(), U256::ZERO),
            Err(LedgerError::Validation(_))
        ));
        assert_eq!(registry.create(ALICE, "m".into(), U256::from(1)).unwrap(), 1);
    }

    #[test]
    fn test_metadata_is_opaque() {
        let mut registry = ModuleRegistry::new();
        let long = "x".repeat(5000);
        let id = registry.create(ALICE, long.clone(), U256::from(1)).unwrap();
        assert_eq!(registry.get(id).unwrap().metadata, long);

        let empty = registry.create(ALICE, String::new(), U256::from(1)).unwrap();
        assert_eq!(registry.get(empty).unwrap().metadata, "");
    }

    #[test]
    fn test_get_unknown_id() {
        let registry = ModuleRegistry::new();
        assert_eq!(registry.get(1).unwrap_err(), LedgerError::NotFound(1));
        assert_eq!(registry.state_of(1), ModuleState::NonExistent);
    }

    #[test]
    fn test_update_price_checks_order() {
        let mut registry = ModuleRegistry::new();
        let id = registry.create(ALICE, "m".into(), U256::from(10)).unwrap();

        // authorization is checked before the value
        assert_eq!(
            registry.update_price(BOB, id, U256::ZERO).unwrap_err(),
            LedgerError::Unauthorized {
                caller: BOB,
                role: Role::Creator
            }
        );
        assert!(matches!(
            registry.update_price(ALICE, id, U256::ZERO),
            Err(LedgerError::Validation(_))
        ));

        let old = registry.update_price(ALICE, id, U256::from(20)).unwrap();
        assert_eq!(old, U256::from(10));
        assert_eq!(registry.get(id).unwrap().price, U256::from(20));
    }

    #[test]
    fn test_deactivate_is_terminal_and_idempotent() {
        let mut registry = ModuleRegistry::new();
        let id = registry.create(ALICE, "m".into(), U256::from(10)).unwrap();

        assert!(registry.deactivate(BOB, id).is_err());
        assert!(registry.deactivate(ALICE, id).unwrap());
        assert!(!registry.deactivate(ALICE, id).unwrap());
        assert_eq!(registry.state_of(id), ModuleState::Inactive);
        assert_eq!(registry.get_active(id).unwrap_err(), LedgerError::Inactive(id));
        // still queryable
        assert!(!registry.get(id).unwrap().is_active);
    }

    #[test]
    fn test_list_pages_in_id_order() {
        let mut registry = ModuleRegistry::new();
        for i in 0..4 {
            registry.create(ALICE, format!("m{}", i), U256::from(1)).unwrap();
        }
        let page: Vec<_> = registry.list(1, 2).into_iter().map(|m| m.id).collect();
        assert_eq!(page, vec![2, 3]);
        assert!(registry.list(10, 5).is_empty());
    }
}
