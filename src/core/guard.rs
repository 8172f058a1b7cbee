//! Access Guard
//!
//! Owner/creator authorization checks and the non-reentrant purchase lock.

use alloy_primitives::Address;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use crate::models::errors::{LedgerError, LedgerResult, Role};
use crate::models::types::Module;

/// Fail with `Unauthorized` unless `caller` is the platform owner
pub fn ensure_owner(owner: Address, caller: Address) -> LedgerResult<()> {
    if caller != owner {
        warn!(caller = %caller, "Owner-only operation rejected");
        return Err(LedgerError::Unauthorized {
            caller,
            role: Role::Owner,
        });
    }
    Ok(())
}

/// Fail with `Unauthorized` unless `caller` created `module`
pub fn ensure_creator(module: &Module, caller: Address) -> LedgerResult<()> {
    if caller != module.creator {
        warn!(
            module_id = module.id,
            caller = %caller,
            "Creator-only operation rejected"
        );
        return Err(LedgerError::Unauthorized {
            caller,
            role: Role::Creator,
        });
    }
    Ok(())
}

/// Single-flag reentrancy lock
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: AtomicBool,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock; it is released when the returned scope is dropped.
    pub fn enter(&self) -> LedgerResult<GuardScope<'_>> {
        self.entered
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                warn!("Reentrant call rejected while a purchase is in flight");
                LedgerError::Reentrancy
            })?;
        Ok(GuardScope {
            entered: &self.entered,
        })
    }

    pub fn is_held(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

/// Held reentrancy lock
#[derive(Debug)]
#[must_use = "the lock is released as soon as the scope is dropped"]
pub struct GuardScope<'a> {
    entered: &'a AtomicBool,
}

impl Drop for GuardScope<'_> {
    fn drop(&mut self) {
        self.entered.store(false, Ordering::Release);
    }
}
