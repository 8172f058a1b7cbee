//! Marketplace Ledger
//!
//! Composes the registry, settlement, rating aggregator and access guard
//! into one explicitly owned ledger value. Every method takes the calling
//! address the way a contract sees `msg.sender`.
//!
//! Locking: every mutation runs under one reentrant serialization lock, so
//! calls from different threads queue and never interleave. A purchase
//! reads everything it needs under the state read lock, then moves funds
//! holding only the serialization lock and the reentrancy flag. Payment
//! receivers run on the purchasing thread and may call back into the
//! ledger; a nested purchase fails with `Reentrancy`. Lock order is
//! serial -> state -> vault -> events.

use alloy_primitives::{Address, U256};
use dashmap::DashMap;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::core::events::EventLog;
use crate::core::guard::{ensure_owner, ReentrancyGuard};
use crate::core::rating::{apply_rating, validate_rating};
use crate::core::registry::ModuleRegistry;
use crate::core::settlement::{SettlementPlan, Transfer};
use crate::core::vault::{Vault, VaultOp};
use crate::models::config::LedgerConfig;
use crate::models::errors::{LedgerError, LedgerResult, PaymentFailure};
use crate::models::types::{
    LedgerEvent, Module, ModuleId, ModuleState, PaymentNotice, PurchaseReceipt,
};
use crate::utils::constants::{is_valid_fee_bps, DEFAULT_PLATFORM_FEE_BPS, MAX_PLATFORM_FEE_BPS};
use crate::utils::telemetry::MarketTelemetry;

/// Callback for an address that wants to observe incoming settlement funds.
///
/// Runs after the credit is applied. Returning an error rejects the transfer
/// and reverts the whole purchase. A nested `purchase_module` from inside the
/// callback fails with `LedgerError::Reentrancy`.
pub trait PaymentReceiver: Send + Sync {
    fn on_payment(&self, ledger: &Ledger, notice: &PaymentNotice) -> LedgerResult<()>;
}

#[derive(Debug)]
struct LedgerState {
    owner: Address,
    fee_bps: u64,
    registry: ModuleRegistry,
}

pub struct Ledger {
    state: RwLock<LedgerState>,
    serial: ReentrantMutex<()>,
    guard: ReentrancyGuard,
    vault: Mutex<Vault>,
    receivers: DashMap<Address, Arc<dyn PaymentReceiver>>,
    events: EventLog,
    telemetry: Arc<MarketTelemetry>,
}

impl Ledger {
    /// Fresh ledger deployed by `owner` with the default fee
    pub fn new(owner: Address) -> Self {
        Self::build(owner, DEFAULT_PLATFORM_FEE_BPS, Vault::new())
    }

    /// Ledger with a configured fee and genesis allocations
    pub fn from_config(config: &LedgerConfig) -> LedgerResult<Self> {
        if !is_valid_fee_bps(config.platform_fee_bps) {
            return Err(LedgerError::validation(format!(
                "platform fee {} exceeds cap {}",
                config.platform_fee_bps, MAX_PLATFORM_FEE_BPS
            )));
        }

        let mut vault = Vault::new();
        for (account, amount) in &config.genesis {
            vault.credit(*account, *amount)?;
        }

        info!(
            owner = %config.owner,
            fee_bps = config.platform_fee_bps,
            allocations = config.genesis.len(),
            "Ledger initialized"
        );
        Ok(Self::build(config.owner, config.platform_fee_bps, vault))
    }

    fn build(owner: Address, fee_bps: u64, vault: Vault) -> Self {
        Self {
            state: RwLock::new(LedgerState {
                owner,
                fee_bps,
                registry: ModuleRegistry::new(),
            }),
            serial: ReentrantMutex::new(()),
            guard: ReentrancyGuard::new(),
            vault: Mutex::new(vault),
            receivers: DashMap::new(),
            events: EventLog::new(),
            telemetry: Arc::new(MarketTelemetry::new()),
        }
    }

    /// Share a telemetry collector with the service around the ledger
    pub fn with_telemetry(mut self, telemetry: Arc<MarketTelemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    // ============================================
    // Module Registry
    // ============================================

    pub fn create_module(
        &self,
        caller: Address,
        metadata: impl Into<String>,
        price: U256,
    ) -> LedgerResult<ModuleId> {
        let metadata = metadata.into();
        let _serial = self.serialize();
        let result = {
            let mut state = self.write_state();
            state
                .registry
                .create(caller, metadata.clone(), price)
                .map(|id| {
                    self.events.emit(LedgerEvent::ModuleCreated {
                        id,
                        creator: caller,
                        metadata,
                        price,
                    });
                    id
                })
        };

        if let Ok(id) = result {
            self.telemetry.record_module_created();
            info!(module_id = id, creator = %caller, price = %price, "Module created");
        }
        self.observe("create_module", result)
    }

    pub fn update_module_price(&self, caller: Address, id: ModuleId, new_price: U256) -> LedgerResult<()> {
        let _serial = self.serialize();
        let result = {
            let mut state = self.write_state();
            state.registry.update_price(caller, id, new_price).map(|old_price| {
                self.events.emit(LedgerEvent::ModulePriceUpdated {
                    id,
                    old_price,
                    new_price,
                });
                old_price
            })
        };

        if let Ok(old_price) = &result {
            info!(module_id = id, old_price = %old_price, new_price = %new_price, "Module price updated");
        }
        self.observe("update_module_price", result.map(|_| ()))
    }

    /// Terminal; repeating it on an inactive module succeeds with no effect
    pub fn deactivate_module(&self, caller: Address, id: ModuleId) -> LedgerResult<()> {
        let _serial = self.serialize();
        let result = {
            let mut state = self.write_state();
            state.registry.deactivate(caller, id).inspect(|transitioned| {
                if *transitioned {
                    self.events.emit(LedgerEvent::ModuleDeactivated { id });
                }
            })
        };

        match &result {
            Ok(true) => info!(module_id = id, "Module deactivated"),
            Ok(false) => debug!(module_id = id, "Module already inactive"),
            Err(_) => {}
        }
        self.observe("deactivate_module", result.map(|_| ()))
    }

    pub fn get_module(&self, id: ModuleId) -> LedgerResult<Module> {
        self.read_state().registry.get(id).cloned()
    }

    pub fn module_state(&self, id: ModuleId) -> ModuleState {
        self.read_state().registry.state_of(id)
    }

    pub fn list_modules(&self, offset: usize, limit: usize) -> Vec<Module> {
        self.read_state().registry.list(offset, limit)
    }

    pub fn module_count(&self) -> usize {
        self.read_state().registry.len()
    }

    // ============================================
    // Rating Aggregator
    // ============================================

    pub fn rate_module(&self, rater: Address, id: ModuleId, rating: u8) -> LedgerResult<()> {
        let _serial = self.serialize();
        let result = validate_rating(rating).and_then(|()| {
            let mut state = self.write_state();
            let module = state.registry.get_mut(id)?;
            if !module.is_active {
                return Err(LedgerError::Inactive(id));
            }
            apply_rating(module, rating)?;
            let (average, count) = (module.rating, module.num_ratings);
            self.events.emit(LedgerEvent::ModuleRated { id, rater, rating });
            Ok((average, count))
        });

        if let Ok((average, count)) = result {
            self.telemetry.record_rating();
            info!(module_id = id, rater = %rater, rating, average, count, "Module rated");
        }
        self.observe("rate_module", result.map(|_| ()))
    }

    // ============================================
    // Payment Settlement
    // ============================================

    /// Settle a purchase with `payment` attached by `buyer`.
    ///
    /// The payment is escrowed from the buyer's balance, the creator and the
    /// platform are paid, and any excess is refunded. Either every transfer
    /// lands or none does.
    pub fn purchase_module(&self, buyer: Address, id: ModuleId, payment: U256) -> LedgerResult<PurchaseReceipt> {
        let _serial = self.serialize();
        let result = self.settle_purchase(buyer, id, payment);
        if result.is_err() {
            self.telemetry.record_failed_purchase();
        }
        self.observe("purchase_module", result)
    }

    fn settle_purchase(&self, buyer: Address, id: ModuleId, payment: U256) -> LedgerResult<PurchaseReceipt> {
        let _scope = self.guard.enter()?;

        // All decision inputs are fixed here, before any funds move.
        let plan = {
            let state = self.read_state();
            let module = state.registry.get_active(id)?;
            SettlementPlan::new(
                buyer,
                module.creator,
                state.owner,
                module.price,
                payment,
                state.fee_bps,
            )?
        };

        let mut journal = Vec::with_capacity(plan.transfers.len() + 1);
        journal.push(self.lock_vault().debit(buyer, plan.payment)?);

        for transfer in &plan.transfers {
            if let Err(err) = self.execute_transfer(id, buyer, transfer, &mut journal) {
                self.lock_vault().revert(&journal);
                warn!(
                    module_id = id,
                    buyer = %buyer,
                    to = %transfer.to,
                    kind = transfer.kind.as_str(),
                    error = %err,
                    "Settlement reverted"
                );
                return Err(err);
            }
        }

        self.events.emit(LedgerEvent::ModulePurchased {
            id,
            buyer,
            price: plan.price,
        });
        self.telemetry
            .record_purchase(plan.price, plan.split.fee, plan.refund);

        info!(
            module_id = id,
            buyer = %buyer,
            price = %plan.price,
            fee = %plan.split.fee,
            refund = %plan.refund,
            "Module purchased"
        );

        Ok(PurchaseReceipt {
            module_id: id,
            buyer,
            price: plan.price,
            fee: plan.split.fee,
            creator_payment: plan.split.creator_payment,
            refund: plan.refund,
        })
    }

    fn execute_transfer(
        &self,
        module_id: ModuleId,
        buyer: Address,
        transfer: &Transfer,
        journal: &mut Vec<VaultOp>,
    ) -> LedgerResult<()> {
        journal.push(self.lock_vault().credit(transfer.to, transfer.amount)?);

        // Clone out of the map so the callback may touch the registry.
        let receiver = self
            .receivers
            .get(&transfer.to)
            .map(|entry| Arc::clone(entry.value()));

        if let Some(receiver) = receiver {
            let notice = PaymentNotice {
                module_id,
                buyer,
                to: transfer.to,
                amount: transfer.amount,
                kind: transfer.kind,
            };
            receiver.on_payment(self, &notice).map_err(|err| {
                LedgerError::from(PaymentFailure::TransferRejected {
                    to: transfer.to,
                    reason: err.to_string(),
                })
            })?;
        }
        Ok(())
    }

    pub fn is_purchase_in_flight(&self) -> bool {
        self.guard.is_held()
    }

    // ============================================
    // Access Guard / platform parameters
    // ============================================

    pub fn set_platform_fee(&self, caller: Address, new_fee_bps: u64) -> LedgerResult<()> {
        let _serial = self.serialize();
        let result = {
            let mut state = self.write_state();
            ensure_owner(state.owner, caller).and_then(|()| {
                if !is_valid_fee_bps(new_fee_bps) {
                    return Err(LedgerError::validation(format!(
                        "platform fee {} exceeds cap {}",
                        new_fee_bps, MAX_PLATFORM_FEE_BPS
                    )));
                }
                let old_fee_bps = std::mem::replace(&mut state.fee_bps, new_fee_bps);
                self.events.emit(LedgerEvent::PlatformFeeUpdated {
                    old_fee_bps,
                    new_fee_bps,
                });
                Ok(old_fee_bps)
            })
        };

        if let Ok(old_fee_bps) = result {
            info!(old_fee_bps, new_fee_bps, "Platform fee updated");
        }
        self.observe("set_platform_fee", result.map(|_| ()))
    }

    pub fn platform_fee_bps(&self) -> u64 {
        self.read_state().fee_bps
    }

    pub fn owner(&self) -> Address {
        self.read_state().owner
    }

    // ============================================
    // Funds
    // ============================================

    pub fn deposit(&self, account: Address, amount: U256) -> LedgerResult<U256> {
        let _serial = self.serialize();
        let result = if amount.is_zero() {
            Err(LedgerError::validation("deposit amount must be greater than zero"))
        } else {
            let mut vault = self.lock_vault();
            let credited = vault.credit(account, amount);
            let balance = vault.balance_of(&account);
            credited.map(|_| balance)
        };

        if let Ok(balance) = &result {
            info!(account = %account, amount = %amount, balance = %balance, "Deposit credited");
        }
        self.observe("deposit", result)
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        let _serial = self.serialize();
        self.lock_vault().balance_of(&account)
    }

    /// Sum of all balances; settlements never change it
    pub fn total_balance(&self) -> U256 {
        let _serial = self.serialize();
        self.lock_vault().total_balance()
    }

    pub fn register_receiver(&self, account: Address, receiver: Arc<dyn PaymentReceiver>) {
        debug!(account = %account, "Payment receiver registered");
        self.receivers.insert(account, receiver);
    }

    pub fn remove_receiver(&self, account: &Address) -> bool {
        self.receivers.remove(account).is_some()
    }

    // ============================================
    // Observability
    // ============================================

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn telemetry(&self) -> &Arc<MarketTelemetry> {
        &self.telemetry
    }

    fn observe<T>(&self, operation: &'static str, result: LedgerResult<T>) -> LedgerResult<T> {
        if let Err(err) = &result {
            self.telemetry.record_rejection(err.code());
            debug!(operation, code = err.code().as_str(), error = %err, "Operation rejected");
        }
        result
    }

    /// Queue behind any mutation running on another thread. Re-entering
    /// from the thread that holds it (a payment receiver) does not block.
    fn serialize(&self) -> ReentrantMutexGuard<'_, ()> {
        self.serial.lock()
    }

    fn read_state(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_vault(&self) -> MutexGuard<'_, Vault> {
        self.vault
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::Role;
    use alloy_primitives::address;

    const OWNER: Address = address!("00000000000000000000000000000000000000aa");
    const CREATOR: Address = address!("00000000000000000000000000000000000000c1");
    const BUYER: Address = address!("00000000000000000000000000000000000000b1");

    fn funded() -> Ledger {
        let config = LedgerConfig::new(OWNER).with_allocation(BUYER, U256::from(10_000));
        Ledger::from_config(&config).unwrap()
    }

    #[test]
    fn test_from_config_rejects_fee_over_cap() {
        let config = LedgerConfig::new(OWNER).with_fee_bps(101);
        assert!(matches!(
            Ledger::from_config(&config),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_create_emits_event() {
        let ledger = Ledger::new(OWNER);
        let id = ledger.create_module(CREATOR, "ipfs://a", U256::from(5)).unwrap();
        let records = ledger.events().since(0);
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].event,
            LedgerEvent::ModuleCreated {
                id,
                creator: CREATOR,
                metadata: "ipfs://a".into(),
                price: U256::from(5)
            }
        );
    }

    #[test]
    fn test_purchase_moves_funds() {
        let ledger = funded();
        let id = ledger.create_module(CREATOR, "m", U256::from(1000)).unwrap();
        let receipt = ledger.purchase_module(BUYER, id, U256::from(1100)).unwrap();

        assert_eq!(receipt.fee, U256::from(25));
        assert_eq!(receipt.creator_payment, U256::from(975));
        assert_eq!(receipt.refund, U256::from(100));
        assert_eq!(ledger.balance_of(BUYER), U256::from(9_000));
        assert_eq!(ledger.balance_of(CREATOR), U256::from(975));
        assert_eq!(ledger.balance_of(OWNER), U256::from(25));
        assert_eq!(ledger.total_balance(), U256::from(10_000));
        assert!(!ledger.is_purchase_in_flight());
    }

    #[test]
    fn test_purchase_without_balance() {
        let ledger = Ledger::new(OWNER);
        let id = ledger.create_module(CREATOR, "m", U256::from(1000)).unwrap();
        let err = ledger.purchase_module(BUYER, id, U256::from(1000)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Payment(PaymentFailure::InsufficientBalance { .. })
        ));
        assert_eq!(ledger.events().len(), 1);
        assert!(!ledger.is_purchase_in_flight());
    }

    #[test]
    fn test_rate_validation_precedes_lookup() {
        let ledger = Ledger::new(OWNER);
        assert!(matches!(
            ledger.rate_module(BUYER, 42, 9),
            Err(LedgerError::Validation(_))
        ));
        assert_eq!(ledger.rate_module(BUYER, 42, 3), Err(LedgerError::NotFound(42)));
    }

    #[test]
    fn test_fee_update_requires_owner() {
        let ledger = Ledger::new(OWNER);
        assert_eq!(
            ledger.set_platform_fee(CREATOR, 50),
            Err(LedgerError::Unauthorized {
                caller: CREATOR,
                role: Role::Owner
            })
        );
        assert!(matches!(
            ledger.set_platform_fee(OWNER, 101),
            Err(LedgerError::Validation(_))
        ));
        ledger.set_platform_fee(OWNER, 100).unwrap();
        assert_eq!(ledger.platform_fee_bps(), 100);
    }

    #[test]
    fn test_rejections_are_counted() {
        let ledger = Ledger::new(OWNER);
        let _ = ledger.get_module(1);
        let _ = ledger.deactivate_module(CREATOR, 1);
        let stats = ledger.telemetry().get_stats();
        // reads are not counted, mutations are
        assert_eq!(stats.rejections.get("LEDGER_NOT_FOUND"), Some(&1));
    }

    #[test]
    fn test_zero_deposit_rejected() {
        let ledger = Ledger::new(OWNER);
        assert!(ledger.deposit(BUYER, U256::ZERO).is_err());
        assert_eq!(ledger.deposit(BUYER, U256::from(3)).unwrap(), U256::from(3));
    }
}
