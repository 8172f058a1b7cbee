//! Type definitions for the module marketplace
//! Core records shared by the ledger, the event log and the API

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Sequential module identifier, starting at 1
pub type ModuleId = u64;

/// Lifecycle state of a module id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleState {
    NonExistent,
    Active,
    /// Terminal
    Inactive,
}

impl ModuleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleState::NonExistent => "NON_EXISTENT",
            ModuleState::Active => "ACTIVE",
            ModuleState::Inactive => "INACTIVE",
        }
    }
}

/// A registered, purchasable module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub creator: Address,
    /// Opaque off-chain descriptor
    pub metadata: String,
    /// Price in the smallest currency unit
    pub price: U256,
    pub is_active: bool,
    /// Running average produced by the truncating recurrence (0..=5)
    pub rating: u64,
    pub num_ratings: u64,
}

impl Module {
    pub fn new(id: ModuleId, creator: Address, metadata: String, price: U256) -> Self {
        Self {
            id,
            creator,
            metadata,
            price,
            is_active: true,
            rating: 0,
            num_ratings: 0,
        }
    }

    pub fn state(&self) -> ModuleState {
        if self.is_active {
            ModuleState::Active
        } else {
            ModuleState::Inactive
        }
    }
}

/// Why funds are being credited during a settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferKind {
    CreatorPayment,
    PlatformFee,
    Refund,
}

impl TransferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferKind::CreatorPayment => "creator_payment",
            TransferKind::PlatformFee => "platform_fee",
            TransferKind::Refund => "refund",
        }
    }
}

/// Delivered to a payment receiver after its account was credited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotice {
    pub module_id: ModuleId,
    pub buyer: Address,
    pub to: Address,
    pub amount: U256,
    pub kind: TransferKind,
}

/// Outcome of a settled purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub module_id: ModuleId,
    pub buyer: Address,
    pub price: U256,
    pub fee: U256,
    pub creator_payment: U256,
    pub refund: U256,
}

/// Observable ledger events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LedgerEvent {
    ModuleCreated {
        id: ModuleId,
        creator: Address,
        metadata: String,
        price: U256,
    },
    ModulePurchased {
        id: ModuleId,
        buyer: Address,
        price: U256,
    },
    ModuleRated {
        id: ModuleId,
        rater: Address,
        rating: u8,
    },
    ModulePriceUpdated {
        id: ModuleId,
        old_price: U256,
        new_price: U256,
    },
    ModuleDeactivated {
        id: ModuleId,
    },
    PlatformFeeUpdated {
        old_fee_bps: u64,
        new_fee_bps: u64,
    },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::ModuleCreated { .. } => "ModuleCreated",
            LedgerEvent::ModulePurchased { .. } => "ModulePurchased",
            LedgerEvent::ModuleRated { .. } => "ModuleRated",
            LedgerEvent::ModulePriceUpdated { .. } => "ModulePriceUpdated",
            LedgerEvent::ModuleDeactivated { .. } => "ModuleDeactivated",
            LedgerEvent::PlatformFeeUpdated { .. } => "PlatformFeeUpdated",
        }
    }

    /// Module the event refers to, if any
    pub fn module_id(&self) -> Option<ModuleId> {
        match self {
            LedgerEvent::ModuleCreated { id, .. }
            | LedgerEvent::ModulePurchased { id, .. }
            | LedgerEvent::ModuleRated { id, .. }
            | LedgerEvent::ModulePriceUpdated { id, .. }
            | LedgerEvent::ModuleDeactivated { id } => Some(*id),
            LedgerEvent::PlatformFeeUpdated { .. } => None,
        }
    }
}

/// An event as stored in the append-only log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// 1-based position in the log
    pub seq: u64,
    /// Unix timestamp (seconds)
    pub timestamp: i64,
    pub event: LedgerEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_module_defaults() {
        let module = Module::new(1, Address::ZERO, "ipfs://meta".to_string(), U256::from(10));
        assert!(module.is_active);
        assert_eq!(module.rating, 0);
        assert_eq!(module.num_ratings, 0);
        assert_eq!(module.state(), ModuleState::Active);
    }

    #[test]
    fn test_event_module_id() {
        let event = LedgerEvent::ModuleDeactivated { id: 4 };
        assert_eq!(event.module_id(), Some(4));
        assert_eq!(event.name(), "ModuleDeactivated");

        let fee = LedgerEvent::PlatformFeeUpdated {
            old_fee_bps: 25,
            new_fee_bps: 50,
        };
        assert_eq!(fee.module_id(), None);
    }
}
