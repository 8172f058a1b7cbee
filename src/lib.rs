//! OmniStack Ledger Library
//!
//! Module marketplace ledger: creators register priced modules, buyers
//! purchase them with the platform taking a fee, and buyers rate them.
//! - Sequential module registry with creator-only price updates and
//!   one-way deactivation
//! - Fee/creator split with exact refunds and all-or-nothing settlement
//! - Reentrancy-guarded purchases over a journaled funds vault
//! - Solidity ABI entry point and EVM log encoding of ledger events

pub mod api;
pub mod core;
pub mod models;
pub mod utils;

pub use crate::core::{EventLog, Ledger, PaymentReceiver};
pub use models::config::{LedgerConfig, ServerConfig};
pub use models::errors::{AppError, AppResult, ErrorCode, LedgerError, LedgerResult, PaymentFailure, Role};
pub use models::types::{
    EventRecord, LedgerEvent, Module, ModuleId, ModuleState, PaymentNotice, PurchaseReceipt, TransferKind,
};
pub use utils::abi::MarketplaceAbi;
pub use utils::telemetry::{MarketStats, MarketTelemetry};
