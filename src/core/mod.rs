//! Core Module - Marketplace Ledger
//!
//! Registry, settlement, rating aggregation and access control, composed
//! into `Ledger`. The vault and event log hold funds and history.

pub mod events;
pub mod guard;
pub mod ledger;
pub mod rating;
pub mod registry;
pub mod settlement;
pub mod vault;

pub use events::*;
pub use guard::*;
pub use ledger::*;
pub use rating::*;
pub use registry::*;
pub use settlement::*;
pub use vault::*;
