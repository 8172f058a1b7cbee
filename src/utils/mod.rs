//! Utils Module - Helper Functions & Shared Utilities
//!
//! Constants, the marketplace ABI and telemetry shared across the crate.

pub mod abi;
pub mod constants;
pub mod telemetry;

pub use abi::*;
pub use constants::*;
pub use telemetry::*;
