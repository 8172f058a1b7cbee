//! Models Module - Data Structures & Configuration
//!
//! Records, events, errors and configuration shared by the whole crate.

pub mod config;
pub mod errors;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;
