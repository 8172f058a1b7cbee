//! Constants Module - Single Source of Truth
//!
//! Marketplace parameters, bounds and service defaults. Other modules
//! import these instead of repeating literals.

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "OmniStack Ledger";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// FEE CONSTANTS
// ============================================

/// Denominator of the platform fee (fee_bps / 1000)
pub const FEE_DENOMINATOR: u64 = 1000;

/// Default platform fee: 25 / 1000 = 2.5%
pub const DEFAULT_PLATFORM_FEE_BPS: u64 = 25;

/// Maximum platform fee: 100 / 1000 = 10%
pub const MAX_PLATFORM_FEE_BPS: u64 = 100;

// ============================================
// RATING CONSTANTS
// ============================================

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

// ============================================
// MODULE CONSTANTS
// ============================================

/// First id handed out by the registry
pub const FIRST_MODULE_ID: u64 = 1;


// ============================================
// SERVER DEFAULTS
// ============================================

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

/// Requests per rate-limit window per key
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Rate-limit window (seconds)
pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Default page size for module listings
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// Hard cap on page size for module and event listings
pub const MAX_PAGE_LIMIT: usize = 500;

/// HTTP request body cap (bytes)
pub const MAX_REQUEST_BODY_BYTES: usize = 256 * 1024;

/// Capacity of the live event subscription channel
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Default telemetry export directory
pub const DEFAULT_TELEMETRY_DIR: &str = "./telemetry";

/// Header carrying the caller identity
pub const CALLER_HEADER: &str = "X-Caller-Address";

/// Check a fee rate against the cap
#[inline]
pub fn is_valid_fee_bps(fee_bps: u64) -> bool {
    fee_bps <= MAX_PLATFORM_FEE_BPS
}

/// Check a rating value against the accepted range
#[inline]
pub fn is_valid_rating(rating: u8) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&rating)
}
