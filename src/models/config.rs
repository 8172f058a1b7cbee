//! Configuration for the ledger and its HTTP service
//!
//! Values come from environment variables with defaults taken from
//! `utils::constants`. Malformed values are rejected at startup.

use alloy_primitives::{Address, U256};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{
    is_valid_fee_bps, DEFAULT_HOST, DEFAULT_PLATFORM_FEE_BPS, DEFAULT_PORT, DEFAULT_RATE_LIMIT,
    DEFAULT_TELEMETRY_DIR, RATE_LIMIT_WINDOW_SECS,
};

/// Parameters fixed when the ledger is deployed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Platform operator; receives fees and may change the fee rate
    pub owner: Address,
    pub platform_fee_bps: u64,
    /// Initial account balances
    pub genesis: Vec<(Address, U256)>,
}

impl LedgerConfig {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            platform_fee_bps: DEFAULT_PLATFORM_FEE_BPS,
            genesis: Vec::new(),
        }
    }

    pub fn with_fee_bps(mut self, fee_bps: u64) -> Self {
        self.platform_fee_bps = fee_bps;
        self
    }

    pub fn with_allocation(mut self, account: Address, amount: U256) -> Self {
        self.genesis.push((account, amount));
        self
    }

    /// Load from `MARKET_OWNER`, `MARKET_FEE_BPS` and `MARKET_GENESIS`
    pub fn from_env() -> AppResult<Self> {
        let owner = match std::env::var("MARKET_OWNER") {
            Ok(raw) => parse_address("MARKET_OWNER", &raw)?,
            Err(_) => Address::ZERO,
        };

        let platform_fee_bps = match std::env::var("MARKET_FEE_BPS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|bps| is_valid_fee_bps(*bps))
                .ok_or_else(|| AppError::invalid_config("MARKET_FEE_BPS", &raw))?,
            Err(_) => DEFAULT_PLATFORM_FEE_BPS,
        };

        let genesis = match std::env::var("MARKET_GENESIS") {
            Ok(raw) => parse_genesis(&raw)?,
            Err(_) => Vec::new(),
        };

        info!(
            owner = %owner,
            fee_bps = platform_fee_bps,
            allocations = genesis.len(),
            "Ledger configuration loaded"
        );

        Ok(Self {
            owner,
            platform_fee_bps,
            genesis,
        })
    }
}

/// HTTP service settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Enables `POST /v1/accounts/:address/deposit`
    pub faucet_enabled: bool,
    pub rate_limit: u32,
    pub rate_limit_window: Duration,
    pub telemetry_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            faucet_enabled: false,
            rate_limit: DEFAULT_RATE_LIMIT,
            rate_limit_window: Duration::from_secs(RATE_LIMIT_WINDOW_SECS),
            telemetry_dir: PathBuf::from(DEFAULT_TELEMETRY_DIR),
        }
    }
}

impl ServerConfig {
    /// Load from the environment.
    ///
    /// `PORT` (set by most hosting platforms) wins over `MARKET_PORT`.
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();

        let host = std::env::var("MARKET_HOST").unwrap_or(defaults.host);

        let port = match std::env::var("PORT").or_else(|_| std::env::var("MARKET_PORT")) {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| AppError::invalid_config("PORT", &raw))?,
            Err(_) => defaults.port,
        };

        let faucet_enabled = match std::env::var("MARKET_FAUCET") {
            Ok(raw) => parse_flag("MARKET_FAUCET", &raw)?,
            Err(_) => defaults.faucet_enabled,
        };

        let rate_limit = match std::env::var("MARKET_RATE_LIMIT") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|limit| *limit > 0)
                .ok_or_else(|| AppError::invalid_config("MARKET_RATE_LIMIT", &raw))?,
            Err(_) => defaults.rate_limit,
        };

        let telemetry_dir = std::env::var("MARKET_TELEMETRY_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.telemetry_dir);

        Ok(Self {
            host,
            port,
            faucet_enabled,
            rate_limit,
            rate_limit_window: defaults.rate_limit_window,
            telemetry_dir,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_address(key: &str, raw: &str) -> AppResult<Address> {
    Address::from_str(raw.trim()).map_err(|_| AppError::invalid_config(key, raw))
}

fn parse_flag(key: &str, raw: &str) -> AppResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::invalid_config(key, raw)),
    }
}

/// Parse `addr=amount,addr=amount`; amounts accept decimal or 0x-hex
pub fn parse_genesis(raw: &str) -> AppResult<Vec<(Address, U256)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (addr, amount) = entry
                .split_once('=')
                .ok_or_else(|| AppError::invalid_config("MARKET_GENESIS", entry))?;
            let addr = parse_address("MARKET_GENESIS", addr)?;
            let amount = U256::from_str(amount.trim())
                .map_err(|_| AppError::invalid_config("MARKET_GENESIS", entry))?;
            Ok((addr, amount))
        })
        .collect()
}
