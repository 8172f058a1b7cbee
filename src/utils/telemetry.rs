//! Telemetry Module
//!
//! Marketplace counters for monitoring: settled volume, platform fees,
//! refunds, ratings and rejected operations per error code. Counters are
//! atomics; U256 totals sit behind a lock.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::errors::ErrorCode;
use crate::utils::constants::DEFAULT_TELEMETRY_DIR;

/// Settled amounts, summed
#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    volume: U256,
    fees: U256,
    refunds: U256,
}

/// Aggregated statistics for reporting
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MarketStats {
    pub modules_created: u64,
    pub purchases: u64,
    pub failed_purchases: u64,
    pub ratings: u64,
    /// Decimal strings; U256 does not fit JSON numbers
    pub total_volume: String,
    pub total_fees: String,
    pub total_refunds: String,
    /// Rejections keyed by error code
    pub rejections: HashMap<String, u64>,
    pub period_start: u64,
    pub period_end: u64,
}

impl MarketStats {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Main telemetry collector
pub struct MarketTelemetry {
    modules_created: AtomicU64,
    purchases: AtomicU64,
    failed_purchases: AtomicU64,
    ratings: AtomicU64,
    totals: RwLock<Totals>,
    rejections: RwLock<HashMap<ErrorCode, u64>>,
    session_start: u64,
    export_dir: PathBuf,
}

impl MarketTelemetry {
    pub fn new() -> Self {
        Self::with_export_dir(PathBuf::from(DEFAULT_TELEMETRY_DIR))
    }

    pub fn with_export_dir(export_dir: PathBuf) -> Self {
        Self {
            modules_created: AtomicU64::new(0),
            purchases: AtomicU64::new(0),
            failed_purchases: AtomicU64::new(0),
            ratings: AtomicU64::new(0),
            totals: RwLock::new(Totals::default()),
            rejections: RwLock::new(HashMap::new()),
            session_start: current_timestamp(),
            export_dir,
        }
    }

    pub fn record_module_created(&self) {
        self.modules_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rating(&self) {
        self.ratings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_purchase(&self, price: U256, fee: U256, refund: U256) {
        self.purchases.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut totals) = self.totals.write() {
            totals.volume = totals.volume.saturating_add(price);
            totals.fees = totals.fees.saturating_add(fee);
            totals.refunds = totals.refunds.saturating_add(refund);
        }
    }

    pub fn record_failed_purchase(&self) {
        self.failed_purchases.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self, code: ErrorCode) {
        if let Ok(mut counts) = self.rejections.write() {
            *counts.entry(code).or_insert(0) += 1;
        }
    }

    pub fn get_stats(&self) -> MarketStats {
        let totals = self.totals.read().map(|t| *t).unwrap_or_default();

        let rejections = self
            .rejections
            .read()
            .map(|counts| {
                counts
                    .iter()
                    .map(|(code, n)| (code.as_str().to_string(), *n))
                    .collect()
            })
            .unwrap_or_default();

        MarketStats {
            modules_created: self.modules_created.load(Ordering::Relaxed),
            purchases: self.purchases.load(Ordering::Relaxed),
            failed_purchases: self.failed_purchases.load(Ordering::Relaxed),
            ratings: self.ratings.load(Ordering::Relaxed),
            total_volume: totals.volume.to_string(),
            total_fees: totals.fees.to_string(),
            total_refunds: totals.refunds.to_string(),
            rejections,
            period_start: self.session_start,
            period_end: current_timestamp(),
        }
    }

    /// Export current stats to a timestamped JSON file
    pub fn export_stats_json(&self) -> Result<PathBuf, std::io::Error> {
        fs::create_dir_all(&self.export_dir)?;
        let stats = self.get_stats();
        let path = self
            .export_dir
            .join(format!("market_stats_{}.json", current_timestamp()));

        let json = serde_json::to_string_pretty(&stats)?;
        fs::write(&path, json)?;

        Ok(path)
    }
}

impl Default for MarketTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
