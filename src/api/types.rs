//! API Request/Response Types

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::errors::{AppError, ErrorCode, LedgerError};
use crate::models::types::{EventRecord, Module, ModuleId, PurchaseReceipt};
use crate::utils::abi::MarketplaceAbi;
use crate::utils::telemetry::MarketStats;

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip)]
    pub status: u16,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_str().to_string(),
            message: message.into(),
            details: None,
            status: code.http_status(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiBadRequest, message)
    }

    pub fn missing_caller() -> Self {
        Self::new(
            ErrorCode::ApiMissingCaller,
            "Missing or invalid X-Caller-Address header",
        )
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self::new(
            ErrorCode::ApiRateLimited,
            format!("Rate limit exceeded. Retry after {} seconds", retry_after),
        )
        .with_details(format!("retry_after: {}", retry_after))
    }

    pub fn disabled(what: &str) -> Self {
        Self::new(ErrorCode::ApiDisabled, format!("{} is disabled", what))
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let code = err.code();
        let error = Self::new(code, err.to_string());
        if code.is_retryable() {
            error.with_details("retryable")
        } else {
            error
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::new(err.code, err.message)
    }
}

/// Parse an amount given as a decimal or 0x-prefixed hex string
pub fn parse_amount(raw: &str) -> Result<U256, ApiError> {
    U256::from_str(raw.trim()).map_err(|_| ApiError::bad_request(format!("Invalid amount: {:?}", raw)))
}

pub fn parse_address(raw: &str) -> Result<Address, ApiError> {
    Address::from_str(raw.trim()).map_err(|_| ApiError::bad_request(format!("Invalid address: {:?}", raw)))
}

// ============================================
// Modules
// ============================================

#[derive(Debug, Deserialize)]
pub struct CreateModuleRequest {
    pub metadata: String,
    pub price: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePriceRequest {
    pub price: String,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub payment: String,
}

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub rating: u8,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct CreatedData {
    pub id: ModuleId,
}

#[derive(Debug, Serialize)]
pub struct ModuleResponse {
    pub id: ModuleId,
    pub creator: Address,
    pub metadata: String,
    pub price: String,
    pub is_active: bool,
    pub state: String,
    pub rating: u64,
    pub num_ratings: u64,
}

impl From<Module> for ModuleResponse {
    fn from(module: Module) -> Self {
        Self {
            id: module.id,
            creator: module.creator,
            state: module.state().as_str().to_string(),
            metadata: module.metadata,
            price: module.price.to_string(),
            is_active: module.is_active,
            rating: module.rating,
            num_ratings: module.num_ratings,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModuleListData {
    pub total: usize,
    pub offset: usize,
    pub modules: Vec<ModuleResponse>,
}

#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    pub module_id: ModuleId,
    pub buyer: Address,
    pub price: String,
    pub fee: String,
    pub creator_payment: String,
    pub refund: String,
}

impl From<PurchaseReceipt> for ReceiptResponse {
    fn from(receipt: PurchaseReceipt) -> Self {
        Self {
            module_id: receipt.module_id,
            buyer: receipt.buyer,
            price: receipt.price.to_string(),
            fee: receipt.fee.to_string(),
            creator_payment: receipt.creator_payment.to_string(),
            refund: receipt.refund.to_string(),
        }
    }
}

// ============================================
// Platform & Accounts
// ============================================

#[derive(Debug, Deserialize)]
pub struct SetFeeRequest {
    pub fee_bps: u64,
}

#[derive(Debug, Serialize)]
pub struct PlatformData {
    pub owner: Address,
    pub fee_bps: u64,
    pub module_count: usize,
    pub purchase_in_flight: bool,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount: String,
}

#[derive(Debug, Serialize)]
pub struct BalanceData {
    pub address: Address,
    pub balance: String,
}

// ============================================
// Events
// ============================================

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub since: u64,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    #[serde(flatten)]
    pub record: EventRecord,
    /// EVM log encoding of the event
    pub topics: Vec<String>,
    pub data: String,
}

impl From<EventRecord> for EventResponse {
    fn from(record: EventRecord) -> Self {
        let log = MarketplaceAbi::encode_event(&record.event);
        Self {
            topics: log.topics().iter().map(|t| format!("0x{}", hex::encode(t))).collect(),
            data: format!("0x{}", hex::encode(&log.data)),
            record,
        }
    }
}

// ============================================
// Raw transactions
// ============================================

#[derive(Debug, Deserialize)]
pub struct TxRequest {
    /// Hex calldata, with or without 0x
    pub data: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TxData {
    pub output: String,
}

// ============================================
// Stats / Health
// ============================================

#[derive(Debug, Serialize)]
pub struct StatsData {
    #[serde(flatten)]
    pub market: MarketStats,
    pub module_count: usize,
    pub event_count: usize,
    pub vault_total: String,
    pub uptime_seconds: u64,
    pub api_version: String,
}

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1000").unwrap(), U256::from(1000));
        assert_eq!(parse_amount("0x10").unwrap(), U256::from(16));
        assert!(parse_amount("ten").is_err());
    }

    #[test]
    fn test_ledger_error_mapping() {
        let err: ApiError = LedgerError::NotFound(7).into();
        assert_eq!(err.code, "LEDGER_NOT_FOUND");
        assert_eq!(err.status, 404);

        let err: ApiError = LedgerError::Reentrancy.into();
        assert_eq!(err.status, 409);
        assert_eq!(err.details.as_deref(), Some("retryable"));
    }

    #[test]
    fn test_module_response_uses_decimal_strings() {
        let module = Module::new(1, Address::ZERO, "m".to_string(), U256::from(10).pow(U256::from(30)));
        let resp = ModuleResponse::from(module);
        assert_eq!(resp.price, "1000000000000000000000000000000");
        assert_eq!(resp.state, "ACTIVE");
    }
}
