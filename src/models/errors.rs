//! Centralized Error Handling Module
//!
//! Every rejected ledger operation carries a unique, stable error code so the
//! API layer, telemetry and logs all agree on what went wrong.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - LEDGER_xxx: ledger operation errors
//! - API_xxx: API errors
//! - CFG_xxx: Configuration errors

use alloy_primitives::{Address, U256};
use std::fmt;

use crate::models::types::ModuleId;

/// Role an authorization check was performed against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Creator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => f.write_str("platform owner"),
            Role::Creator => f.write_str("module creator"),
        }
    }
}

/// Why a settlement could not move funds
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaymentFailure {
    /// Attached payment does not cover the module price
    #[error("insufficient payment: price {price}, attached {attached}")]
    Insufficient { price: U256, attached: U256 },
    /// Account cannot cover the amount it is asked to send
    #[error("insufficient balance for {account}: balance {balance}, required {required}")]
    InsufficientBalance {
        account: Address,
        balance: U256,
        required: U256,
    },
    /// A payment receiver refused the transfer
    #[error("transfer to {to} rejected: {reason}")]
    TransferRejected { to: Address, reason: String },
    /// Amount arithmetic left the U256 range
    #[error("amount overflow")]
    Overflow,
}

/// Errors returned by ledger operations.
///
/// Each variant aborts the triggering operation as a whole.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Bad price, rating, fee or calldata
    #[error("validation failed: {0}")]
    Validation(String),
    /// Caller is not the required owner/creator
    #[error("caller {caller} is not the {role}")]
    Unauthorized { caller: Address, role: Role },
    /// Operation on a deactivated module
    #[error("module {0} is inactive")]
    Inactive(ModuleId),
    /// Unknown module id
    #[error("module {0} not found")]
    NotFound(ModuleId),
    /// Funds could not be settled
    #[error("payment failed: {0}")]
    Payment(#[from] PaymentFailure),
    /// A purchase is already in flight
    #[error("reentrant purchase rejected")]
    Reentrancy,
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Monitoring code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::LedgerValidation,
            Self::Unauthorized { .. } => ErrorCode::LedgerUnauthorized,
            Self::Inactive(_) => ErrorCode::LedgerInactive,
            Self::NotFound(_) => ErrorCode::LedgerNotFound,
            Self::Payment(_) => ErrorCode::LedgerPayment,
            Self::Reentrancy => ErrorCode::LedgerReentrancy,
        }
    }
}

/// Ledger Result type
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Application-wide error type for everything outside the ledger core
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// Invalid configuration value
    pub fn invalid_config(key: &str, value: &str) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid value for {}: {:?}", key, value),
        )
    }

    /// API bad request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiBadRequest, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Unknown, "IO error", err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::ApiBadRequest, "JSON error", err)
    }
}

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // ============================================
    // Ledger Errors (1xx)
    // ============================================
    /// Bad price, rating, fee or calldata
    LedgerValidation,
    /// Caller lacks the owner/creator role
    LedgerUnauthorized,
    /// Module is deactivated
    LedgerInactive,
    /// Unknown module id
    LedgerNotFound,
    /// Settlement failed
    LedgerPayment,
    /// Purchase attempted while one is settling on the same call stack
    LedgerReentrancy,

    // ============================================
    // API Errors (3xx)
    // ============================================
    /// Invalid request format
    ApiBadRequest,
    /// Missing or malformed caller address
    ApiMissingCaller,
    /// Rate limit exceeded
    ApiRateLimited,
    /// Endpoint disabled by configuration
    ApiDisabled,

    // ============================================
    // Configuration Errors (4xx)
    // ============================================
    /// Invalid configuration value
    ConfigInvalidValue,

    // ============================================
    // Generic Errors (9xx)
    // ============================================
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LedgerValidation => "LEDGER_VALIDATION",
            Self::LedgerUnauthorized => "LEDGER_UNAUTHORIZED",
            Self::LedgerInactive => "LEDGER_INACTIVE",
            Self::LedgerNotFound => "LEDGER_NOT_FOUND",
            Self::LedgerPayment => "LEDGER_PAYMENT",
            Self::LedgerReentrancy => "LEDGER_REENTRANCY",

            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::ApiMissingCaller => "API_MISSING_CALLER",
            Self::ApiRateLimited => "API_RATE_LIMITED",
            Self::ApiDisabled => "API_DISABLED",

            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",

            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::LedgerValidation | Self::ApiBadRequest | Self::ConfigInvalidValue => 400,
            Self::ApiMissingCaller => 401,
            Self::LedgerPayment => 402,
            Self::LedgerUnauthorized | Self::ApiDisabled => 403,
            Self::LedgerNotFound => 404,
            Self::LedgerInactive | Self::LedgerReentrancy => 409,
            Self::ApiRateLimited => 429,
            Self::Unknown => 500,
        }
    }

    /// Check if the caller may retry the identical request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LedgerReentrancy | Self::ApiRateLimited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = LedgerError::validation("price must be greater than zero");
        assert_eq!(err.code(), ErrorCode::LedgerValidation);
        assert_eq!(err.code().as_str(), "LEDGER_VALIDATION");
        assert_eq!(LedgerError::Reentrancy.code().as_str(), "LEDGER_REENTRANCY");
    }

    #[test]
    fn test_http_status() {
        assert_eq!(ErrorCode::LedgerValidation.http_status(), 400);
        assert_eq!(ErrorCode::LedgerUnauthorized.http_status(), 403);
        assert_eq!(ErrorCode::LedgerNotFound.http_status(), 404);
        assert_eq!(ErrorCode::LedgerPayment.http_status(), 402);
        assert_eq!(ErrorCode::ApiRateLimited.http_status(), 429);
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::LedgerReentrancy.is_retryable());
        assert!(!ErrorCode::LedgerUnauthorized.is_retryable());
    }

    #[test]
    fn test_payment_failure_converts() {
        let err: LedgerError = PaymentFailure::Overflow.into();
        assert_eq!(err, LedgerError::Payment(PaymentFailure::Overflow));
        assert!(err.to_string().contains("amount overflow"));
    }

    #[test]
    fn test_app_error_from_ledger() {
        let app: AppError = LedgerError::NotFound(7).into();
        assert_eq!(app.code_str(), "LEDGER_NOT_FOUND");
        assert!(app.to_string().contains("module 7 not found"));
    }
}
