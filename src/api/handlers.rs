//! API Request Handlers

use alloy_primitives::{Address, U256};
use axum::{
    async_trait,
    extract::{FromRequestParts, Json, Path, Query, State},
    http::{request::Parts, HeaderMap, StatusCode},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::types::*;
use crate::core::ledger::Ledger;
use crate::models::config::ServerConfig;
use crate::models::types::ModuleId;
use crate::utils::abi::MarketplaceAbi;
use crate::utils::constants::{CALLER_HEADER, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::utils::telemetry::MarketTelemetry;

/// Shared application state
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub telemetry: Arc<MarketTelemetry>,
    pub config: ServerConfig,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(ledger: Arc<Ledger>, config: ServerConfig) -> Self {
        Self {
            telemetry: ledger.telemetry().clone(),
            ledger,
            config,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Error half of every fallible handler
pub type ApiFailure = (StatusCode, Json<ApiResponse<()>>);

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiFailure>;

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn fail(error: impl Into<ApiError>, start: Instant) -> ApiFailure {
    let error = error.into();
    let status = StatusCode::from_u16(error.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ApiResponse::error(error, elapsed_ms(start))))
}

fn ok<T: serde::Serialize>(data: T, start: Instant) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data, elapsed_ms(start))))
}

/// Caller identity from the `X-Caller-Address` header
fn caller(headers: &HeaderMap) -> Result<Address, ApiError> {
    headers
        .get(CALLER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| raw.trim().parse::<Address>().ok())
        .ok_or_else(ApiError::missing_caller)
}

/// `:id` path segment; malformed ids answer with the JSON envelope
pub struct ModulePath(pub ModuleId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ModulePath {
    type Rejection = ApiFailure;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let start = Instant::now();
        Path::<ModuleId>::from_request_parts(parts, state)
            .await
            .map(|Path(id)| Self(id))
            .map_err(|rejection| {
                fail(
                    ApiError::bad_request("Invalid module id").with_details(rejection.body_text()),
                    start,
                )
            })
    }
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Stats & Platform
// ============================================

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatsData>> {
    let start = Instant::now();

    let data = StatsData {
        market: state.telemetry.get_stats(),
        module_count: state.ledger.module_count(),
        event_count: state.ledger.events().len(),
        vault_total: state.ledger.total_balance().to_string(),
        uptime_seconds: state.uptime_seconds(),
        api_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

pub async fn get_platform(State(state): State<Arc<AppState>>) -> Json<ApiResponse<PlatformData>> {
    let start = Instant::now();

    let data = PlatformData {
        owner: state.ledger.owner(),
        fee_bps: state.ledger.platform_fee_bps(),
        module_count: state.ledger.module_count(),
        purchase_in_flight: state.ledger.is_purchase_in_flight(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

pub async fn set_platform_fee(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SetFeeRequest>,
) -> ApiResult<PlatformData> {
    let start = Instant::now();
    let caller = caller(&headers).map_err(|e| fail(e, start))?;

    state
        .ledger
        .set_platform_fee(caller, req.fee_bps)
        .map_err(|e| fail(e, start))?;

    ok(
        PlatformData {
            owner: state.ledger.owner(),
            fee_bps: state.ledger.platform_fee_bps(),
            module_count: state.ledger.module_count(),
            purchase_in_flight: state.ledger.is_purchase_in_flight(),
        },
        start,
    )
}

// ============================================
// Modules
// ============================================

pub async fn list_modules(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Json<ApiResponse<ModuleListData>> {
    let start = Instant::now();
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT);

    let modules = state
        .ledger
        .list_modules(query.offset, limit)
        .into_iter()
        .map(ModuleResponse::from)
        .collect();

    let data = ModuleListData {
        total: state.ledger.module_count(),
        offset: query.offset,
        modules,
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

pub async fn create_module(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateModuleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedData>>), ApiFailure> {
    let start = Instant::now();
    let caller = caller(&headers).map_err(|e| fail(e, start))?;
    let price = parse_amount(&req.price).map_err(|e| fail(e, start))?;

    let id = state
        .ledger
        .create_module(caller, req.metadata, price)
        .map_err(|e| fail(e, start))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreatedData { id }, elapsed_ms(start))),
    ))
}

pub async fn get_module(
    State(state): State<Arc<AppState>>,
    ModulePath(id): ModulePath,
) -> ApiResult<ModuleResponse> {
    let start = Instant::now();
    debug!(module_id = id, "Module lookup");

    let module = state.ledger.get_module(id).map_err(|e| fail(e, start))?;
    ok(module.into(), start)
}

pub async fn update_module_price(
    State(state): State<Arc<AppState>>,
    ModulePath(id): ModulePath,
    headers: HeaderMap,
    Json(req): Json<UpdatePriceRequest>,
) -> ApiResult<ModuleResponse> {
    let start = Instant::now();
    let caller = caller(&headers).map_err(|e| fail(e, start))?;
    let price = parse_amount(&req.price).map_err(|e| fail(e, start))?;

    state
        .ledger
        .update_module_price(caller, id, price)
        .map_err(|e| fail(e, start))?;

    let module = state.ledger.get_module(id).map_err(|e| fail(e, start))?;
    ok(module.into(), start)
}

pub async fn deactivate_module(
    State(state): State<Arc<AppState>>,
    ModulePath(id): ModulePath,
    headers: HeaderMap,
) -> ApiResult<ModuleResponse> {
    let start = Instant::now();
    let caller = caller(&headers).map_err(|e| fail(e, start))?;

    state
        .ledger
        .deactivate_module(caller, id)
        .map_err(|e| fail(e, start))?;

    let module = state.ledger.get_module(id).map_err(|e| fail(e, start))?;
    ok(module.into(), start)
}

pub async fn purchase_module(
    State(state): State<Arc<AppState>>,
    ModulePath(id): ModulePath,
    headers: HeaderMap,
    Json(req): Json<PurchaseRequest>,
) -> ApiResult<ReceiptResponse> {
    let start = Instant::now();
    let buyer = caller(&headers).map_err(|e| fail(e, start))?;
    let payment = parse_amount(&req.payment).map_err(|e| fail(e, start))?;

    let receipt = state
        .ledger
        .purchase_module(buyer, id, payment)
        .map_err(|e| fail(e, start))?;

    ok(receipt.into(), start)
}

pub async fn rate_module(
    State(state): State<Arc<AppState>>,
    ModulePath(id): ModulePath,
    headers: HeaderMap,
    Json(req): Json<RateRequest>,
) -> ApiResult<ModuleResponse> {
    let start = Instant::now();
    let rater = caller(&headers).map_err(|e| fail(e, start))?;

    state
        .ledger
        .rate_module(rater, id, req.rating)
        .map_err(|e| fail(e, start))?;

    let module = state.ledger.get_module(id).map_err(|e| fail(e, start))?;
    ok(module.into(), start)
}

// ============================================
// Accounts
// ============================================

pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> ApiResult<BalanceData> {
    let start = Instant::now();
    let address = parse_address(&address).map_err(|e| fail(e, start))?;

    ok(
        BalanceData {
            address,
            balance: state.ledger.balance_of(address).to_string(),
        },
        start,
    )
}

/// Test faucet; mints funds into an account
pub async fn deposit(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Json(req): Json<DepositRequest>,
) -> ApiResult<BalanceData> {
    let start = Instant::now();
    if !state.config.faucet_enabled {
        return Err(fail(ApiError::disabled("Faucet"), start));
    }

    let address = parse_address(&address).map_err(|e| fail(e, start))?;
    let amount = parse_amount(&req.amount).map_err(|e| fail(e, start))?;

    let balance = state
        .ledger
        .deposit(address, amount)
        .map_err(|e| fail(e, start))?;

    info!(account = %address, amount = %amount, "Faucet deposit");
    ok(
        BalanceData {
            address,
            balance: balance.to_string(),
        },
        start,
    )
}

// ============================================
// Events
// ============================================

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Json<ApiResponse<Vec<EventResponse>>> {
    let start = Instant::now();

    let limit = query.limit.unwrap_or(MAX_PAGE_LIMIT).min(MAX_PAGE_LIMIT);

    let events = state
        .ledger
        .events()
        .page(query.since, limit)
        .into_iter()
        .map(EventResponse::from)
        .collect();

    Json(ApiResponse::success(events, elapsed_ms(start)))
}

// ============================================
// Raw transactions
// ============================================

pub async fn submit_tx(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<TxRequest>,
) -> ApiResult<TxData> {
    let start = Instant::now();
    let caller = caller(&headers).map_err(|e| fail(e, start))?;

    let calldata = hex::decode(req.data.trim().trim_start_matches("0x"))
        .map_err(|_| fail(ApiError::bad_request("Calldata is not valid hex"), start))?;
    let value = match req.value.as_deref() {
        Some(raw) => parse_amount(raw).map_err(|e| fail(e, start))?,
        None => U256::ZERO,
    };

    let output = MarketplaceAbi::execute(&state.ledger, caller, value, &calldata)
        .map_err(|e| fail(e, start))?;

    ok(
        TxData {
            output: format!("0x{}", hex::encode(&output)),
        },
        start,
    )
}
