//! API Route Configuration

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{self, AppState};
use super::middleware::{logging_middleware, rate_limit_middleware};
use crate::utils::constants::MAX_REQUEST_BODY_BYTES;

/// Create the API router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health & Status
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats))
        // Platform
        .route("/platform", get(handlers::get_platform))
        .route("/platform/fee", put(handlers::set_platform_fee))
        // Modules
        .route(
            "/modules",
            get(handlers::list_modules).post(handlers::create_module),
        )
        .route("/modules/:id", get(handlers::get_module))
        .route("/modules/:id/price", put(handlers::update_module_price))
        .route("/modules/:id/deactivate", post(handlers::deactivate_module))
        .route("/modules/:id/purchase", post(handlers::purchase_module))
        .route("/modules/:id/rate", post(handlers::rate_module))
        // Accounts
        .route("/accounts/:address/balance", get(handlers::get_balance))
        .route("/accounts/:address/deposit", post(handlers::deposit))
        // Events & raw calldata
        .route("/events", get(handlers::list_events))
        .route("/tx", post(handlers::submit_tx));

    Router::new()
        .nest("/v1", api_v1)
        .route("/health", get(handlers::health_check))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        // Middleware (order matters - bottom runs first)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(rate_limit_middleware))
}
