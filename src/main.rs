//! OmniStack Ledger API Server
//!
//! Usage:
//!   cargo run
//!
//! Environment:
//!   MARKET_OWNER         - Platform owner address (default: zero address)
//!   MARKET_FEE_BPS       - Platform fee in per-mille (default: 25, max: 100)
//!   MARKET_GENESIS       - Initial balances, `addr=amount,addr=amount`
//!   PORT / MARKET_PORT   - Server port (default: 8080)
//!   MARKET_HOST          - Server host (default: 0.0.0.0)
//!   MARKET_FAUCET        - Enable the deposit endpoint (default: off)
//!   MARKET_RATE_LIMIT    - Requests per minute per caller (default: 100)
//!   MARKET_TELEMETRY_DIR - Stats export directory (default: ./telemetry)
//!   RUST_LOG             - Log filter (default: info)

use eyre::WrapErr;
use omnistack_ledger::api::{create_router, start_cleanup_task, AppState};
use omnistack_ledger::utils::constants::{APP_NAME, APP_VERSION};
use omnistack_ledger::{Ledger, LedgerConfig, MarketTelemetry, ServerConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    info!("{} v{}", APP_NAME, APP_VERSION);

    let ledger_config = LedgerConfig::from_env().wrap_err("invalid ledger configuration")?;
    let server_config = ServerConfig::from_env().wrap_err("invalid server configuration")?;

    let telemetry = Arc::new(MarketTelemetry::with_export_dir(server_config.telemetry_dir.clone()));
    let ledger = Ledger::from_config(&ledger_config)
        .wrap_err("failed to initialize ledger")?
        .with_telemetry(telemetry.clone());

    if server_config.faucet_enabled {
        warn!("Faucet enabled: POST /v1/accounts/:address/deposit mints funds");
    }

    let addr: SocketAddr = server_config
        .bind_address()
        .parse()
        .wrap_err("invalid bind address")?;

    let state = Arc::new(AppState::new(Arc::new(ledger), server_config));
    start_cleanup_task();

    let app = create_router(state);

    info!(address = %addr, owner = %ledger_config.owner, "Marketplace API listening");
    info!("Endpoints:");
    info!("  GET  /v1/modules               - List modules");
    info!("  POST /v1/modules               - Create module");
    info!("  POST /v1/modules/:id/purchase  - Purchase module");
    info!("  POST /v1/modules/:id/rate      - Rate module");
    info!("  POST /v1/tx                    - Submit ABI calldata");
    info!("  GET  /v1/events                - Ledger events");
    info!("  GET  /v1/stats                 - Marketplace statistics");

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown signal received, exporting telemetry");
    let stats = telemetry.get_stats();
    info!(
        modules = stats.modules_created,
        purchases = stats.purchases,
        volume = %stats.total_volume,
        fees = %stats.total_fees,
        "Final marketplace stats"
    );

    match telemetry.export_stats_json() {
        Ok(path) => info!("Stats exported to: {}", path.display()),
        Err(e) => warn!("Failed to export stats: {}", e),
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}
