// =============================================================================
// Tickerdeck — Main Entry Point
// =============================================================================
//
// One consumer task owns every panel and ticker. Stream workers feed it through
// the dispatcher; the HTTP layer feeds it commands and reads the board.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod binance;
mod dashboard;
mod market_data;
mod preferences;
mod runtime_config;
mod stream;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::rest::ApiState;
use crate::binance::BinanceClient;
use crate::dashboard::{Dashboard, DashboardCommand, DashboardSettings, SharedBoard};
use crate::preferences::PreferencesStore;
use crate::runtime_config::RuntimeConfig;
use crate::stream::{Dispatcher, LogObserver, StreamEndpoints, StreamFactory, WsConnector};

const CONFIG_PATH: &str = "tickerdeck_config.json";
const COMMAND_QUEUE: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Tickerdeck starting up");

    let mut config = RuntimeConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    if !std::path::Path::new(CONFIG_PATH).exists() {
        if let Err(e) = config.save(CONFIG_PATH) {
            warn!(error = %e, "Failed to write default config");
        }
    }
    config.apply_env_overrides();

    let symbols = config.symbol_set();
    let initial_symbol = config
        .initial_symbol(&symbols)
        .context("no symbol available for the dashboard panels")?;

    info!(
        symbols = ?symbols.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        initial = %initial_symbol,
        interval = %config.kline_interval,
        "Configured symbols"
    );

    // ── 2. Stream plumbing ───────────────────────────────────────────────
    let (dispatcher, events) = Dispatcher::channel();
    let factory = StreamFactory::new(
        StreamEndpoints::new(config.stream_base_url.clone(), config.kline_interval.clone()),
        Arc::new(WsConnector),
        dispatcher,
        Arc::new(LogObserver),
    );

    // ── 3. Bootstrap source ──────────────────────────────────────────────
    let client = BinanceClient::new(config.rest_base_url.clone(), config.kline_interval.clone())?;

    // ── 4. Dashboard ─────────────────────────────────────────────────────
    let board = SharedBoard::new();
    let mut dashboard = Dashboard::new(
        DashboardSettings {
            symbols: symbols.clone(),
            initial_symbol,
            history_limit: config.history_limit,
        },
        factory,
        Arc::new(client),
        PreferencesStore::new(&config.preferences_path),
        Box::new(board.sink()),
    );
    dashboard.restore().await;

    let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
    let consumer = tokio::spawn(dashboard.run(events, command_rx));

    // ── 5. HTTP control surface ──────────────────────────────────────────
    let app = api::rest::router(ApiState {
        board,
        commands: command_tx.clone(),
        symbols,
    });
    let bind_addr = config.bind_addr.clone();
    tokio::spawn(async move {
        let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(addr = %bind_addr, error = %e, "Failed to bind HTTP listener, API disabled");
                return;
            }
        };
        info!(addr = %bind_addr, "HTTP API listening");
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "HTTP server exited");
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 6. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received, stopping gracefully");

    if command_tx.send(DashboardCommand::Shutdown).await.is_err() {
        warn!("Dashboard consumer already stopped");
    }
    if let Err(e) = consumer.await {
        error!(error = %e, "Dashboard consumer task failed");
    }

    info!("Tickerdeck shut down complete.");
    Ok(())
}
