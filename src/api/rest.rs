// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. Reads come from the shared board
// snapshot; writes are queued as dashboard commands and answered with
// 202 Accepted. The HTTP layer never touches dashboard state directly.
//
// CORS is configured permissively for local use.
// =============================================================================

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::dashboard::{DashboardCommand, Panel, SharedBoard};
use crate::types::{Symbol, SymbolSet};

type ApiError = (StatusCode, Json<serde_json::Value>);

/// Shared state for every handler.
#[derive(Clone)]
pub struct ApiState {
    pub board: SharedBoard,
    pub commands: mpsc::Sender<DashboardCommand>,
    pub symbols: SymbolSet,
}

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Reads ───────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        .route("/api/v1/snapshot", get(snapshot))
        .route("/api/v1/symbols", get(symbols))
        // ── Commands ────────────────────────────────────────────────
        .route("/api/v1/panels/:panel/show", post(show_panel))
        .route("/api/v1/panels/:panel/hide", post(hide_panel))
        .route("/api/v1/panels/:panel/toggle", post(toggle_panel))
        .route("/api/v1/panels/:panel/symbol", post(change_symbol))
        .route("/api/v1/tickers", put(set_tickers))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Reads
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        state_version: state.board.version(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

async fn snapshot(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.board.snapshot())
}

#[derive(Serialize)]
struct SymbolEntry {
    symbol: Symbol,
    display_name: String,
}

async fn symbols(State(state): State<ApiState>) -> impl IntoResponse {
    let entries: Vec<SymbolEntry> = state
        .symbols
        .iter()
        .map(|s| SymbolEntry {
            symbol: s.clone(),
            display_name: s.display_name(),
        })
        .collect();
    Json(entries)
}

// =============================================================================
// Commands
// =============================================================================

#[derive(Serialize)]
struct Accepted {
    accepted: String,
}

fn bad_request(message: String) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
}

fn parse_panel(raw: &str) -> Result<Panel, ApiError> {
    raw.parse::<Panel>().map_err(bad_request)
}

fn resolve_symbol(state: &ApiState, raw: &str) -> Result<Symbol, ApiError> {
    state
        .symbols
        .resolve(raw)
        .ok_or_else(|| bad_request(format!("symbol '{raw}' is not available")))
}

async fn enqueue(
    state: &ApiState,
    command: DashboardCommand,
) -> Result<(StatusCode, Json<Accepted>), ApiError> {
    let label = format!("{command:?}");
    if state.commands.send(command).await.is_err() {
        warn!(command = %label, "dashboard is not running");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "dashboard is not running" })),
        ));
    }
    info!(command = %label, "command queued via API");
    Ok((StatusCode::ACCEPTED, Json(Accepted { accepted: label })))
}

async fn show_panel(
    State(state): State<ApiState>,
    Path(panel): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let panel = parse_panel(&panel)?;
    enqueue(&state, DashboardCommand::Show(panel)).await
}

async fn hide_panel(
    State(state): State<ApiState>,
    Path(panel): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let panel = parse_panel(&panel)?;
    enqueue(&state, DashboardCommand::Hide(panel)).await
}

async fn toggle_panel(
    State(state): State<ApiState>,
    Path(panel): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let panel = parse_panel(&panel)?;
    enqueue(&state, DashboardCommand::Toggle(panel)).await
}

#[derive(Deserialize)]
struct SymbolRequest {
    symbol: String,
}

async fn change_symbol(
    State(state): State<ApiState>,
    Path(panel): Path<String>,
    Json(req): Json<SymbolRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let panel = parse_panel(&panel)?;
    let symbol = resolve_symbol(&state, &req.symbol)?;
    enqueue(&state, DashboardCommand::ChangeSymbol(panel, symbol)).await
}

#[derive(Deserialize)]
struct TickersRequest {
    symbols: Vec<String>,
}

async fn set_tickers(
    State(state): State<ApiState>,
    Json(req): Json<TickersRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let symbols = req
        .symbols
        .iter()
        .map(|raw| resolve_symbol(&state, raw))
        .collect::<Result<Vec<_>, _>>()?;
    enqueue(&state, DashboardCommand::SetTickers(symbols)).await
}

// =============================================================================
// Tests
// =============================================================================
