//! # REST API
//!
//! Builds the axum router that exposes the ledger node's HTTP interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                  | Description                          |
//! |--------|-----------------------|--------------------------------------|
//! | GET    | `/health`             | Liveness probe                       |
//! | GET    | `/status`             | Ledger status summary                |
//! | GET    | `/assets`             | Registered assets                    |
//! | GET    | `/accounts/:address`  | Principal and redeemable balance     |
//! | GET    | `/withdrawals`        | Pending withdrawal queue             |
//! | GET    | `/events`             | Tail of the event log                |
//! | POST   | `/deposit`            | Deposit a whitelisted asset          |
//! | POST   | `/withdraw`           | Redeem claim value                   |
//! | POST   | `/transfer`           | Move principal between accounts      |
//! | POST   | `/settle`             | Run one settlement pass              |
//! | POST   | `/pool/fund`          | Add liquidity to the external source |
//! | POST   | `/governance`         | Execute a governance command         |

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use swell_protocol::assets::AssetId;
use swell_protocol::buffer::{ReservePool, SettlementReport};
use swell_protocol::engine::{EngineError, LiquidityEngine, WithdrawalOutcome};
use swell_protocol::events::EventRecord;
use swell_protocol::governance::{Command, GovernanceError};

use crate::metrics::SharedMetrics;

/// How many event records `GET /events` returns at most.
const EVENT_TAIL_LIMIT: usize = 100;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`. The engine lives behind one
/// `RwLock`, which is exactly the single-writer execution model the
/// protocol core assumes.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The protocol engine.
    pub engine: Arc<RwLock<LiquidityEngine>>,
    /// The external liquidity source settlement passes draw from.
    pub pool: Arc<RwLock<ReservePool>>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
///
/// The returned router is ready to be served on the configured RPC port.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/assets", get(assets_handler))
        .route("/accounts/:address", get(account_handler))
        .route("/withdrawals", get(withdrawals_handler))
        .route("/events", get(events_handler))
        .route("/deposit", post(deposit_handler))
        .route("/withdraw", post(withdraw_handler))
        .route("/transfer", post(transfer_handler))
        .route("/settle", post(settle_handler))
        .route("/pool/fund", post(fund_pool_handler))
        .route("/governance", post(governance_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Whether the ledger is paused.
    pub paused: bool,
    /// The persisted growing ratio, 1e18 scale.
    pub growing_ratio: u128,
    /// Advertised annual rate in basis points.
    pub annual_interest_bps: u32,
    /// Total principal in existence.
    pub total_supply: u128,
    /// Number of pending withdrawal requests.
    pub pending_withdrawals: usize,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /accounts/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    /// The queried account.
    pub address: String,
    /// Raw principal, the ERC20-compatible balance.
    pub principal: u128,
    /// Ratio-adjusted redeemable value, projected to now.
    pub redeemable: u128,
}

/// One entry in the `GET /assets` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssetResponse {
    /// Asset identifier.
    pub asset: String,
    /// Native fractional digits.
    pub decimals: u32,
    /// Whether deposits are currently accepted.
    pub enabled: bool,
    /// Buffer on-hand liquidity, internal units.
    pub on_hand: u128,
}

/// Request payload for `POST /deposit`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DepositRequest {
    /// Depositing account.
    pub account: String,
    /// Asset identifier.
    pub asset: String,
    /// Amount in the asset's native units.
    pub raw_amount: u128,
}

/// Response payload for `POST /deposit`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DepositResponse {
    /// Principal credited.
    pub minted_principal: u128,
}

/// Request payload for `POST /withdraw`.
#[derive(Debug, Serialize, Deserialize)]
pub struct WithdrawRequest {
    /// Redeeming account.
    pub account: String,
    /// Asset to redeem in.
    pub asset: String,
    /// Redeemable value to withdraw, internal 18-digit units.
    pub amount: u128,
}

/// Request payload for `POST /transfer`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Sender.
    pub from: String,
    /// Recipient.
    pub to: String,
    /// Principal to move.
    pub principal: u128,
}

/// Request payload for `POST /pool/fund`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FundPoolRequest {
    /// Asset identifier.
    pub asset: String,
    /// Amount in internal units.
    pub amount: u128,
}

/// Request payload for `POST /governance`.
#[derive(Debug, Serialize, Deserialize)]
pub struct GovernanceRequest {
    /// The calling identity; must be the governance wallet.
    pub caller: String,
    /// The command to execute.
    pub command: Command,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Maps an engine failure to an HTTP status plus a typed error body.
fn engine_error_response(err: EngineError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        EngineError::Governance(GovernanceError::NotWallet { .. })
        | EngineError::Governance(GovernanceError::NotContract { .. }) => StatusCode::FORBIDDEN,
        EngineError::Governance(GovernanceError::Paused) => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the node is alive.
///
/// This is the liveness probe for orchestrators (k8s, systemd, etc.).
/// It intentionally does not inspect ledger state — that belongs in
/// `/status`.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — returns a ledger status summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let engine = state.engine.read().await;
    let resp = StatusResponse {
        version: state.version.clone(),
        paused: engine.is_paused(),
        growing_ratio: engine.growing_ratio(),
        annual_interest_bps: engine.annual_interest_bps(),
        total_supply: engine.total_supply(),
        pending_withdrawals: engine.state().buffer.pending_count(),
        timestamp: Utc::now().to_rfc3339(),
    };
    (StatusCode::OK, Json(resp))
}

/// `GET /assets` — registered assets with buffer liquidity.
async fn assets_handler(State(state): State<AppState>) -> impl IntoResponse {
    let engine = state.engine.read().await;
    let assets: Vec<AssetResponse> = engine
        .state()
        .assets
        .all()
        .into_iter()
        .map(|(asset, info)| AssetResponse {
            on_hand: engine.state().buffer.on_hand(&asset),
            asset: asset.to_string(),
            decimals: info.decimals,
            enabled: info.enabled,
        })
        .collect();
    (StatusCode::OK, Json(assets))
}

/// `GET /accounts/:address` — both balance views for one account.
async fn account_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<AccountResponse>, (StatusCode, Json<ErrorResponse>)> {
    let engine = state.engine.read().await;
    let redeemable = engine
        .get_balance(&address, Utc::now())
        .map_err(engine_error_response)?;
    Ok(Json(AccountResponse {
        principal: engine.balance_of(&address),
        redeemable,
        address,
    }))
}

/// `GET /withdrawals` — the pending queue, front first.
async fn withdrawals_handler(State(state): State<AppState>) -> impl IntoResponse {
    let engine = state.engine.read().await;
    let pending: Vec<_> = engine.state().buffer.pending().cloned().collect();
    (StatusCode::OK, Json(pending))
}

/// `GET /events` — the most recent event records.
async fn events_handler(State(state): State<AppState>) -> impl IntoResponse {
    let engine = state.engine.read().await;
    let events = engine.events();
    let tail: Vec<EventRecord> = events
        .iter()
        .rev()
        .take(EVENT_TAIL_LIMIT)
        .rev()
        .cloned()
        .collect();
    (StatusCode::OK, Json(tail))
}

/// `POST /deposit` — deposit a whitelisted asset.
async fn deposit_handler(
    State(state): State<AppState>,
    Json(req): Json<DepositRequest>,
) -> Result<Json<DepositResponse>, (StatusCode, Json<ErrorResponse>)> {
    let mut engine = state.engine.write().await;
    let minted = engine
        .deposit(
            &req.account,
            &AssetId::new(req.asset),
            req.raw_amount,
            Utc::now(),
        )
        .map_err(engine_error_response)?;
    state.metrics.deposits_total.inc();
    Ok(Json(DepositResponse {
        minted_principal: minted,
    }))
}

/// `POST /withdraw` — redeem claim value, paying immediately or queueing.
async fn withdraw_handler(
    State(state): State<AppState>,
    Json(req): Json<WithdrawRequest>,
) -> Result<Json<WithdrawalOutcome>, (StatusCode, Json<ErrorResponse>)> {
    let mut engine = state.engine.write().await;
    let outcome = engine
        .withdraw(
            &req.account,
            &AssetId::new(req.asset),
            req.amount,
            Utc::now(),
        )
        .map_err(engine_error_response)?;
    state.metrics.withdrawals_total.inc();
    state
        .metrics
        .pending_withdrawals
        .set(engine.state().buffer.pending_count() as i64);
    Ok(Json(outcome))
}

/// `POST /transfer` — move principal between accounts.
async fn transfer_handler(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let mut engine = state.engine.write().await;
    engine
        .transfer(&req.from, &req.to, req.principal, Utc::now())
        .map_err(engine_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /settle` — run one settlement pass against the external pool.
async fn settle_handler(
    State(state): State<AppState>,
) -> Result<Json<SettlementReport>, (StatusCode, Json<ErrorResponse>)> {
    let mut engine = state.engine.write().await;
    let mut pool = state.pool.write().await;
    let report = engine
        .satisfy_withdrawals(&mut *pool, Utc::now())
        .map_err(engine_error_response)?;
    state
        .metrics
        .settlement_payments_total
        .inc_by(report.payments.len() as u64);
    state
        .metrics
        .pending_withdrawals
        .set(engine.state().buffer.pending_count() as i64);
    Ok(Json(report))
}

/// `POST /pool/fund` — add liquidity to the external source.
async fn fund_pool_handler(
    State(state): State<AppState>,
    Json(req): Json<FundPoolRequest>,
) -> StatusCode {
    let mut pool = state.pool.write().await;
    pool.fund(AssetId::new(req.asset), req.amount);
    StatusCode::NO_CONTENT
}

/// `POST /governance` — execute a privileged command.
async fn governance_handler(
    State(state): State<AppState>,
    Json(req): Json<GovernanceRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let mut engine = state.engine.write().await;
    engine
        .execute(&req.caller, req.command, Utc::now())
        .map_err(engine_error_response)?;
    state
        .metrics
        .growing_ratio
        .set(engine.growing_ratio() as f64 / 1e18);
    Ok(StatusCode::NO_CONTENT)
}
