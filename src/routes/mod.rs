//! HTTP surface for the escrow ledger.
//!
//! Mutating endpoints verify the caller's Ed25519 signature before the
//! ledger is touched; the query surface is open. The arbiter check itself
//! lives in the ledger; this layer only establishes who is calling.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::{self, AuthError};
use crate::escrow::ledger::{LedgerError, LedgerStats, SharedLedger};
use crate::escrow::rules::Move;

// ============================================================================
// APP STATE
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub ledger: SharedLedger,
}

// ============================================================================
// REQUEST/RESPONSE TYPES
// ============================================================================

/// Request to deposit into the caller's escrow balance.
/// Signed over `ENROLL:{player}:{amount}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollRequest {
    pub player: String,
    pub amount: u128,
    pub public_key: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollResponse {
    pub success: bool,
    pub player: String,
    pub balance: u128,
}

/// Request to return the caller's unplayed deposit.
/// Signed over `REFUND:{player}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub player: String,
    pub public_key: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResponse {
    pub success: bool,
    pub player: String,
    pub refunded: u128,
}

/// Request from the arbiter to resolve one match.
/// Signed over `PLAY:{player_a}:{move_a}:{player_b}:{move_b}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayRequest {
    pub player_a: String,
    pub move_a: Move,
    pub player_b: String,
    pub move_b: Move,
    pub public_key: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayResponse {
    pub success: bool,
    /// `None` on a draw.
    pub winner: Option<String>,
    pub rewarded: u128,
}

/// Request to pay out the caller's accumulated winnings.
/// Signed over `WITHDRAW:{player}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub player: String,
    pub public_key: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawResponse {
    pub success: bool,
    pub player: String,
    pub withdrawn: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub player: String,
    pub balance: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WinningsResponse {
    pub player: String,
    pub winnings: u128,
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    Ledger(LedgerError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

fn ledger_error_kind(err: &LedgerError) -> &'static str {
    match err {
        LedgerError::InsufficientDeposit { .. } => "insufficient_deposit",
        LedgerError::NothingToRefund { .. } => "nothing_to_refund",
        LedgerError::InsufficientStake { .. } => "insufficient_stake",
        LedgerError::Unauthorized { .. } => "unauthorized",
        LedgerError::NothingToWithdraw { .. } => "nothing_to_withdraw",
        LedgerError::TransferFailed(_) => "transfer_failed",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            ApiError::Auth(err) => (
                StatusCode::UNAUTHORIZED,
                "invalid_signature",
                err.to_string(),
            ),
            ApiError::Ledger(err) => {
                let status = match err {
                    LedgerError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                    LedgerError::TransferFailed(_) => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, ledger_error_kind(err), err.to_string())
            }
        };

        warn!(kind, %message, "request rejected");
        let body = Json(serde_json::json!({
            "success": false,
            "kind": kind,
            "error": message,
        }));
        (status, body).into_response()
    }
}

// ============================================================================
// OPERATION HANDLERS
// ============================================================================

/// POST /enroll
pub async fn enroll_handler(
    State(state): State<AppState>,
    Json(req): Json<EnrollRequest>,
) -> Result<Json<EnrollResponse>, ApiError> {
    let message = auth::enroll_message(&req.player, req.amount);
    auth::verify_caller(&req.public_key, &req.player, &message, &req.signature)?;

    let mut ledger = state.ledger.lock();
    ledger.enroll(&req.player, req.amount)?;
    let balance = ledger.balance_of(&req.player);
    Ok(Json(EnrollResponse {
        success: true,
        player: req.player,
        balance,
    }))
}

/// POST /refund
pub async fn refund_handler(
    State(state): State<AppState>,
    Json(req): Json<RefundRequest>,
) -> Result<Json<RefundResponse>, ApiError> {
    let message = auth::refund_message(&req.player);
    auth::verify_caller(&req.public_key, &req.player, &message, &req.signature)?;

    let refunded = state.ledger.lock().refund(&req.player)?;
    Ok(Json(RefundResponse {
        success: true,
        player: req.player,
        refunded,
    }))
}

/// POST /play. The caller's address is derived from the submitted public
/// key; whether that address is the arbiter is the ledger's call.
pub async fn play_handler(
    State(state): State<AppState>,
    Json(req): Json<PlayRequest>,
) -> Result<Json<PlayResponse>, ApiError> {
    let message = auth::play_message(&req.player_a, req.move_a, &req.player_b, req.move_b);
    auth::verify_signature(&req.public_key, message.as_bytes(), &req.signature)?;
    let caller = auth::derive_address(&req.public_key)?;

    let result = state.ledger.lock().play(
        &caller,
        &req.player_a,
        req.move_a,
        &req.player_b,
        req.move_b,
    )?;
    Ok(Json(PlayResponse {
        success: true,
        winner: result.winner,
        rewarded: result.rewarded,
    }))
}

/// POST /withdraw
pub async fn withdraw_handler(
    State(state): State<AppState>,
    Json(req): Json<WithdrawRequest>,
) -> Result<Json<WithdrawResponse>, ApiError> {
    let message = auth::withdraw_message(&req.player);
    auth::verify_caller(&req.public_key, &req.player, &message, &req.signature)?;

    let withdrawn = state.ledger.lock().withdraw(&req.player)?;
    Ok(Json(WithdrawResponse {
        success: true,
        player: req.player,
        withdrawn,
    }))
}

// ============================================================================
// QUERY HANDLERS
// ============================================================================

/// GET /balance/:player
pub async fn balance_handler(
    State(state): State<AppState>,
    Path(player): Path<String>,
) -> Json<BalanceResponse> {
    let balance = state.ledger.lock().balance_of(&player);
    Json(BalanceResponse { player, balance })
}

/// GET /winnings/:player
pub async fn winnings_handler(
    State(state): State<AppState>,
    Path(player): Path<String>,
) -> Json<WinningsResponse> {
    let winnings = state.ledger.lock().winnings_of(&player);
    Json(WinningsResponse { player, winnings })
}

/// GET /stats (full ledger totals snapshot)
pub async fn stats_handler(State(state): State<AppState>) -> Json<LedgerStats> {
    Json(state.ledger.lock().stats())
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (enrolled_players, players_with_winnings) = {
        let ledger = state.ledger.lock();
        let stats = ledger.stats();
        (stats.enrolled_players, stats.players_with_winnings)
    };

    Json(serde_json::json!({
        "status": "healthy",
        "enrolled_players": enrolled_players,
        "players_with_winnings": players_with_winnings,
    }))
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/balance/:player", get(balance_handler))
        .route("/winnings/:player", get(winnings_handler))
        .route("/enroll", post(enroll_handler))
        .route("/refund", post(refund_handler))
        .route("/play", post(play_handler))
        .route("/withdraw", post(withdraw_handler))
        .with_state(state)
}
