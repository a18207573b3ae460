//! Admin handlers
//!
//! Refunds against the ledger and manual status correction. The
//! `skip_validation` flag on the status endpoint is the one designed
//! escape hatch around the transition table; it is audited
//! identically to validated transitions.

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use shared::models::{OrderStatus, StatusHistoryRow};
use shared::response::{ok, ApiResponse};
use shared::AppResult;

use crate::auth::{CurrentUser, Role};
use crate::core::ServerState;
use crate::db::Store;
use crate::orders::lifecycle::{RefundOutcome, TransitionOutcome};
use crate::orders::TransitionRequest;

#[derive(serde::Deserialize)]
pub struct RefundRequest {
    pub amount_cents: i64,
    pub reason: String,
}

#[derive(serde::Deserialize)]
pub struct StatusOverrideRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub skip_validation: bool,
    pub actual_weight_lb: Option<f64>,
}

/// POST /api/admin/orders/:id/refund
pub async fn refund(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(payload): Json<RefundRequest>,
) -> AppResult<Json<ApiResponse<RefundOutcome>>> {
    current_user.require(Role::Admin)?;

    let outcome = state
        .lifecycle
        .refund(&id, payload.amount_cents, &payload.reason, &current_user.id)
        .await?;
    Ok(ok(outcome))
}

/// POST /api/admin/orders/:id/status - manual status correction
pub async fn status(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(payload): Json<StatusOverrideRequest>,
) -> AppResult<Json<ApiResponse<TransitionOutcome>>> {
    current_user.require(Role::Admin)?;

    let request = TransitionRequest {
        measured_weight_lb: payload.actual_weight_lb,
        skip_validation: payload.skip_validation,
        ..TransitionRequest::new(payload.status, &current_user.id)
    };
    let outcome = state.lifecycle.transition(&id, request).await?;
    Ok(ok(outcome))
}

/// GET /api/admin/orders/:id/history - transition audit trail
pub async fn history(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<StatusHistoryRow>>>> {
    current_user.require(Role::Admin)?;

    let rows = state.store.status_history(&id).await?;
    Ok(ok(rows))
}
