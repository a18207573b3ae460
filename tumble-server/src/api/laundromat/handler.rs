//! Facility staff handlers
//!
//! Intake weighing (bag orders), final capture (per-pound orders),
//! and processing-stage status updates.

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use shared::models::OrderStatus;
use shared::response::{ok, ApiResponse};
use shared::AppResult;

use crate::auth::{CurrentUser, Role};
use crate::core::ServerState;
use crate::db::Store;
use crate::orders::lifecycle::{CaptureOutcome, TransitionOutcome, WeightAdjusted};
use crate::orders::TransitionRequest;

#[derive(serde::Deserialize)]
pub struct WeightRequest {
    pub actual_weight_lb: f64,
}

#[derive(serde::Deserialize)]
pub struct CaptureRequest {
    pub actual_weight_lb: f64,
    pub add_on_total_cents: Option<i64>,
    pub rush_fee_cents: Option<i64>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusEvent {
    CleaningCompleted,
    DamageReported,
}

#[derive(serde::Deserialize)]
pub struct StatusRequest {
    pub event: StatusEvent,
}

/// POST /api/laundromat/orders/:id/weight - bag intake weighing
///
/// One-shot; charges the overweight fee when the bag is over limit.
pub async fn weight(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(payload): Json<WeightRequest>,
) -> AppResult<Json<ApiResponse<WeightAdjusted>>> {
    current_user.require(Role::LaundromatStaff)?;

    let outcome = state
        .lifecycle
        .adjust_weight(&id, payload.actual_weight_lb, &current_user.id)
        .await?;
    Ok(ok(outcome))
}

/// POST /api/laundromat/orders/:id/capture - per-pound final capture
pub async fn capture(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(payload): Json<CaptureRequest>,
) -> AppResult<Json<ApiResponse<CaptureOutcome>>> {
    current_user.require(Role::LaundromatStaff)?;

    let outcome = state
        .lifecycle
        .capture_final_payment(
            &id,
            payload.actual_weight_lb,
            payload.add_on_total_cents,
            payload.rush_fee_cents,
            &current_user.id,
        )
        .await?;
    Ok(ok(outcome))
}

#[derive(serde::Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

#[derive(serde::Serialize)]
pub struct MessageSent {
    pub order_id: String,
}

/// POST /api/laundromat/orders/:id/message - free-form note to the
/// customer (SMS when possible, email otherwise)
pub async fn message(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(payload): Json<MessageRequest>,
) -> AppResult<Json<ApiResponse<MessageSent>>> {
    current_user.require(Role::LaundromatStaff)?;

    if payload.message.trim().is_empty() {
        return Err(shared::AppError::Validation(
            "message must not be empty".to_string(),
        ));
    }

    let order = state.lifecycle.get_order(&id).await?;
    let customer = state
        .store
        .get_customer(&order.customer_id)
        .await?
        .ok_or_else(|| shared::AppError::NotFound(format!("customer {}", order.customer_id)))?;

    state
        .notifications
        .send_staff_message(&order, &customer, payload.message.trim())
        .await;

    Ok(ok(MessageSent { order_id: id }))
}

/// POST /api/laundromat/orders/:id/status - processing-stage events
pub async fn status(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(payload): Json<StatusRequest>,
) -> AppResult<Json<ApiResponse<TransitionOutcome>>> {
    current_user.require(Role::LaundromatStaff)?;

    let to = match payload.event {
        StatusEvent::CleaningCompleted => OrderStatus::ReadyForDelivery,
        StatusEvent::DamageReported => OrderStatus::IssueFlagged,
    };
    let outcome = state
        .lifecycle
        .transition(&id, TransitionRequest::new(to, &current_user.id))
        .await?;
    Ok(ok(outcome))
}
