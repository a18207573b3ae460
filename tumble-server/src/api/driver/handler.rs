//! Driver handlers
//!
//! Each endpoint is one edge of the state machine, driven from the
//! driver app. The transition itself re-validates against the
//! current status, so these handlers stay thin.

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use shared::models::OrderStatus;
use shared::response::{ok, ApiResponse};
use shared::AppResult;

use crate::auth::{CurrentUser, Role};
use crate::core::ServerState;
use crate::orders::lifecycle::TransitionOutcome;
use crate::orders::TransitionRequest;

#[derive(serde::Deserialize)]
pub struct PickupRequest {
    pub actual_weight_lb: f64,
}

/// POST /api/driver/orders/:id/start-route - scheduled → en_route_pickup
pub async fn start_route(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<TransitionOutcome>>> {
    current_user.require(Role::Driver)?;

    let request = TransitionRequest {
        driver_id: Some(current_user.id.clone()),
        ..TransitionRequest::new(OrderStatus::EnRoutePickup, &current_user.id)
    };
    let outcome = state.lifecycle.transition(&id, request).await?;
    Ok(ok(outcome))
}

/// POST /api/driver/orders/:id/pickup - en_route_pickup → picked_up
///
/// Requires the weight measured at the curb.
pub async fn pickup(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(payload): Json<PickupRequest>,
) -> AppResult<Json<ApiResponse<TransitionOutcome>>> {
    current_user.require(Role::Driver)?;

    let request = TransitionRequest {
        measured_weight_lb: Some(payload.actual_weight_lb),
        ..TransitionRequest::new(OrderStatus::PickedUp, &current_user.id)
    };
    let outcome = state.lifecycle.transition(&id, request).await?;
    Ok(ok(outcome))
}

/// POST /api/driver/orders/:id/dropoff-facility - picked_up → processing
pub async fn dropoff_facility(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<TransitionOutcome>>> {
    current_user.require(Role::Driver)?;

    let outcome = state
        .lifecycle
        .transition(
            &id,
            TransitionRequest::new(OrderStatus::Processing, &current_user.id),
        )
        .await?;
    Ok(ok(outcome))
}

/// POST /api/driver/orders/:id/start-delivery - ready_for_delivery → en_route_delivery
pub async fn start_delivery(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<TransitionOutcome>>> {
    current_user.require(Role::Driver)?;

    let outcome = state
        .lifecycle
        .transition(
            &id,
            TransitionRequest::new(OrderStatus::EnRouteDelivery, &current_user.id),
        )
        .await?;
    Ok(ok(outcome))
}

/// POST /api/driver/orders/:id/dropoff - en_route_delivery → delivered
pub async fn dropoff(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<TransitionOutcome>>> {
    current_user.require(Role::Driver)?;

    let outcome = state
        .lifecycle
        .transition(
            &id,
            TransitionRequest::new(OrderStatus::Delivered, &current_user.id),
        )
        .await?;
    Ok(ok(outcome))
}
