//! Customer order handlers

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use chrono::NaiveDate;
use shared::models::{Order, PricingModel};
use shared::response::{ok, ApiResponse};
use shared::{AppError, AppResult};
use validator::Validate;

use crate::auth::{CurrentUser, Role};
use crate::core::ServerState;
use crate::db::Store;
use crate::orders::lifecycle::{
    AddressInput, CancellationOutcome, CreatedOrder, NewOrderInput,
};

#[derive(serde::Deserialize, Validate)]
pub struct AddressPayload {
    #[validate(length(min = 1, message = "street address is required"))]
    pub line1: String,
    pub line2: Option<String>,
    #[validate(length(min = 1, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 2, message = "state is required"))]
    pub state: String,
    #[validate(length(min = 3, message = "ZIP code is required"))]
    pub zip: String,
}

impl From<AddressPayload> for AddressInput {
    fn from(p: AddressPayload) -> Self {
        AddressInput {
            line1: p.line1,
            line2: p.line2,
            city: p.city,
            state: p.state,
            zip: p.zip,
        }
    }
}

#[derive(serde::Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub sms_opt_in: bool,
    pub pricing_model: PricingModel,
    pub estimated_weight_lb: Option<f64>,
    pub pickup_date: NaiveDate,
    /// Time window id or label ("morning", ...)
    pub time_window: String,
    #[validate(nested)]
    pub pickup_address: AddressPayload,
    #[validate(nested)]
    pub delivery_address: Option<AddressPayload>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub rush_fee_cents: i64,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub add_on_total_cents: i64,
}

/// POST /api/orders - checkout: price, persist, authorize payment
pub async fn create(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<CreatedOrder>>> {
    // Order creation is the one public write endpoint worth
    // throttling per client
    let decision = state.limiter.check(&current_user.id);
    if !decision.allowed {
        return Err(AppError::RateLimited);
    }

    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let input = NewOrderInput {
        email: payload.email,
        phone: payload.phone,
        sms_opt_in: payload.sms_opt_in,
        pricing_model: payload.pricing_model,
        estimated_weight_lb: payload.estimated_weight_lb,
        pickup_date: payload.pickup_date,
        time_window: payload.time_window,
        pickup_address: payload.pickup_address.into(),
        delivery_address: payload.delivery_address.map(Into::into),
        rush_fee_cents: payload.rush_fee_cents,
        add_on_total_cents: payload.add_on_total_cents,
    };

    let created = state.lifecycle.create_order(input).await?;
    Ok(ok(created))
}

/// GET /api/orders/:id - order detail for the owner or staff
pub async fn get_by_id(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.lifecycle.get_order(&id).await?;
    require_owner_or_staff(&state, &current_user, &order).await?;
    Ok(ok(order))
}

/// POST /api/orders/:id/cancel - customer self-service cancellation
pub async fn cancel(
    State(state): State<ServerState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<CancellationOutcome>>> {
    let order = state.lifecycle.get_order(&id).await?;
    require_owner_or_staff(&state, &current_user, &order).await?;

    let outcome = state.lifecycle.cancel(&id, &current_user.id).await?;
    Ok(ok(outcome))
}

/// Customers may only touch their own orders; any operational role
/// may view/cancel on a customer's behalf.
async fn require_owner_or_staff(
    state: &ServerState,
    user: &CurrentUser,
    order: &Order,
) -> AppResult<()> {
    if user.has_role(Role::Admin)
        || user.has_role(Role::Driver)
        || user.has_role(Role::LaundromatStaff)
    {
        return Ok(());
    }

    let owner = state
        .store
        .get_customer(&order.customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {}", order.customer_id)))?;

    match &user.email {
        Some(email) if email.eq_ignore_ascii_case(&owner.email) => Ok(()),
        _ => Err(AppError::Forbidden(
            "order belongs to a different customer".to_string(),
        )),
    }
}
