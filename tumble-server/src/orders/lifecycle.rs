//! Order lifecycle service
//!
//! Orchestrates the store, payment processor, and notifications for
//! every order mutation: creation, status transitions, bag weight
//! adjustment, per-pound final capture, refunds, and customer
//! cancellation.
//!
//! Propagation policy: validation and authorization checks run
//! before any mutation and fail closed. Processor failures on the
//! primary money-moving call fail the operation. Notification,
//! audit-history, and anomaly writes are best-effort - logged and
//! swallowed, never fatal.

use std::sync::Arc;

use chrono::NaiveDate;
use shared::models::{
    Address, AnomalyKind, Order, OrderStatus, PaymentStatus, PricingModel, Refund,
    WeightAdjustment,
};
use shared::util::{new_id, now_millis};
use shared::{AppError, AppResult};
use tracing::{error, info, warn};

use crate::audit::AuditTrail;
use crate::db::{StatusPatch, Store};
use crate::notify::NotificationService;
use crate::orders::cancellation::{cancellation_quote, CancellationBasis};
use crate::orders::status;
use crate::payments::{
    idempotency_key, AuthorizeRequest, CaptureMethod, PaymentProcessor,
};
use crate::pricing;

/// Captured amount may drift from the hold by this much before we
/// record a reconciliation anomaly
const AMOUNT_DRIFT_TOLERANCE_CENTS: i64 = 100;

/// Actor id recorded for system-driven transitions
const CHECKOUT_ACTOR: &str = "system:checkout";

pub struct AddressInput {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
}

pub struct NewOrderInput {
    pub email: String,
    pub phone: Option<String>,
    pub sms_opt_in: bool,
    pub pricing_model: PricingModel,
    /// Customer's weight estimate; required for per-pound orders
    pub estimated_weight_lb: Option<f64>,
    pub pickup_date: NaiveDate,
    /// Time window id or human label ("morning", ...)
    pub time_window: String,
    pub pickup_address: AddressInput,
    pub delivery_address: Option<AddressInput>,
    pub rush_fee_cents: i64,
    pub add_on_total_cents: i64,
}

#[derive(Debug, serde::Serialize)]
pub struct CreatedOrder {
    pub order_id: String,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub payment_intent_id: String,
    /// Client-side confirmation reference for the checkout wizard
    pub payment_client_secret: String,
}

#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub to: OrderStatus,
    pub actor_id: String,
    pub measured_weight_lb: Option<f64>,
    pub driver_id: Option<String>,
    /// Admin escape hatch for manual correction; logged identically
    pub skip_validation: bool,
}

impl TransitionRequest {
    pub fn new(to: OrderStatus, actor_id: impl Into<String>) -> Self {
        Self {
            to,
            actor_id: actor_id.into(),
            measured_weight_lb: None,
            driver_id: None,
            skip_validation: false,
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct TransitionOutcome {
    pub order_id: String,
    pub from: OrderStatus,
    pub status: OrderStatus,
    pub at_ms: i64,
}

#[derive(Debug, serde::Serialize)]
pub struct WeightAdjusted {
    pub order_id: String,
    pub weight_lb: f64,
    pub overweight: bool,
    pub fee_cents: i64,
    pub total_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_ref: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct CaptureOutcome {
    pub order_id: String,
    pub charge_id: String,
    pub total_cents: i64,
    pub subtotal_cents: i64,
    pub minimum_applied: bool,
    pub savings_cents: i64,
}

#[derive(Debug, serde::Serialize)]
pub struct RefundOutcome {
    pub refund_id: String,
    pub order_id: String,
    pub amount_cents: i64,
    pub remaining_refundable_cents: i64,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, serde::Serialize)]
pub struct CancellationOutcome {
    pub order_id: String,
    pub status: OrderStatus,
    pub basis: CancellationBasis,
    pub refunded_cents: i64,
    pub fee_cents: i64,
}

pub struct OrderLifecycle {
    store: Arc<dyn Store>,
    processor: Arc<dyn PaymentProcessor>,
    notifications: Arc<NotificationService>,
    audit: Arc<AuditTrail>,
    ops_email: String,
}

impl OrderLifecycle {
    pub fn new(
        store: Arc<dyn Store>,
        processor: Arc<dyn PaymentProcessor>,
        notifications: Arc<NotificationService>,
        audit: Arc<AuditTrail>,
        ops_email: impl Into<String>,
    ) -> Self {
        Self {
            store,
            processor,
            notifications,
            audit,
            ops_email: ops_email.into(),
        }
    }

    // ========================================================================
    // Order creation
    // ========================================================================

    pub async fn create_order(&self, input: NewOrderInput) -> AppResult<CreatedOrder> {
        // 1. Validate required fields before touching anything
        validate_new_order(&input)?;

        // 2. Resolve/create the customer by checkout identity
        let customer = self
            .store
            .find_or_create_customer(&input.email, input.phone.as_deref(), input.sms_opt_in)
            .await?;

        // 3. Bag pricing is members-only
        let is_member = self.is_member(&customer.id).await?;
        if input.pricing_model.bag_size().is_some() && !is_member {
            return Err(AppError::Forbidden(
                "bag pricing requires an active membership".to_string(),
            ));
        }

        // 4. Resolve the time window (id or label)
        let window = self.resolve_time_window(&input.time_window).await?;

        // 5. Price the order
        let (subtotal_cents, base_total_cents, rate) = match input.pricing_model.bag_size() {
            Some(bag) => {
                let quote = pricing::bag_total(bag, None)?;
                (quote.base_cents, quote.total_cents, None)
            }
            None => {
                // Checked by validate_new_order
                let weight = input.estimated_weight_lb.unwrap_or_default();
                let quote = pricing::per_pound_quote(weight, is_member)?;
                (
                    quote.subtotal_cents,
                    quote.total_cents,
                    Some(quote.rate_cents_per_lb),
                )
            }
        };
        let total_cents = base_total_cents + input.add_on_total_cents + input.rush_fee_cents;

        // 6. Persist addresses and the draft order
        let pickup_address = self.persist_address(&customer.id, &input.pickup_address).await?;
        let delivery_address = match &input.delivery_address {
            Some(addr) => self.persist_address(&customer.id, addr).await?,
            None => pickup_address.clone(),
        };

        let now = now_millis();
        let pickup_at_ms = pickup_instant_ms(input.pickup_date, window.start_hour)?;
        let mut order = Order {
            id: new_id("ord"),
            customer_id: customer.id.clone(),
            status: OrderStatus::Draft,
            pricing_model: input.pricing_model,
            subtotal_cents,
            total_cents,
            estimated_weight_lb: input.estimated_weight_lb,
            measured_weight_lb: None,
            rate_cents_per_lb: rate,
            rush_fee_cents: input.rush_fee_cents,
            add_on_total_cents: input.add_on_total_cents,
            bag_overweight_cents: 0,
            weight_adjustment: WeightAdjustment::NotMeasured,
            payment_status: PaymentStatus::RequiresPayment,
            payment_intent_id: None,
            charge_id: None,
            refund_amount_cents: 0,
            laundromat_id: None,
            driver_id: None,
            pickup_address_id: pickup_address.id.clone(),
            delivery_address_id: delivery_address.id,
            pickup_window_id: window.id.clone(),
            delivery_window_id: None,
            pickup_at_ms,
            created_at_ms: now,
            updated_at_ms: now,
        };
        self.store.insert_order(&order).await?;

        // 7. Best-effort facility assignment by pickup ZIP
        self.assign_facility(&order.id, &pickup_address.zip).await;

        // 8. Payment: bags settle immediately, per-pound orders hold
        //    the estimate and settle after weighing
        let capture_method = match input.pricing_model.bag_size() {
            Some(_) => CaptureMethod::Automatic,
            None => CaptureMethod::Manual,
        };
        let auth_request = AuthorizeRequest {
            amount_cents: total_cents,
            capture_method,
            customer_ref: customer.id.clone(),
            description: format!("Tumble laundry order {}", order.id),
            idempotency_key: idempotency_key(&[
                &customer.id,
                &input.pickup_date.to_string(),
                input.pricing_model.as_str(),
                &now.to_string(),
            ]),
        };
        let authorization = match self.processor.authorize(&auth_request).await {
            Ok(authorization) => authorization,
            Err(e) => {
                // Not orphaned: the order exists and is explicitly
                // marked payment-failed for follow-up
                warn!(order_id = %order.id, error = %e, "payment authorization failed");
                if let Err(persist_err) = self
                    .store
                    .set_payment_state(&order.id, PaymentStatus::Failed, 0)
                    .await
                {
                    error!(order_id = %order.id, error = %persist_err, "failed to mark payment failure");
                }
                return Err(e.into());
            }
        };

        order.payment_intent_id = Some(authorization.intent_id.clone());
        order.charge_id = authorization.charge_id.clone();
        order.payment_status = match capture_method {
            CaptureMethod::Automatic => PaymentStatus::Paid,
            CaptureMethod::Manual => PaymentStatus::Authorized,
        };
        self.store.update_order(&order).await?;

        // 9. Payment confirmed: draft → scheduled (fires the customer
        //    confirmation email + SMS)
        let outcome = self
            .transition(
                &order.id,
                TransitionRequest::new(OrderStatus::Scheduled, CHECKOUT_ACTOR),
            )
            .await?;

        // 10. Internal new-order notice, best-effort
        self.notifications
            .notify_ops_new_order(&order, &self.ops_email)
            .await;

        info!(order_id = %order.id, total_cents, model = input.pricing_model.as_str(), "order created");
        Ok(CreatedOrder {
            order_id: order.id,
            status: outcome.status,
            total_cents,
            payment_intent_id: authorization.intent_id,
            payment_client_secret: authorization.client_secret,
        })
    }

    // ========================================================================
    // Status transitions
    // ========================================================================

    /// Move an order along the state machine.
    ///
    /// Atomic contract: validate against the current status, then
    /// write conditionally on that same status so two racing
    /// transitions cannot both succeed from one stale read. The
    /// history row and edge notifications are best-effort.
    pub async fn transition(
        &self,
        order_id: &str,
        request: TransitionRequest,
    ) -> AppResult<TransitionOutcome> {
        // 1. Load current status
        let order = self.load_order(order_id).await?;
        let from = order.status;

        // 2. Validate the edge (admins may bypass for manual
        //    correction; the bypass is recorded identically)
        let edge = if request.skip_validation {
            None
        } else {
            match status::edge(from, request.to) {
                Some(edge) => Some(edge),
                None => {
                    return Err(AppError::InvalidTransition {
                        from: from.as_str().to_string(),
                        to: request.to.as_str().to_string(),
                        valid: status::valid_targets(from),
                    });
                }
            }
        };

        // 3. Required data for this edge
        if edge.is_some_and(|e| e.requires_weight) && request.measured_weight_lb.is_none() {
            return Err(AppError::Validation(
                "actual_weight_lb is required for this transition".to_string(),
            ));
        }
        if let Some(weight) = request.measured_weight_lb {
            pricing::validate_weight(weight)?;
        }

        // 4. Conditional write: only lands if the status is still
        //    what we validated against
        let patch = StatusPatch {
            measured_weight_lb: request.measured_weight_lb,
            driver_id: request.driver_id.clone(),
        };
        let applied = self
            .store
            .update_status_checked(order_id, from, request.to, patch)
            .await?;
        if !applied {
            let current = self.load_order(order_id).await?.status;
            return Err(AppError::InvalidTransition {
                from: current.as_str().to_string(),
                to: request.to.as_str().to_string(),
                valid: status::valid_targets(current),
            });
        }

        // 5. Append the audit row (best-effort)
        self.audit
            .record_transition(order_id, from, request.to, &request.actor_id, request.skip_validation)
            .await;

        // 6. Fire the edge's notifications (best-effort)
        if let Some(edge) = edge
            && !edge.notify.is_empty()
        {
            match self.store.get_customer(&order.customer_id).await {
                Ok(Some(customer)) => {
                    self.notifications.notify_edge(&order, &customer, edge).await;
                }
                Ok(None) => {
                    warn!(order_id, customer_id = %order.customer_id, "customer missing for notification");
                }
                Err(e) => warn!(order_id, error = %e, "customer lookup failed for notification"),
            }
        }

        Ok(TransitionOutcome {
            order_id: order_id.to_string(),
            from,
            status: request.to,
            at_ms: now_millis(),
        })
    }

    // ========================================================================
    // Bag weight adjustment
    // ========================================================================

    /// Record the measured weight of a bag order, charging the
    /// overweight fee when the bag exceeds its limit. One-shot: a
    /// second call fails, and the store applies the write
    /// conditionally to close the race window.
    pub async fn adjust_weight(
        &self,
        order_id: &str,
        actual_weight_lb: f64,
        actor_id: &str,
    ) -> AppResult<WeightAdjusted> {
        // 1. Bag orders only - per-pound orders reprice at capture
        let order = self.load_order(order_id).await?;
        let Some(bag) = order.pricing_model.bag_size() else {
            return Err(AppError::InvalidState(
                "weight adjustment applies to bag orders; per-pound orders are repriced at capture"
                    .to_string(),
            ));
        };

        // 2. Double-charge guard
        if order.weight_adjustment.is_measured() {
            return Err(AppError::InvalidState(
                "order weight has already been adjusted".to_string(),
            ));
        }

        // 3. Compute the fee
        let quote = pricing::overweight_fee(bag, actual_weight_lb)?;

        // 4. Within limit: record the measurement only
        if !quote.overweight {
            let applied = self
                .store
                .apply_weight_adjustment(
                    order_id,
                    WeightAdjustment::Measured {
                        weight_lb: actual_weight_lb,
                    },
                    None,
                )
                .await?;
            if !applied {
                return Err(AppError::InvalidState(
                    "order weight has already been adjusted".to_string(),
                ));
            }
            return Ok(WeightAdjusted {
                order_id: order_id.to_string(),
                weight_lb: actual_weight_lb,
                overweight: false,
                fee_cents: 0,
                total_cents: order.total_cents,
                payment_ref: None,
            });
        }

        // 5. Overweight: charge the fee alone, then persist. The key
        //    includes order and weight so staff retries de-duplicate.
        let fee_cents = quote.fee_cents;
        let new_total = order.total_cents + fee_cents;
        let charge = self
            .processor
            .authorize(&AuthorizeRequest {
                amount_cents: fee_cents,
                capture_method: CaptureMethod::Automatic,
                customer_ref: order.customer_id.clone(),
                description: format!(
                    "Overweight fee for order {} ({} lb over)",
                    order_id, quote.overage_lb
                ),
                idempotency_key: idempotency_key(&[
                    order_id,
                    "overweight",
                    &format!("{:.2}", actual_weight_lb),
                ]),
            })
            .await?;
        let payment_ref = charge.charge_id.unwrap_or(charge.intent_id);

        let applied = self
            .store
            .apply_weight_adjustment(
                order_id,
                WeightAdjustment::Overweight {
                    weight_lb: actual_weight_lb,
                    fee_cents,
                    payment_ref: payment_ref.clone(),
                },
                Some(new_total),
            )
            .await?;
        if !applied {
            // A concurrent adjustment won the conditional write after
            // our charge went out; surface for manual reconciliation.
            error!(
                order_id,
                payment_ref, fee_cents, "overweight charge needs manual reconciliation"
            );
            return Err(AppError::InvalidState(
                "order weight has already been adjusted".to_string(),
            ));
        }

        info!(order_id, actor_id, fee_cents, "overweight fee charged");
        Ok(WeightAdjusted {
            order_id: order_id.to_string(),
            weight_lb: actual_weight_lb,
            overweight: true,
            fee_cents,
            total_cents: new_total,
            payment_ref: Some(payment_ref),
        })
    }

    // ========================================================================
    // Per-pound final capture
    // ========================================================================

    /// Reprice a per-pound order with its actual weight and settle
    /// the payment hold for the final amount.
    pub async fn capture_final_payment(
        &self,
        order_id: &str,
        actual_weight_lb: f64,
        add_on_total_cents: Option<i64>,
        rush_fee_cents: Option<i64>,
        actor_id: &str,
    ) -> AppResult<CaptureOutcome> {
        // 1. Per-pound orders only (hard precondition)
        let order = self.load_order(order_id).await?;
        if order.pricing_model != PricingModel::PerLb {
            return Err(AppError::InvalidState(
                "final capture applies to per-pound orders; bag orders settle at checkout"
                    .to_string(),
            ));
        }
        let Some(intent_id) = order.payment_intent_id.clone() else {
            return Err(AppError::InvalidState(
                "order has no payment authorization".to_string(),
            ));
        };
        if order.payment_status != PaymentStatus::Authorized {
            return Err(AppError::InvalidState(format!(
                "payment is not capturable in status {:?}",
                order.payment_status
            )));
        }

        // 2. Requote with the actual weight and live membership
        let is_member = self.is_member(&order.customer_id).await?;
        let quote = pricing::per_pound_quote(actual_weight_lb, is_member)?;
        let add_ons = add_on_total_cents.unwrap_or(order.add_on_total_cents);
        let rush = rush_fee_cents.unwrap_or(order.rush_fee_cents);
        if add_ons < 0 || rush < 0 {
            return Err(AppError::Validation(
                "add-on and rush amounts must be non-negative".to_string(),
            ));
        }
        let final_total = quote.total_cents + add_ons + rush;

        // 3. Raise the hold first when the final amount exceeds it
        let authorized_cents = self.processor.retrieve(&intent_id).await?.amount_cents;
        if final_total > authorized_cents {
            self.processor
                .update_amount(
                    &intent_id,
                    final_total,
                    &idempotency_key(&[order_id, "capture-update", &final_total.to_string()]),
                )
                .await?;
        }

        // 4. Capture the final amount
        let capture = self
            .processor
            .capture(
                &intent_id,
                final_total,
                &idempotency_key(&[order_id, "capture", &final_total.to_string()]),
            )
            .await?;

        // 5. Persist the final pricing
        let mut updated = order.clone();
        updated.measured_weight_lb = Some(actual_weight_lb);
        updated.rate_cents_per_lb = Some(quote.rate_cents_per_lb);
        updated.subtotal_cents = quote.subtotal_cents;
        updated.add_on_total_cents = add_ons;
        updated.rush_fee_cents = rush;
        updated.total_cents = final_total;
        updated.payment_status = PaymentStatus::Paid;
        updated.charge_id = Some(capture.charge_id.clone());
        self.store.update_order(&updated).await?;

        // 6. Large drift between hold and settlement goes to
        //    reconciliation (non-blocking)
        if (capture.amount_captured_cents - authorized_cents).abs() > AMOUNT_DRIFT_TOLERANCE_CENTS {
            self.audit
                .record_anomaly(
                    order_id,
                    AnomalyKind::CaptureDrift,
                    authorized_cents,
                    capture.amount_captured_cents,
                    "captured amount drifted from authorization",
                )
                .await;
        }

        // 7. The capture happens at facility intake; advance
        //    picked_up → processing when the driver marked the pickup
        if order.status == OrderStatus::PickedUp {
            let request = TransitionRequest {
                measured_weight_lb: Some(actual_weight_lb),
                ..TransitionRequest::new(OrderStatus::Processing, actor_id)
            };
            if let Err(e) = self.transition(order_id, request).await {
                warn!(order_id, error = %e, "post-capture transition skipped");
            }
        }

        info!(order_id, final_total, actor_id, "final payment captured");
        Ok(CaptureOutcome {
            order_id: order_id.to_string(),
            charge_id: capture.charge_id,
            total_cents: final_total,
            subtotal_cents: quote.subtotal_cents,
            minimum_applied: quote.minimum_applied,
            savings_cents: quote.savings_cents,
        })
    }

    // ========================================================================
    // Refunds
    // ========================================================================

    /// Issue a partial or full refund against a settled order. The
    /// ledger is recomputed immediately before the processor call;
    /// the processor's idempotency key is the final duplicate guard.
    pub async fn refund(
        &self,
        order_id: &str,
        amount_cents: i64,
        reason: &str,
        actor_id: &str,
    ) -> AppResult<RefundOutcome> {
        // 1. Input checks
        if amount_cents <= 0 {
            return Err(AppError::Validation(
                "refund amount must be positive".to_string(),
            ));
        }
        if reason.trim().is_empty() {
            return Err(AppError::Validation("refund reason is required".to_string()));
        }

        // 2. Refundable payment state with a settled charge
        let order = self.load_order(order_id).await?;
        let Some(charge_id) = order.charge_id.clone() else {
            return Err(AppError::InvalidState(
                "order has no settled charge to refund".to_string(),
            ));
        };
        if !order.payment_status.is_refundable() {
            return Err(AppError::InvalidState(format!(
                "payment is not refundable in status {:?}",
                order.payment_status
            )));
        }

        // 3. The ledger, not the cached mirror, decides what remains
        let already_refunded = self.store.refunded_total_cents(order_id).await?;
        let remaining = order.total_cents - already_refunded;
        if amount_cents > remaining {
            return Err(AppError::ExceedsRefundable {
                remaining_cents: remaining,
            });
        }

        // 4. Move the money
        let processor_refund = self
            .processor
            .refund(
                &charge_id,
                amount_cents,
                &idempotency_key(&[
                    &charge_id,
                    &amount_cents.to_string(),
                    actor_id,
                    &now_millis().to_string(),
                ]),
            )
            .await?;

        // 5. Append the ledger row. The refund already happened; a
        //    failed write here is logged loudly and surfaced, never
        //    rolled back.
        let ledger_row = Refund {
            id: new_id("re"),
            order_id: order_id.to_string(),
            amount_cents,
            reason: reason.trim().to_string(),
            processor_ref: processor_refund.refund_id.clone(),
            created_by: actor_id.to_string(),
            created_at_ms: now_millis(),
        };
        if let Err(e) = self.store.append_refund(&ledger_row).await {
            error!(
                order_id,
                refund_ref = %processor_refund.refund_id,
                amount_cents,
                error = %e,
                "refund issued but ledger write failed; manual reconciliation required"
            );
            return Err(e.into());
        }

        // 6. Refresh the cached mirror and the payment status
        let cumulative = already_refunded + amount_cents;
        let payment_status = if cumulative >= order.total_cents {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        };
        self.store
            .set_payment_state(order_id, payment_status, cumulative)
            .await?;

        // 7. Cross-check against the processor's own total
        //    (best-effort, never blocking, never auto-corrected)
        match self.processor.retrieve(&charge_id).await {
            Ok(view) => {
                if (view.amount_refunded_cents - cumulative).abs() > AMOUNT_DRIFT_TOLERANCE_CENTS {
                    self.audit
                        .record_anomaly(
                            order_id,
                            AnomalyKind::RefundDrift,
                            cumulative,
                            view.amount_refunded_cents,
                            "ledger and processor refund totals disagree",
                        )
                        .await;
                }
            }
            Err(e) => warn!(order_id, error = %e, "refund cross-check unavailable"),
        }

        info!(order_id, amount_cents, actor_id, "refund issued");
        Ok(RefundOutcome {
            refund_id: ledger_row.id,
            order_id: order_id.to_string(),
            amount_cents,
            remaining_refundable_cents: remaining - amount_cents,
            payment_status,
        })
    }

    // ========================================================================
    // Customer cancellation
    // ========================================================================

    /// Customer self-service cancellation. The refund share depends
    /// on timing and progress; an authorization that never captured
    /// is released instead of refunded.
    pub async fn cancel(&self, order_id: &str, actor_id: &str) -> AppResult<CancellationOutcome> {
        let order = self.load_order(order_id).await?;

        if order.status.is_terminal() {
            return Err(AppError::InvalidState(
                "order is already closed".to_string(),
            ));
        }
        if matches!(order.status, OrderStatus::Delivered) {
            return Err(AppError::InvalidState(
                "order has been delivered and can no longer be canceled".to_string(),
            ));
        }

        let now = now_millis();
        let quote = cancellation_quote(order.status, order.pickup_at_ms, now, order.total_cents);

        let refunded_cents = match order.payment_status {
            // Hold only - release it; no money ever moved
            PaymentStatus::Authorized => {
                let Some(intent_id) = order.payment_intent_id.as_deref() else {
                    return Err(AppError::InvalidState(
                        "order has no payment authorization".to_string(),
                    ));
                };
                self.processor
                    .cancel_authorization(
                        intent_id,
                        &idempotency_key(&[order_id, "cancel-auth", &now.to_string()]),
                    )
                    .await?;
                self.store
                    .set_payment_state(order_id, PaymentStatus::Canceled, 0)
                    .await?;
                0
            }
            // Money settled - refund the policy share of what's left
            PaymentStatus::Paid | PaymentStatus::PartiallyRefunded => {
                let Some(charge_id) = order.charge_id.clone() else {
                    return Err(AppError::InvalidState(
                        "order has no settled charge".to_string(),
                    ));
                };
                let already_refunded = self.store.refunded_total_cents(order_id).await?;
                let refundable = quote
                    .refund_cents
                    .min(order.total_cents - already_refunded)
                    .max(0);
                if refundable > 0 {
                    let processor_refund = self
                        .processor
                        .refund(
                            &charge_id,
                            refundable,
                            &idempotency_key(&[
                                &charge_id,
                                "cancellation",
                                &refundable.to_string(),
                                &now.to_string(),
                            ]),
                        )
                        .await?;
                    let ledger_row = Refund {
                        id: new_id("re"),
                        order_id: order_id.to_string(),
                        amount_cents: refundable,
                        reason: format!("customer cancellation ({:?})", quote.basis),
                        processor_ref: processor_refund.refund_id,
                        created_by: actor_id.to_string(),
                        created_at_ms: now,
                    };
                    if let Err(e) = self.store.append_refund(&ledger_row).await {
                        error!(order_id, error = %e, "cancellation refund issued but ledger write failed");
                        return Err(e.into());
                    }
                    let cumulative = already_refunded + refundable;
                    let payment_status = if cumulative >= order.total_cents {
                        PaymentStatus::Refunded
                    } else {
                        PaymentStatus::PartiallyRefunded
                    };
                    self.store
                        .set_payment_state(order_id, payment_status, cumulative)
                        .await?;
                }
                refundable
            }
            // Nothing to unwind
            _ => 0,
        };

        // Scheduled orders cancel through the table edge; anything
        // further along goes through the logged bypass path.
        let skip_validation = order.status != OrderStatus::Scheduled;
        let outcome = self
            .transition(
                order_id,
                TransitionRequest {
                    skip_validation,
                    ..TransitionRequest::new(OrderStatus::CanceledByCustomer, actor_id)
                },
            )
            .await?;

        info!(order_id, refunded_cents, basis = ?quote.basis, "order canceled by customer");
        Ok(CancellationOutcome {
            order_id: order_id.to_string(),
            status: outcome.status,
            basis: quote.basis,
            refunded_cents,
            fee_cents: quote.fee_cents,
        })
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    pub async fn get_order(&self, order_id: &str) -> AppResult<Order> {
        self.load_order(order_id).await
    }

    async fn load_order(&self, order_id: &str) -> AppResult<Order> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {}", order_id)))
    }

    async fn is_member(&self, customer_id: &str) -> AppResult<bool> {
        Ok(self
            .store
            .membership_for_customer(customer_id)
            .await?
            .is_some_and(|m| m.is_entitled()))
    }

    async fn resolve_time_window(
        &self,
        reference: &str,
    ) -> AppResult<shared::models::TimeWindow> {
        if let Some(window) = self.store.time_window_by_id(reference).await? {
            return Ok(window);
        }
        if let Some(window) = self.store.time_window_by_label(reference).await? {
            return Ok(window);
        }
        let labels = self.store.time_window_labels().await?;
        Err(AppError::Validation(format!(
            "unknown time window '{}'; valid windows: {}",
            reference,
            labels.join(", ")
        )))
    }

    async fn persist_address(
        &self,
        customer_id: &str,
        input: &AddressInput,
    ) -> AppResult<Address> {
        let address = Address {
            id: new_id("adr"),
            customer_id: customer_id.to_string(),
            line1: input.line1.clone(),
            line2: input.line2.clone(),
            city: input.city.clone(),
            state: input.state.clone(),
            zip: input.zip.clone(),
        };
        self.store.insert_address(&address).await?;
        Ok(address)
    }

    /// Route the order to the least-busy facility serving the pickup
    /// ZIP. Failure to assign never fails order creation.
    async fn assign_facility(&self, order_id: &str, zip: &str) {
        match self.store.laundromats_by_zip(zip).await {
            Ok(ranked) => match ranked.first() {
                Some(facility) => {
                    if let Err(e) = self
                        .store
                        .assign_order_to_laundromat(order_id, &facility.id)
                        .await
                    {
                        warn!(order_id, zip, error = %e, "facility assignment failed");
                    }
                }
                None => warn!(order_id, zip, "no partner facility serves this ZIP"),
            },
            Err(e) => warn!(order_id, zip, error = %e, "facility lookup failed"),
        }
    }
}

fn validate_new_order(input: &NewOrderInput) -> AppResult<()> {
    if input.email.trim().is_empty() || !input.email.contains('@') {
        return Err(AppError::Validation("a valid email is required".to_string()));
    }
    if input.pickup_address.line1.trim().is_empty() || input.pickup_address.zip.trim().is_empty() {
        return Err(AppError::Validation(
            "pickup address with street and ZIP is required".to_string(),
        ));
    }
    if input.time_window.trim().is_empty() {
        return Err(AppError::Validation("a time window is required".to_string()));
    }
    if input.pricing_model == PricingModel::PerLb && input.estimated_weight_lb.is_none() {
        return Err(AppError::Validation(
            "estimated_weight_lb is required for per-pound orders".to_string(),
        ));
    }
    if input.rush_fee_cents < 0 || input.add_on_total_cents < 0 {
        return Err(AppError::Validation(
            "fees must be non-negative".to_string(),
        ));
    }
    Ok(())
}

/// Scheduled pickup instant: pickup date at the window's opening hour
fn pickup_instant_ms(date: NaiveDate, start_hour: u8) -> AppResult<i64> {
    let at = date
        .and_hms_opt(u32::from(start_hour), 0, 0)
        .ok_or_else(|| AppError::Validation("invalid pickup window hour".to_string()))?;
    Ok(at.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pickup_instant_uses_window_open() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        let ms = pickup_instant_ms(date, 8).unwrap();
        let back = chrono::DateTime::from_timestamp_millis(ms).unwrap();
        assert_eq!(back.to_rfc3339(), "2026-08-05T08:00:00+00:00");
    }

    #[test]
    fn new_order_validation_fails_closed() {
        let valid = || NewOrderInput {
            email: "a@b.com".to_string(),
            phone: None,
            sms_opt_in: false,
            pricing_model: PricingModel::PerLb,
            estimated_weight_lb: Some(20.0),
            pickup_date: NaiveDate::from_ymd_opt(2026, 8, 5).unwrap(),
            time_window: "morning".to_string(),
            pickup_address: AddressInput {
                line1: "1 Main St".to_string(),
                line2: None,
                city: "Atlanta".to_string(),
                state: "GA".to_string(),
                zip: "30301".to_string(),
            },
            delivery_address: None,
            rush_fee_cents: 0,
            add_on_total_cents: 0,
        };

        assert!(validate_new_order(&valid()).is_ok());

        let mut missing_email = valid();
        missing_email.email = "not-an-email".to_string();
        assert!(validate_new_order(&missing_email).is_err());

        let mut no_weight = valid();
        no_weight.estimated_weight_lb = None;
        assert!(validate_new_order(&no_weight).is_err());

        let mut negative_rush = valid();
        negative_rush.rush_fee_cents = -1;
        assert!(validate_new_order(&negative_rush).is_err());
    }
}
