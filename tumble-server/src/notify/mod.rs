//! Customer notifications
//!
//! Templated transactional email and SMS. Delivery goes through the
//! [`Notifier`] trait (the hosted providers live behind it); the
//! [`NotificationService`] picks the template, appends the SMS
//! compliance footer, records the outcome, and never lets a delivery
//! failure reach the caller - notifications are strictly
//! log-and-continue.

use std::sync::Arc;

use async_trait::async_trait;
use shared::models::{Customer, NotificationChannel, NotificationRecord, Order};
use shared::util::{new_id, now_millis};
use tracing::{debug, warn};

use crate::db::Store;
use crate::orders::status::{Edge, Trigger};

/// Opt-out compliance text appended to every SMS
pub const SMS_COMPLIANCE_FOOTER: &str = " Reply STOP to opt out.";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Outbound delivery channel (email + SMS providers)
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError>;

    async fn send_sms(&self, to: &str, body: &str) -> Result<(), NotifyError>;
}

/// Notifier that only logs; used for development and tests
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_email(&self, to: &str, subject: &str, _body: &str) -> Result<(), NotifyError> {
        debug!(to, subject, "email (log only)");
        Ok(())
    }

    async fn send_sms(&self, to: &str, body: &str) -> Result<(), NotifyError> {
        debug!(to, body, "sms (log only)");
        Ok(())
    }
}

/// Template copy per transition trigger
fn template_for(trigger: Trigger) -> (&'static str, &'static str, &'static str) {
    // (template name, email subject, message body)
    match trigger {
        Trigger::PaymentConfirmed => (
            "order_confirmed",
            "Your laundry pickup is scheduled",
            "Your order is confirmed. We'll text you when your driver is on the way.",
        ),
        Trigger::DriverDispatched => (
            "driver_dispatched",
            "Your driver is on the way",
            "Your driver is on the way to pick up your laundry.",
        ),
        Trigger::OutForDelivery => (
            "out_for_delivery",
            "Your laundry is out for delivery",
            "Clean laundry is on its way back to you.",
        ),
        Trigger::ItemsDelivered => (
            "order_delivered",
            "Your laundry has been delivered",
            "Your laundry has been delivered. Thanks for using Tumble!",
        ),
        _ => (
            "order_update",
            "Order update",
            "There's an update on your laundry order.",
        ),
    }
}

/// Fans notifications out to channels and records every attempt
pub struct NotificationService {
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn Store>,
}

impl NotificationService {
    pub fn new(notifier: Arc<dyn Notifier>, store: Arc<dyn Store>) -> Self {
        Self { notifier, store }
    }

    /// Fire the notifications attached to a transition edge.
    /// Best-effort: failures are recorded and logged, never returned.
    pub async fn notify_edge(&self, order: &Order, customer: &Customer, edge: &Edge) {
        let (template, subject, body) = template_for(edge.trigger);
        for channel in edge.notify {
            match channel {
                NotificationChannel::Email => {
                    self.email(Some(&order.id), &customer.email, template, subject, body)
                        .await;
                }
                NotificationChannel::Sms => {
                    let Some(phone) = customer.phone.as_deref() else {
                        continue;
                    };
                    if !customer.sms_opt_in {
                        debug!(order_id = %order.id, "skipping sms, customer opted out");
                        continue;
                    }
                    self.sms(Some(&order.id), phone, template, body).await;
                }
            }
        }
    }

    /// Free-form staff message to the customer. Goes out as SMS when
    /// the customer can receive one, email otherwise.
    pub async fn send_staff_message(&self, order: &Order, customer: &Customer, message: &str) {
        match customer.phone.as_deref() {
            Some(phone) if customer.sms_opt_in => {
                self.sms(Some(&order.id), phone, "staff_message", message).await;
            }
            _ => {
                self.email(
                    Some(&order.id),
                    &customer.email,
                    "staff_message",
                    "A note about your laundry order",
                    message,
                )
                .await;
            }
        }
    }

    /// Internal new-order notice to the operations inbox
    pub async fn notify_ops_new_order(&self, order: &Order, ops_email: &str) {
        let body = format!(
            "New order {} ({}) for {} cents",
            order.id,
            order.pricing_model.as_str(),
            order.total_cents
        );
        self.email(Some(&order.id), ops_email, "ops_new_order", "New order", &body)
            .await;
    }

    async fn email(
        &self,
        order_id: Option<&str>,
        to: &str,
        template: &str,
        subject: &str,
        body: &str,
    ) {
        let outcome = self.notifier.send_email(to, subject, body).await;
        self.record(order_id, NotificationChannel::Email, template, to, outcome)
            .await;
    }

    async fn sms(&self, order_id: Option<&str>, to: &str, template: &str, body: &str) {
        let message = format!("{}{}", body, SMS_COMPLIANCE_FOOTER);
        let outcome = self.notifier.send_sms(to, &message).await;
        self.record(order_id, NotificationChannel::Sms, template, to, outcome)
            .await;
    }

    async fn record(
        &self,
        order_id: Option<&str>,
        channel: NotificationChannel,
        template: &str,
        recipient: &str,
        outcome: Result<(), NotifyError>,
    ) {
        if let Err(e) = &outcome {
            warn!(?channel, template, error = %e, "notification delivery failed");
        }
        let record = NotificationRecord {
            id: new_id("ntf"),
            order_id: order_id.map(str::to_string),
            channel,
            template: template.to_string(),
            recipient: recipient.to_string(),
            ok: outcome.is_ok(),
            error: outcome.err().map(|e| e.to_string()),
            created_at_ms: now_millis(),
        };
        if let Err(e) = self.store.append_notification(&record).await {
            warn!(error = %e, "failed to record notification outcome");
        }
    }
}
