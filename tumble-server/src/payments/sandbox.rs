//! Sandbox payment processor
//!
//! In-memory processor with the same idempotency semantics as the
//! hosted one: a replayed idempotency key returns the original
//! result and causes no second effect. Used for development and
//! tests; single-instance only.

use async_trait::async_trait;
use dashmap::DashMap;
use shared::util::new_id;

use super::{
    AuthorizeRequest, CaptureMethod, CaptureResult, PaymentAuthorization, PaymentProcessor,
    PaymentView, ProcessorError, ProcessorRefund, ProcessorResult,
};

#[derive(Debug, Clone)]
struct IntentRecord {
    intent_id: String,
    client_secret: String,
    charge_id: Option<String>,
    amount_cents: i64,
    amount_captured_cents: i64,
    amount_refunded_cents: i64,
    canceled: bool,
}

#[derive(Default)]
pub struct SandboxProcessor {
    intents: DashMap<String, IntentRecord>,
    /// idempotency key → intent/charge the original call touched
    seen_keys: DashMap<String, String>,
}

impl SandboxProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, intent_id: &str) -> ProcessorResult<IntentRecord> {
        self.intents
            .get(intent_id)
            .map(|r| r.clone())
            .ok_or_else(|| ProcessorError::UnknownReference(intent_id.to_string()))
    }

    fn view_of(record: &IntentRecord) -> PaymentView {
        PaymentView {
            intent_id: record.intent_id.clone(),
            amount_cents: record.amount_cents,
            amount_captured_cents: record.amount_captured_cents,
            amount_refunded_cents: record.amount_refunded_cents,
            canceled: record.canceled,
        }
    }
}

#[async_trait]
impl PaymentProcessor for SandboxProcessor {
    async fn authorize(&self, req: &AuthorizeRequest) -> ProcessorResult<PaymentAuthorization> {
        if req.amount_cents <= 0 {
            return Err(ProcessorError::Declined(
                "amount must be positive".to_string(),
            ));
        }

        // Replay: hand back the intent the original call created
        if let Some(existing) = self.seen_keys.get(&req.idempotency_key) {
            let record = self.get(&existing)?;
            return Ok(PaymentAuthorization {
                intent_id: record.intent_id.clone(),
                client_secret: record.client_secret.clone(),
                charge_id: record.charge_id.clone(),
                amount_cents: record.amount_cents,
            });
        }

        let intent_id = new_id("pi");
        let charge_id = match req.capture_method {
            CaptureMethod::Automatic => Some(new_id("ch")),
            CaptureMethod::Manual => None,
        };
        let record = IntentRecord {
            intent_id: intent_id.clone(),
            client_secret: new_id("pi_secret"),
            charge_id: charge_id.clone(),
            amount_cents: req.amount_cents,
            amount_captured_cents: match req.capture_method {
                CaptureMethod::Automatic => req.amount_cents,
                CaptureMethod::Manual => 0,
            },
            amount_refunded_cents: 0,
            canceled: false,
        };

        let auth = PaymentAuthorization {
            intent_id: intent_id.clone(),
            client_secret: record.client_secret.clone(),
            charge_id,
            amount_cents: record.amount_cents,
        };
        self.intents.insert(intent_id.clone(), record);
        self.seen_keys.insert(req.idempotency_key.clone(), intent_id);
        Ok(auth)
    }

    async fn update_amount(
        &self,
        intent_id: &str,
        amount_cents: i64,
        idempotency_key: &str,
    ) -> ProcessorResult<()> {
        if self.seen_keys.contains_key(idempotency_key) {
            return Ok(());
        }
        let mut record = self
            .intents
            .get_mut(intent_id)
            .ok_or_else(|| ProcessorError::UnknownReference(intent_id.to_string()))?;
        if record.canceled || record.amount_captured_cents > 0 {
            return Err(ProcessorError::Declined(
                "cannot update a settled or canceled intent".to_string(),
            ));
        }
        record.amount_cents = amount_cents;
        drop(record);
        self.seen_keys
            .insert(idempotency_key.to_string(), intent_id.to_string());
        Ok(())
    }

    async fn capture(
        &self,
        intent_id: &str,
        amount_cents: i64,
        idempotency_key: &str,
    ) -> ProcessorResult<CaptureResult> {
        if self.seen_keys.contains_key(idempotency_key) {
            let record = self.get(intent_id)?;
            let charge_id = record
                .charge_id
                .ok_or_else(|| ProcessorError::UnknownReference(intent_id.to_string()))?;
            return Ok(CaptureResult {
                intent_id: record.intent_id,
                charge_id,
                amount_captured_cents: record.amount_captured_cents,
            });
        }

        let mut record = self
            .intents
            .get_mut(intent_id)
            .ok_or_else(|| ProcessorError::UnknownReference(intent_id.to_string()))?;
        if record.canceled {
            return Err(ProcessorError::Declined("intent is canceled".to_string()));
        }
        if record.amount_captured_cents > 0 {
            return Err(ProcessorError::Declined(
                "intent already captured".to_string(),
            ));
        }
        if amount_cents <= 0 || amount_cents > record.amount_cents {
            return Err(ProcessorError::Declined(format!(
                "capture amount {} outside authorized {}",
                amount_cents, record.amount_cents
            )));
        }

        let charge_id = new_id("ch");
        record.charge_id = Some(charge_id.clone());
        record.amount_captured_cents = amount_cents;
        let result = CaptureResult {
            intent_id: record.intent_id.clone(),
            charge_id,
            amount_captured_cents: amount_cents,
        };
        drop(record);
        self.seen_keys
            .insert(idempotency_key.to_string(), intent_id.to_string());
        Ok(result)
    }

    async fn refund(
        &self,
        charge_id: &str,
        amount_cents: i64,
        idempotency_key: &str,
    ) -> ProcessorResult<ProcessorRefund> {
        // Replay returns the original refund reference, no new effect
        if let Some(refund_id) = self.seen_keys.get(idempotency_key) {
            return Ok(ProcessorRefund {
                refund_id: refund_id.clone(),
                amount_cents,
            });
        }

        let mut target = self
            .intents
            .iter_mut()
            .find(|r| r.charge_id.as_deref() == Some(charge_id))
            .ok_or_else(|| ProcessorError::UnknownReference(charge_id.to_string()))?;

        if amount_cents <= 0 {
            return Err(ProcessorError::Declined(
                "refund amount must be positive".to_string(),
            ));
        }
        if target.amount_refunded_cents + amount_cents > target.amount_captured_cents {
            return Err(ProcessorError::Declined(format!(
                "refund exceeds captured amount ({} + {} > {})",
                target.amount_refunded_cents, amount_cents, target.amount_captured_cents
            )));
        }

        target.amount_refunded_cents += amount_cents;
        drop(target);

        let refund_id = new_id("re");
        self.seen_keys
            .insert(idempotency_key.to_string(), refund_id.clone());
        Ok(ProcessorRefund {
            refund_id,
            amount_cents,
        })
    }

    async fn cancel_authorization(
        &self,
        intent_id: &str,
        idempotency_key: &str,
    ) -> ProcessorResult<()> {
        if self.seen_keys.contains_key(idempotency_key) {
            return Ok(());
        }
        let mut record = self
            .intents
            .get_mut(intent_id)
            .ok_or_else(|| ProcessorError::UnknownReference(intent_id.to_string()))?;
        if record.amount_captured_cents > 0 {
            return Err(ProcessorError::Declined(
                "cannot cancel a captured intent".to_string(),
            ));
        }
        record.canceled = true;
        drop(record);
        self.seen_keys
            .insert(idempotency_key.to_string(), intent_id.to_string());
        Ok(())
    }

    async fn retrieve(&self, intent_id: &str) -> ProcessorResult<PaymentView> {
        // Accept either the intent id or a charge id
        if let Some(record) = self.intents.get(intent_id) {
            return Ok(Self::view_of(&record));
        }
        self.intents
            .iter()
            .find(|r| r.charge_id.as_deref() == Some(intent_id))
            .map(|r| Self::view_of(&r))
            .ok_or_else(|| ProcessorError::UnknownReference(intent_id.to_string()))
    }
}
