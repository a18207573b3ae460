//! Payment processor seam
//!
//! All money movement happens at the external processor; this module
//! defines the operations the lifecycle service needs. Amounts are
//! integer minor units (cents). Every mutating call carries a
//! caller-generated idempotency key so that network-level retries
//! have at most one effect - the processor is the final arbiter of
//! duplicate suppression. The core itself never retries.

mod sandbox;

pub use sandbox::SandboxProcessor;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("payment declined: {0}")]
    Declined(String),

    #[error("unknown payment reference: {0}")]
    UnknownReference(String),

    #[error("processor transport error: {0}")]
    Transport(String),
}

impl From<ProcessorError> for shared::AppError {
    fn from(e: ProcessorError) -> Self {
        shared::AppError::Processor(e.to_string())
    }
}

pub type ProcessorResult<T> = Result<T, ProcessorError>;

/// When the processor settles an authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMethod {
    /// Capture immediately at authorization time
    Automatic,
    /// Hold now, capture an explicit amount later
    Manual,
}

#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    pub amount_cents: i64,
    pub capture_method: CaptureMethod,
    /// Processor-side customer reference (we use our customer id)
    pub customer_ref: String,
    pub description: String,
    pub idempotency_key: String,
}

/// Result of an authorization
#[derive(Debug, Clone)]
pub struct PaymentAuthorization {
    pub intent_id: String,
    /// Client-side confirmation reference handed back to the wizard
    pub client_secret: String,
    /// Charge reference, present once funds have settled
    pub charge_id: Option<String>,
    pub amount_cents: i64,
}

#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub intent_id: String,
    pub charge_id: String,
    pub amount_captured_cents: i64,
}

#[derive(Debug, Clone)]
pub struct ProcessorRefund {
    pub refund_id: String,
    pub amount_cents: i64,
}

/// Processor-side view of a payment, for reconciliation
#[derive(Debug, Clone)]
pub struct PaymentView {
    pub intent_id: String,
    pub amount_cents: i64,
    pub amount_captured_cents: i64,
    pub amount_refunded_cents: i64,
    pub canceled: bool,
}

#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Place an authorization; `Automatic` capture settles immediately
    async fn authorize(&self, req: &AuthorizeRequest) -> ProcessorResult<PaymentAuthorization>;

    /// Raise or lower the authorized amount of an uncaptured intent
    async fn update_amount(
        &self,
        intent_id: &str,
        amount_cents: i64,
        idempotency_key: &str,
    ) -> ProcessorResult<()>;

    /// Capture a manual-capture intent for the final amount
    async fn capture(
        &self,
        intent_id: &str,
        amount_cents: i64,
        idempotency_key: &str,
    ) -> ProcessorResult<CaptureResult>;

    /// Refund part or all of a settled charge
    async fn refund(
        &self,
        charge_id: &str,
        amount_cents: i64,
        idempotency_key: &str,
    ) -> ProcessorResult<ProcessorRefund>;

    /// Release an uncaptured authorization (no money ever moved)
    async fn cancel_authorization(
        &self,
        intent_id: &str,
        idempotency_key: &str,
    ) -> ProcessorResult<()>;

    /// Current processor-side state of an intent
    async fn retrieve(&self, intent_id: &str) -> ProcessorResult<PaymentView>;
}

/// Derive a deterministic idempotency key from its identifying parts.
///
/// Hashed so the key stays opaque and fixed-length regardless of
/// what goes into it.
pub fn idempotency_key(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(&hasher.finalize()[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotency_key_is_deterministic() {
        let a = idempotency_key(&["cus_1", "2026-08-05", "per_lb"]);
        let b = idempotency_key(&["cus_1", "2026-08-05", "per_lb"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn idempotency_key_separates_parts() {
        // ["ab", "c"] must not collide with ["a", "bc"]
        assert_ne!(idempotency_key(&["ab", "c"]), idempotency_key(&["a", "bc"]));
    }
}
