//! Refund ledger row
//!
//! Append-only. Rows are never mutated or deleted; the cumulative
//! refunded amount for an order is always derived by summing this
//! table. The order's `refund_amount_cents` is a convenience mirror.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Refund {
    pub id: String,
    pub order_id: String,
    pub amount_cents: i64,
    pub reason: String,
    /// Refund reference returned by the payment processor
    pub processor_ref: String,
    /// Actor who issued the refund
    pub created_by: String,
    pub created_at_ms: i64,
}
