//! Reconciliation anomalies
//!
//! Recorded when observed processor amounts drift from what the
//! order record predicts. Entries are informational: they are logged
//! and surfaced for manual reconciliation, never auto-corrected.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Captured amount differs from the original authorization
    CaptureDrift,
    /// Ledger refund total differs from the processor's own total
    RefundDrift,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Anomaly {
    pub id: String,
    pub order_id: String,
    pub kind: AnomalyKind,
    pub expected_cents: i64,
    pub actual_cents: i64,
    pub detail: String,
    pub created_at_ms: i64,
}
