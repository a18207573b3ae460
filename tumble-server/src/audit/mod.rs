//! Audit trail
//!
//! Best-effort append-only records: status-transition history and
//! reconciliation anomalies. The state change (or processor call) is
//! the source of truth; a failed audit write is logged loudly and
//! never fails the operation that produced it.

use std::sync::Arc;

use shared::models::{Anomaly, AnomalyKind, OrderStatus, StatusHistoryRow};
use shared::util::{new_id, now_millis};
use tracing::error;

use crate::db::Store;

pub struct AuditTrail {
    store: Arc<dyn Store>,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Record a status transition. The bypass flag is recorded the
    /// same way as a validated transition.
    pub async fn record_transition(
        &self,
        order_id: &str,
        from: OrderStatus,
        to: OrderStatus,
        actor_id: &str,
        skip_validation: bool,
    ) {
        let row = StatusHistoryRow {
            id: new_id("osh"),
            order_id: order_id.to_string(),
            from_status: from,
            status: to,
            actor_id: actor_id.to_string(),
            skip_validation,
            created_at_ms: now_millis(),
        };
        if let Err(e) = self.store.append_status_history(&row).await {
            error!(order_id, %from, %to, error = %e, "status history write failed");
        }
    }

    /// Record an amount-drift anomaly for manual reconciliation
    pub async fn record_anomaly(
        &self,
        order_id: &str,
        kind: AnomalyKind,
        expected_cents: i64,
        actual_cents: i64,
        detail: impl Into<String>,
    ) {
        let detail = detail.into();
        error!(
            order_id,
            ?kind,
            expected_cents,
            actual_cents,
            detail,
            "reconciliation anomaly detected"
        );
        let anomaly = Anomaly {
            id: new_id("anm"),
            order_id: order_id.to_string(),
            kind,
            expected_cents,
            actual_cents,
            detail,
            created_at_ms: now_millis(),
        };
        if let Err(e) = self.store.append_anomaly(&anomaly).await {
            error!(order_id, error = %e, "anomaly write failed");
        }
    }
}
