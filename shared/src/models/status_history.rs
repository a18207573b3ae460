//! Order status audit trail
//!
//! One append-only row per transition, written by the lifecycle
//! service. Best-effort: a failed insert is logged and never fails
//! the transition itself. Never read back into business logic.

use serde::{Deserialize, Serialize};

use super::order::OrderStatus;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusHistoryRow {
    pub id: String,
    pub order_id: String,
    pub from_status: OrderStatus,
    pub status: OrderStatus,
    pub actor_id: String,
    /// True when the admin bypass was used for this transition
    pub skip_validation: bool,
    pub created_at_ms: i64,
}
