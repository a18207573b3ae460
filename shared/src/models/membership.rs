//! Membership model
//!
//! Governs member per-pound rates and access to bag pricing.
//! Created on subscription checkout, extended on recurring payment,
//! canceled on subscription deletion - all driven by billing webhooks
//! outside this core.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Active,
    PastDue,
    Canceled,
    Trialing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Membership {
    pub id: String,
    pub customer_id: String,
    pub status: MembershipStatus,
    pub started_at_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at_ms: Option<i64>,
}

impl Membership {
    /// Whether this membership currently grants member benefits
    pub fn is_entitled(&self) -> bool {
        matches!(
            self.status,
            MembershipStatus::Active | MembershipStatus::Trialing
        )
    }
}
