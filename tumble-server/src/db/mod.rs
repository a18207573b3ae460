//! Persistence layer
//!
//! The relational store is an external collaborator; the lifecycle
//! service only sees the [`Store`] trait. The conditional-update
//! methods (`update_status_checked`, `apply_weight_adjustment`) are
//! the storage-level guards that close check-then-act races: the
//! write only lands when the row is still in the expected state.
//!
//! [`MemoryStore`] is the bundled single-instance implementation,
//! used for development and tests. It is not durable.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use shared::models::{
    Address, Anomaly, Customer, Laundromat, Membership, NotificationRecord, Order, OrderStatus,
    PaymentStatus, Refund, StatusHistoryRow, TimeWindow, WeightAdjustment,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for shared::AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => shared::AppError::NotFound(what),
            other => shared::AppError::Persistence(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Extra order fields persisted together with a status transition
#[derive(Debug, Clone, Default)]
pub struct StatusPatch {
    pub measured_weight_lb: Option<f64>,
    pub driver_id: Option<String>,
}

/// Persistent store for all order-lifecycle state
#[async_trait]
pub trait Store: Send + Sync {
    // ========== Orders ==========

    async fn insert_order(&self, order: &Order) -> StoreResult<()>;

    async fn get_order(&self, id: &str) -> StoreResult<Option<Order>>;

    /// Whole-row update by id
    async fn update_order(&self, order: &Order) -> StoreResult<()>;

    /// Conditional status write: only succeeds while the stored
    /// status still equals `expected`. Returns `false` when another
    /// writer got there first (no mutation happened).
    async fn update_status_checked(
        &self,
        order_id: &str,
        expected: OrderStatus,
        next: OrderStatus,
        patch: StatusPatch,
    ) -> StoreResult<bool>;

    /// Conditional weight-adjustment write: only succeeds while the
    /// order is still `WeightAdjustment::NotMeasured`. Returns
    /// `false` when the order was already adjusted.
    async fn apply_weight_adjustment(
        &self,
        order_id: &str,
        adjustment: WeightAdjustment,
        new_total_cents: Option<i64>,
    ) -> StoreResult<bool>;

    /// Update payment status and the cached refund mirror
    async fn set_payment_state(
        &self,
        order_id: &str,
        status: PaymentStatus,
        refund_amount_cents: i64,
    ) -> StoreResult<()>;

    // ========== Refund ledger (append-only) ==========

    async fn append_refund(&self, refund: &Refund) -> StoreResult<()>;

    /// Sum of all ledger rows for an order - the ground truth for
    /// the cumulative refunded amount
    async fn refunded_total_cents(&self, order_id: &str) -> StoreResult<i64>;

    async fn refunds_for_order(&self, order_id: &str) -> StoreResult<Vec<Refund>>;

    // ========== Audit and side-effect records ==========

    async fn append_status_history(&self, row: &StatusHistoryRow) -> StoreResult<()>;

    async fn status_history(&self, order_id: &str) -> StoreResult<Vec<StatusHistoryRow>>;

    async fn append_notification(&self, record: &NotificationRecord) -> StoreResult<()>;

    async fn append_anomaly(&self, anomaly: &Anomaly) -> StoreResult<()>;

    // ========== Customers and memberships ==========

    async fn find_or_create_customer(
        &self,
        email: &str,
        phone: Option<&str>,
        sms_opt_in: bool,
    ) -> StoreResult<Customer>;

    async fn get_customer(&self, id: &str) -> StoreResult<Option<Customer>>;

    /// The customer's membership row, if any exists
    async fn membership_for_customer(&self, customer_id: &str) -> StoreResult<Option<Membership>>;

    // ========== Addresses ==========

    async fn insert_address(&self, address: &Address) -> StoreResult<()>;

    // ========== Time windows ==========

    async fn time_window_by_id(&self, id: &str) -> StoreResult<Option<TimeWindow>>;

    async fn time_window_by_label(&self, label: &str) -> StoreResult<Option<TimeWindow>>;

    async fn time_window_labels(&self) -> StoreResult<Vec<String>>;

    // ========== Partner facilities ==========

    /// Facilities serving a ZIP code, least busy first
    async fn laundromats_by_zip(&self, zip: &str) -> StoreResult<Vec<Laundromat>>;

    async fn assign_order_to_laundromat(
        &self,
        order_id: &str,
        laundromat_id: &str,
    ) -> StoreResult<()>;
}
