//! In-memory store
//!
//! Single-instance implementation of [`Store`] backed by
//! `parking_lot` locks. Used for development and tests; everything
//! is lost on restart. The conditional updates take the write lock
//! for the whole compare-and-set, which is what gives them their
//! guarantee here.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared::models::{
    Address, Anomaly, Customer, Laundromat, Membership, NotificationRecord, Order, OrderStatus,
    PaymentStatus, Refund, StatusHistoryRow, TimeWindow, WeightAdjustment,
};
use shared::util::{new_id, now_millis};

use super::{StatusPatch, Store, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    orders: HashMap<String, Order>,
    refunds: Vec<Refund>,
    history: Vec<StatusHistoryRow>,
    notifications: Vec<NotificationRecord>,
    anomalies: Vec<Anomaly>,
    customers: HashMap<String, Customer>,
    memberships: Vec<Membership>,
    addresses: HashMap<String, Address>,
    time_windows: Vec<TimeWindow>,
    laundromats: HashMap<String, Laundromat>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the standard pickup windows seeded
    pub fn with_default_windows() -> Self {
        let store = Self::new();
        {
            let mut t = store.tables.write();
            for (label, start, end) in [("morning", 8, 11), ("afternoon", 12, 15), ("evening", 17, 20)]
            {
                t.time_windows.push(TimeWindow {
                    id: new_id("tw"),
                    label: label.to_string(),
                    start_hour: start,
                    end_hour: end,
                });
            }
        }
        store
    }

    // ========== Seeding helpers (dev/test fixtures) ==========

    pub fn insert_membership(&self, membership: Membership) {
        self.tables.write().memberships.push(membership);
    }

    pub fn insert_laundromat(&self, laundromat: Laundromat) {
        self.tables
            .write()
            .laundromats
            .insert(laundromat.id.clone(), laundromat);
    }

    pub fn insert_time_window(&self, window: TimeWindow) {
        self.tables.write().time_windows.push(window);
    }

    // ========== Inspection helpers (tests) ==========

    pub fn notifications(&self) -> Vec<NotificationRecord> {
        self.tables.read().notifications.clone()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.tables.read().orders.values().cloned().collect()
    }

    pub fn anomalies(&self) -> Vec<Anomaly> {
        self.tables.read().anomalies.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let mut t = self.tables.write();
        if t.orders.contains_key(&order.id) {
            return Err(StoreError::Conflict(format!("order {}", order.id)));
        }
        t.orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn get_order(&self, id: &str) -> StoreResult<Option<Order>> {
        Ok(self.tables.read().orders.get(id).cloned())
    }

    async fn update_order(&self, order: &Order) -> StoreResult<()> {
        let mut t = self.tables.write();
        match t.orders.get_mut(&order.id) {
            Some(existing) => {
                let mut updated = order.clone();
                updated.updated_at_ms = now_millis();
                *existing = updated;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("order {}", order.id))),
        }
    }

    async fn update_status_checked(
        &self,
        order_id: &str,
        expected: OrderStatus,
        next: OrderStatus,
        patch: StatusPatch,
    ) -> StoreResult<bool> {
        let mut t = self.tables.write();
        let order = t
            .orders
            .get_mut(order_id)
            .ok_or_else(|| StoreError::NotFound(format!("order {}", order_id)))?;

        if order.status != expected {
            return Ok(false);
        }

        order.status = next;
        if let Some(weight) = patch.measured_weight_lb {
            order.measured_weight_lb = Some(weight);
        }
        if let Some(driver) = patch.driver_id {
            order.driver_id = Some(driver);
        }
        order.updated_at_ms = now_millis();
        Ok(true)
    }

    async fn apply_weight_adjustment(
        &self,
        order_id: &str,
        adjustment: WeightAdjustment,
        new_total_cents: Option<i64>,
    ) -> StoreResult<bool> {
        let mut t = self.tables.write();
        let order = t
            .orders
            .get_mut(order_id)
            .ok_or_else(|| StoreError::NotFound(format!("order {}", order_id)))?;

        if order.weight_adjustment.is_measured() {
            return Ok(false);
        }

        match &adjustment {
            WeightAdjustment::NotMeasured => {
                return Err(StoreError::Conflict(
                    "cannot reset a weight adjustment".to_string(),
                ));
            }
            WeightAdjustment::Measured { weight_lb } => {
                order.measured_weight_lb = Some(*weight_lb);
            }
            WeightAdjustment::Overweight {
                weight_lb,
                fee_cents,
                ..
            } => {
                order.measured_weight_lb = Some(*weight_lb);
                order.bag_overweight_cents = *fee_cents;
            }
        }
        order.weight_adjustment = adjustment;
        if let Some(total) = new_total_cents {
            order.total_cents = total;
        }
        order.updated_at_ms = now_millis();
        Ok(true)
    }

    async fn set_payment_state(
        &self,
        order_id: &str,
        status: PaymentStatus,
        refund_amount_cents: i64,
    ) -> StoreResult<()> {
        let mut t = self.tables.write();
        let order = t
            .orders
            .get_mut(order_id)
            .ok_or_else(|| StoreError::NotFound(format!("order {}", order_id)))?;
        order.payment_status = status;
        order.refund_amount_cents = refund_amount_cents;
        order.updated_at_ms = now_millis();
        Ok(())
    }

    async fn append_refund(&self, refund: &Refund) -> StoreResult<()> {
        self.tables.write().refunds.push(refund.clone());
        Ok(())
    }

    async fn refunded_total_cents(&self, order_id: &str) -> StoreResult<i64> {
        Ok(self
            .tables
            .read()
            .refunds
            .iter()
            .filter(|r| r.order_id == order_id)
            .map(|r| r.amount_cents)
            .sum())
    }

    async fn refunds_for_order(&self, order_id: &str) -> StoreResult<Vec<Refund>> {
        Ok(self
            .tables
            .read()
            .refunds
            .iter()
            .filter(|r| r.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn append_status_history(&self, row: &StatusHistoryRow) -> StoreResult<()> {
        self.tables.write().history.push(row.clone());
        Ok(())
    }

    async fn status_history(&self, order_id: &str) -> StoreResult<Vec<StatusHistoryRow>> {
        Ok(self
            .tables
            .read()
            .history
            .iter()
            .filter(|h| h.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn append_notification(&self, record: &NotificationRecord) -> StoreResult<()> {
        self.tables.write().notifications.push(record.clone());
        Ok(())
    }

    async fn append_anomaly(&self, anomaly: &Anomaly) -> StoreResult<()> {
        self.tables.write().anomalies.push(anomaly.clone());
        Ok(())
    }

    async fn find_or_create_customer(
        &self,
        email: &str,
        phone: Option<&str>,
        sms_opt_in: bool,
    ) -> StoreResult<Customer> {
        let normalized = email.trim().to_ascii_lowercase();
        let mut t = self.tables.write();

        if let Some(existing) = t
            .customers
            .values()
            .find(|c| c.email == normalized)
            .cloned()
        {
            return Ok(existing);
        }

        let customer = Customer {
            id: new_id("cus"),
            email: normalized,
            phone: phone.map(str::to_string),
            sms_opt_in,
            created_at_ms: now_millis(),
        };
        t.customers.insert(customer.id.clone(), customer.clone());
        Ok(customer)
    }

    async fn get_customer(&self, id: &str) -> StoreResult<Option<Customer>> {
        Ok(self.tables.read().customers.get(id).cloned())
    }

    async fn membership_for_customer(&self, customer_id: &str) -> StoreResult<Option<Membership>> {
        Ok(self
            .tables
            .read()
            .memberships
            .iter()
            .find(|m| m.customer_id == customer_id)
            .cloned())
    }

    async fn insert_address(&self, address: &Address) -> StoreResult<()> {
        self.tables
            .write()
            .addresses
            .insert(address.id.clone(), address.clone());
        Ok(())
    }

    async fn time_window_by_id(&self, id: &str) -> StoreResult<Option<TimeWindow>> {
        Ok(self
            .tables
            .read()
            .time_windows
            .iter()
            .find(|w| w.id == id)
            .cloned())
    }

    async fn time_window_by_label(&self, label: &str) -> StoreResult<Option<TimeWindow>> {
        let normalized = label.trim().to_ascii_lowercase();
        Ok(self
            .tables
            .read()
            .time_windows
            .iter()
            .find(|w| w.label == normalized)
            .cloned())
    }

    async fn time_window_labels(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .tables
            .read()
            .time_windows
            .iter()
            .map(|w| w.label.clone())
            .collect())
    }

    async fn laundromats_by_zip(&self, zip: &str) -> StoreResult<Vec<Laundromat>> {
        let mut matches: Vec<Laundromat> = self
            .tables
            .read()
            .laundromats
            .values()
            .filter(|l| l.zip_codes.iter().any(|z| z == zip))
            .cloned()
            .collect();
        matches.sort_by_key(|l| l.active_orders);
        Ok(matches)
    }

    async fn assign_order_to_laundromat(
        &self,
        order_id: &str,
        laundromat_id: &str,
    ) -> StoreResult<()> {
        let mut t = self.tables.write();
        if !t.laundromats.contains_key(laundromat_id) {
            return Err(StoreError::NotFound(format!(
                "laundromat {}",
                laundromat_id
            )));
        }
        let order = t
            .orders
            .get_mut(order_id)
            .ok_or_else(|| StoreError::NotFound(format!("order {}", order_id)))?;
        order.laundromat_id = Some(laundromat_id.to_string());
        order.updated_at_ms = now_millis();
        if let Some(laundromat) = t.laundromats.get_mut(laundromat_id) {
            laundromat.active_orders += 1;
        }
        Ok(())
    }
}
