//! Order model
//!
//! The central entity of the platform. All monetary fields are
//! integer cents; weights are pounds. Status may only change through
//! the transition table in `tumble-server::orders::status` (or the
//! logged admin bypass) - nothing writes `status` directly.

use serde::{Deserialize, Serialize};

/// Order lifecycle status
///
/// Terminal states: `Completed`, `CanceledByCustomer`, `CanceledByOps`,
/// `NoShow`. `CanceledByOps` has no table edge and is reachable only
/// through the admin bypass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Draft,
    Scheduled,
    EnRoutePickup,
    PickedUp,
    Processing,
    ReadyForDelivery,
    EnRouteDelivery,
    Delivered,
    Completed,
    CanceledByCustomer,
    CanceledByOps,
    NoShow,
    IssueFlagged,
}

impl OrderStatus {
    /// Every status, for exhaustive table checks
    pub const ALL: [OrderStatus; 13] = [
        OrderStatus::Draft,
        OrderStatus::Scheduled,
        OrderStatus::EnRoutePickup,
        OrderStatus::PickedUp,
        OrderStatus::Processing,
        OrderStatus::ReadyForDelivery,
        OrderStatus::EnRouteDelivery,
        OrderStatus::Delivered,
        OrderStatus::Completed,
        OrderStatus::CanceledByCustomer,
        OrderStatus::CanceledByOps,
        OrderStatus::NoShow,
        OrderStatus::IssueFlagged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Scheduled => "scheduled",
            OrderStatus::EnRoutePickup => "en_route_pickup",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::Processing => "processing",
            OrderStatus::ReadyForDelivery => "ready_for_delivery",
            OrderStatus::EnRouteDelivery => "en_route_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::CanceledByCustomer => "canceled_by_customer",
            OrderStatus::CanceledByOps => "canceled_by_ops",
            OrderStatus::NoShow => "no_show",
            OrderStatus::IssueFlagged => "issue_flagged",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed
                | OrderStatus::CanceledByCustomer
                | OrderStatus::CanceledByOps
                | OrderStatus::NoShow
        )
    }

    /// True once a driver has collected the items and they have not
    /// yet been handed back to the customer.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            OrderStatus::PickedUp
                | OrderStatus::Processing
                | OrderStatus::ReadyForDelivery
                | OrderStatus::EnRouteDelivery
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an order is priced
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    PerLb,
    BagSmall,
    BagMedium,
    BagLarge,
}

impl PricingModel {
    /// The bag size for flat-fee models, `None` for per-pound
    pub fn bag_size(&self) -> Option<BagSize> {
        match self {
            PricingModel::PerLb => None,
            PricingModel::BagSmall => Some(BagSize::Small),
            PricingModel::BagMedium => Some(BagSize::Medium),
            PricingModel::BagLarge => Some(BagSize::Large),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PricingModel::PerLb => "per_lb",
            PricingModel::BagSmall => "bag_small",
            PricingModel::BagMedium => "bag_medium",
            PricingModel::BagLarge => "bag_large",
        }
    }
}

/// Flat-fee bag sizes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BagSize {
    Small,
    Medium,
    Large,
}

impl std::fmt::Display for BagSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BagSize::Small => "small",
            BagSize::Medium => "medium",
            BagSize::Large => "large",
        };
        f.write_str(s)
    }
}

/// Payment state, tracked independently of the order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    RequiresPayment,
    Authorized,
    Paid,
    PartiallyRefunded,
    Refunded,
    Failed,
    Canceled,
}

impl PaymentStatus {
    /// Money has settled and may be (further) refunded
    pub fn is_refundable(&self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::PartiallyRefunded)
    }
}

/// Weight-adjustment state for bag orders
///
/// A single tagged value instead of three independent nullable
/// fields; "already adjusted" is one pattern match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WeightAdjustment {
    /// Bag has not been weighed at the facility yet
    #[default]
    NotMeasured,
    /// Weighed, within the bag's limit
    Measured { weight_lb: f64 },
    /// Weighed over the limit; the fee was charged separately
    Overweight {
        weight_lb: f64,
        fee_cents: i64,
        payment_ref: String,
    },
}

impl WeightAdjustment {
    pub fn is_measured(&self) -> bool {
        !matches!(self, WeightAdjustment::NotMeasured)
    }
}

/// An order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub status: OrderStatus,

    // === Pricing ===
    pub pricing_model: PricingModel,
    pub subtotal_cents: i64,
    pub total_cents: i64,
    /// Weight estimated by the customer at checkout (per-lb orders)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_weight_lb: Option<f64>,
    /// Actual weight measured at pickup or at the facility
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measured_weight_lb: Option<f64>,
    /// Rate applied at final pricing (per-lb orders)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_cents_per_lb: Option<i64>,
    pub rush_fee_cents: i64,
    pub add_on_total_cents: i64,
    pub bag_overweight_cents: i64,
    pub weight_adjustment: WeightAdjustment,

    // === Payment ===
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_id: Option<String>,
    /// Cached mirror of the refund ledger sum; the ledger is ground
    /// truth and this field is refreshed on every ledger write.
    pub refund_amount_cents: i64,

    // === Relations ===
    #[serde(skip_serializing_if = "Option::is_none")]
    pub laundromat_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    pub pickup_address_id: String,
    pub delivery_address_id: String,
    pub pickup_window_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_window_id: Option<String>,

    // === Schedule ===
    /// Scheduled pickup instant (ms since epoch)
    pub pickup_at_ms: i64,

    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}
