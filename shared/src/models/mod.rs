//! Domain models
//!
//! Plain data records shared between the server and any in-process
//! clients. Business rules (pricing, transition validation, refund
//! accounting) live in `tumble-server`; these types only carry state.

pub mod address;
pub mod anomaly;
pub mod customer;
pub mod laundromat;
pub mod membership;
pub mod notification;
pub mod order;
pub mod refund;
pub mod status_history;
pub mod time_window;

pub use address::Address;
pub use anomaly::{Anomaly, AnomalyKind};
pub use customer::Customer;
pub use laundromat::Laundromat;
pub use membership::{Membership, MembershipStatus};
pub use notification::{NotificationChannel, NotificationRecord};
pub use order::{BagSize, Order, OrderStatus, PaymentStatus, PricingModel, WeightAdjustment};
pub use refund::Refund;
pub use status_history::StatusHistoryRow;
pub use time_window::TimeWindow;
