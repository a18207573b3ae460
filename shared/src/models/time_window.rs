//! Pickup/delivery time windows

use serde::{Deserialize, Serialize};

/// A bookable pickup/delivery window
///
/// Referenced by id from orders; the checkout wizard may also send
/// the human label ("morning"), which the lifecycle service resolves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeWindow {
    pub id: String,
    /// Human label, e.g. "morning"
    pub label: String,
    /// Window start, local hour of day (0-23)
    pub start_hour: u8,
    /// Window end, local hour of day (0-23)
    pub end_hour: u8,
}
