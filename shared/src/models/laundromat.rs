//! Partner facility model

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Laundromat {
    pub id: String,
    pub name: String,
    /// ZIP codes this facility serves
    pub zip_codes: Vec<String>,
    /// Orders currently assigned and not yet completed; used for
    /// least-busy routing
    pub active_orders: u32,
}
