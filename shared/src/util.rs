//! Small shared utilities

/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a prefixed opaque resource id, e.g. `ord_9f2c...`.
///
/// UUIDv4 in simple (dashless) form; the prefix makes ids
/// self-describing in logs and support tickets.
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}
