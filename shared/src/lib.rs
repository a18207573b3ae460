//! Shared types for the Tumble laundry platform
//!
//! Common types used across crates: the error taxonomy, the unified
//! API response envelope, domain models, and small utilities.

pub mod error;
pub mod models;
pub mod response;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult};
pub use response::ApiResponse;
pub use serde::{Deserialize, Serialize};
