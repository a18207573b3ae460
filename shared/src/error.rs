//! Unified error handling
//!
//! Application error taxonomy and its HTTP mapping:
//!
//! | Variant | HTTP |
//! |---------|------|
//! | Validation | 400 |
//! | Unauthorized | 401 |
//! | Forbidden | 403 |
//! | NotFound | 404 |
//! | InvalidState / InvalidTransition / ExceedsRefundable | 400 |
//! | Processor / Persistence / Internal | 500 |
//!
//! Validation and authorization errors are detected before any
//! mutation and fail closed. Processor errors during the primary
//! money-moving step surface to the caller; the core never retries
//! them itself (idempotency keys make caller retries safe).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::response::ApiResponse;

/// Application error enumeration
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Authentication / Authorization (4xx) ==========
    #[error("Authentication required")]
    Unauthorized,

    #[error("Permission denied: {0}")]
    Forbidden(String),

    // ========== Business logic (4xx) ==========
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Operation attempted against the wrong order state (wrong
    /// pricing model, double weight adjustment, non-refundable
    /// payment status, ...).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Requested status change is not an edge in the transition table.
    #[error("Invalid status transition from {from} to {to}; valid next states: {}", .valid.join(", "))]
    InvalidTransition {
        from: String,
        to: String,
        valid: Vec<String>,
    },

    /// Refund request larger than the remaining refundable balance.
    #[error("Refund exceeds refundable balance; {remaining_cents} cents remaining")]
    ExceedsRefundable { remaining_cents: i64 },

    #[error("Too many requests")]
    RateLimited,

    // ========== System (5xx) ==========
    #[error("Payment processor error: {0}")]
    Processor(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let status = match &self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_)
            | AppError::InvalidState(_)
            | AppError::InvalidTransition { .. }
            | AppError::ExceedsRefundable { .. } => StatusCode::BAD_REQUEST,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Processor(msg) => {
                error!(target: "processor", error = %msg, "Payment processor error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Persistence(msg) => {
                error!(target: "persistence", error = %msg, "Persistence error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ApiResponse::<()>::error(message));
        (status, body).into_response()
    }
}

/// Result type for API operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_message_lists_valid_targets() {
        let err = AppError::InvalidTransition {
            from: "processing".to_string(),
            to: "delivered".to_string(),
            valid: vec!["ready_for_delivery".to_string(), "issue_flagged".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("processing"));
        assert!(msg.contains("ready_for_delivery, issue_flagged"));
    }

    #[test]
    fn exceeds_refundable_reports_remaining() {
        let err = AppError::ExceedsRefundable {
            remaining_cents: 2000,
        };
        assert!(err.to_string().contains("2000"));
    }
}
