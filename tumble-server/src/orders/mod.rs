//! Order domain
//!
//! - [`status`] - the transition table and its validation functions
//! - [`cancellation`] - the customer cancellation refund policy
//! - [`lifecycle`] - the orchestration service tying the store,
//!   payment processor, and notifications together

pub mod cancellation;
pub mod lifecycle;
pub mod status;

pub use lifecycle::{OrderLifecycle, TransitionRequest};
