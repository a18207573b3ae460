//! HTTP API
//!
//! # Structure
//!
//! - [`health`] - liveness probe
//! - [`orders`] - customer checkout and self-service
//! - [`driver`] - driver route/pickup/delivery transitions
//! - [`laundromat`] - facility weighing, capture, and processing
//! - [`admin`] - refunds and manual status correction
//!
//! Every module contributes a self-nesting router merged in
//! `core::server::build_router`. All responses use the
//! `{ success, data | error }` envelope from `shared::response`.

pub mod admin;
pub mod driver;
pub mod health;
pub mod laundromat;
pub mod orders;

pub use shared::response::ok;
