//! Tumble Server - laundry pickup/delivery order backend
//!
//! # Architecture overview
//!
//! The service is CRUD-over-store glue around three genuinely
//! designed pieces: the pricing engine, the order status state
//! machine, and the lifecycle service that orchestrates them against
//! external collaborators (store, payment processor, notification
//! channels) behind trait seams.
//!
//! # Module structure
//!
//! ```text
//! tumble-server/src/
//! ├── core/          # config, state, HTTP server
//! ├── auth/          # gateway identity, roles
//! ├── api/           # HTTP routes and handlers
//! ├── pricing/       # pure price computation (integer cents)
//! ├── orders/        # state machine, cancellation policy, lifecycle
//! ├── payments/      # processor seam + sandbox implementation
//! ├── notify/        # templated email/SMS, best-effort
//! ├── audit/         # status history + reconciliation anomalies
//! ├── ratelimit/     # sliding-window limiter
//! ├── db/            # store seam + in-memory implementation
//! └── utils/         # logging
//! ```

pub mod api;
pub mod audit;
pub mod auth;
pub mod core;
pub mod db;
pub mod notify;
pub mod orders;
pub mod payments;
pub mod pricing;
pub mod ratelimit;
pub mod utils;

// Re-export public types
pub use auth::{CurrentUser, Role};
pub use core::{build_router, Config, Server, ServerState};
pub use orders::{OrderLifecycle, TransitionRequest};
pub use shared::{AppError, AppResult};

/// Load `.env` and initialize logging. Call once at startup.
pub fn setup_environment() {
    dotenv::dotenv().ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    utils::logger::init_logger(log_dir.as_deref());
}
