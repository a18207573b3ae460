//! Admin API module

mod handler;

use axum::{routing::{get, post}, Router};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/admin", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/orders/{id}/refund", post(handler::refund))
        .route("/orders/{id}/status", post(handler::status))
        .route("/orders/{id}/history", get(handler::history))
}
