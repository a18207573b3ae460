//! Facility staff API module

mod handler;

use axum::{routing::post, Router};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/laundromat", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/orders/{id}/weight", post(handler::weight))
        .route("/orders/{id}/capture", post(handler::capture))
        .route("/orders/{id}/status", post(handler::status))
        .route("/orders/{id}/message", post(handler::message))
}
