//! Driver API module

mod handler;

use axum::{routing::post, Router};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/driver", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/orders/{id}/start-route", post(handler::start_route))
        .route("/orders/{id}/pickup", post(handler::pickup))
        .route("/orders/{id}/dropoff-facility", post(handler::dropoff_facility))
        .route("/orders/{id}/start-delivery", post(handler::start_delivery))
        .route("/orders/{id}/dropoff", post(handler::dropoff))
}
