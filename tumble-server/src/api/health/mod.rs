//! Health check

use axum::{routing::get, Json, Router};
use shared::response::{ok, ApiResponse};

use crate::core::ServerState;

#[derive(serde::Serialize)]
pub struct HealthInfo {
    pub status: &'static str,
    pub version: &'static str,
}

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/health", Router::new().route("/", get(health)))
}

/// GET /api/health - liveness probe, no identity required
async fn health() -> Json<ApiResponse<HealthInfo>> {
    ok(HealthInfo {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
