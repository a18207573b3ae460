//! Identity middleware
//!
//! The gateway in front of this service owns sessions; it forwards
//! the resolved identity on every request:
//!
//! | Header | Content |
//! |--------|---------|
//! | `x-user-id` | opaque user id (required) |
//! | `x-user-email` | email, if known |
//! | `x-user-roles` | comma-separated role names |
//!
//! A request without an identity on a protected path gets 401.
//! Requests with no parseable role default to `customer`.

use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
};

use super::{CurrentUser, Role};
use shared::AppError;

/// Paths served without an identity
fn is_public(path: &str) -> bool {
    path == "/api/health"
}

pub async fn require_identity(mut req: Request, next: Next) -> Result<Response, AppError> {
    // CORS preflight passes through
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let path = req.uri().path();
    if !path.starts_with("/api/") || is_public(path) {
        return Ok(next.run(req).await);
    }

    let user = {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let Some(id) = header("x-user-id").filter(|v| !v.is_empty()) else {
            return Err(AppError::Unauthorized);
        };

        let mut roles: Vec<Role> = header("x-user-roles")
            .unwrap_or_default()
            .split(',')
            .filter_map(Role::parse)
            .collect();
        if roles.is_empty() {
            roles.push(Role::Customer);
        }

        CurrentUser {
            id,
            email: header("x-user-email"),
            roles,
        }
    };
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
