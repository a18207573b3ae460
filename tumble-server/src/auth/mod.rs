//! Authentication and authorization
//!
//! Session resolution is external: the fronting gateway authenticates
//! the request and forwards the resolved identity as headers. This
//! module turns those headers into a [`CurrentUser`] and centralizes
//! every role check.

mod middleware;
mod roles;

pub use middleware::require_identity;
pub use roles::Role;

use shared::AppError;

/// The authenticated identity for the current request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub email: Option<String>,
    pub roles: Vec<Role>,
}

impl CurrentUser {
    pub fn has_role(&self, required: Role) -> bool {
        self.roles.iter().any(|r| r.implies(required))
    }

    /// Fail with `Forbidden` unless the user holds (or implies) the
    /// required role
    pub fn require(&self, required: Role) -> Result<(), AppError> {
        if self.has_role(required) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "requires role {}",
                required.as_str()
            )))
        }
    }
}
