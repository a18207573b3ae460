//! Role definitions
//!
//! Roles are a small explicit enumeration with a declared containment
//! relation: `admin` implies every other role. All authorization
//! checks go through [`Role::implies`] - nothing else inspects role
//! strings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Driver,
    LaundromatStaff,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim() {
            "customer" => Some(Role::Customer),
            "driver" => Some(Role::Driver),
            "laundromat_staff" => Some(Role::LaundromatStaff),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Driver => "driver",
            Role::LaundromatStaff => "laundromat_staff",
            Role::Admin => "admin",
        }
    }

    /// Whether holding `self` satisfies a requirement for `required`
    pub fn implies(&self, required: Role) -> bool {
        *self == Role::Admin || *self == required
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
