//! Role model and ownership checks.
//! Roles are a small closed enumeration; elevated access is the admin role
//! or the per-account superuser flag, checked explicitly at each mutation.

use serde::{Deserialize, Serialize};

use super::principal::Principal;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Parse a stored role string; unknown values degrade to the ordinary
    /// user role rather than failing a whole table read.
    pub fn parse(s: &str) -> Role {
        match s {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

impl Default for Role {
    fn default() -> Self { Role::User }
}

/// Gate a mutation on a resource owned by `owner_id`: the owner passes, as
/// does any admin or superuser. Everyone else is rejected with `Forbidden`.
pub fn require_owner_or_admin(actor: &Principal, owner_id: &str) -> AppResult<()> {
    if actor.user_id == owner_id || actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden("not_owner", "not authorized to modify this resource"))
    }
}
