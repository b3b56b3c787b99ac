use serde::{Deserialize, Serialize};

use super::authorizer::Role;
use crate::storage::users::User;

/// Resolved identity of an authenticated caller, rebuilt from the user row
/// on every verification so role changes apply without re-login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub superuser: bool,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin || self.superuser
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            superuser: user.superuser,
        }
    }
}
