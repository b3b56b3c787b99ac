//! Registration, login, and token verification over the user store.

use serde::{Deserialize, Serialize};

use super::principal::Principal;
use super::session::{SessionManager, SessionToken};
use crate::error::{AppError, AppResult};
use crate::security;
use crate::storage::users::UserPublic;
use crate::storage::SharedStore;
use crate::tprintln;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Issued credential plus the public profile it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct AuthGrant {
    pub user: UserPublic,
    pub token: SessionToken,
}

pub trait AuthProvider: Send + Sync {
    fn register(&self, req: &RegisterRequest) -> AppResult<AuthGrant>;
    fn login(&self, req: &LoginRequest) -> AppResult<AuthGrant>;
    fn verify(&self, token: &str) -> AppResult<Principal>;
}

/// Store-backed provider: Argon2 hashes in the user table, opaque bearer
/// tokens in the session manager.
#[derive(Clone)]
pub struct LocalAuthProvider {
    store: SharedStore,
    sm: SessionManager,
}

impl LocalAuthProvider {
    pub fn new(store: SharedStore, sm: SessionManager) -> Self { Self { store, sm } }

    pub fn sessions(&self) -> &SessionManager { &self.sm }
}

impl AuthProvider for LocalAuthProvider {
    fn register(&self, req: &RegisterRequest) -> AppResult<AuthGrant> {
        let username = req.username.trim();
        let email = req.email.trim();
        if username.is_empty() || email.is_empty() || req.password.is_empty() {
            return Err(AppError::validation("missing_fields", "please provide username, email and password"));
        }
        // Hash exactly once, before the row is created; plaintext never
        // reaches the store.
        let phc = security::hash_password(&req.password)?;
        let user = {
            let store = self.store.0.lock();
            store.create_user(username, email, &phc)?
        };
        let session = self.sm.issue(&user.id);
        tprintln!("auth.register user={} sid={}", user.id, session.session_id);
        Ok(AuthGrant { user: user.public(), token: session.token })
    }

    fn login(&self, req: &LoginRequest) -> AppResult<AuthGrant> {
        let found = {
            let store = self.store.0.lock();
            store.find_user_by_email(&req.email)?
        };
        let Some(user) = found else {
            return Err(AppError::auth("invalid_credentials", "invalid credentials"));
        };
        if !security::verify_password(&user.password_hash, &req.password) {
            return Err(AppError::auth("invalid_credentials", "invalid credentials"));
        }
        let session = self.sm.issue(&user.id);
        tprintln!("auth.login user={} sid={}", user.id, session.session_id);
        Ok(AuthGrant { user: user.public(), token: session.token })
    }

    fn verify(&self, token: &str) -> AppResult<Principal> {
        let Some(user_id) = self.sm.validate(token) else {
            return Err(AppError::auth("invalid_token", "not authorized, token failed"));
        };
        // Re-read the account so role and superuser changes take effect on
        // the next request, not the next login.
        let found = {
            let store = self.store.0.lock();
            store.get_user(&user_id)?
        };
        let Some(user) = found else {
            return Err(AppError::auth("user_not_found", "not authorized, user not found"));
        };
        Ok(Principal::from(&user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::SessionManager;
    use tempfile::tempdir;

    fn provider(root: &std::path::Path) -> LocalAuthProvider {
        let store = SharedStore::new(root).expect("store");
        LocalAuthProvider::new(store, SessionManager::default())
    }

    #[test]
    fn register_login_verify_flow() {
        let tmp = tempdir().expect("tempdir");
        let auth = provider(tmp.path());

        let grant = auth
            .register(&RegisterRequest {
                username: "alice".into(),
                email: "Alice@Example.com".into(),
                password: "s3cr3t!".into(),
            })
            .expect("register");
        assert_eq!(grant.user.email, "alice@example.com");

        let principal = auth.verify(&grant.token).expect("verify");
        assert_eq!(principal.username, "alice");
        assert!(!principal.is_admin());

        let login = auth
            .login(&LoginRequest { email: "alice@example.com".into(), password: "s3cr3t!".into() })
            .expect("login");
        assert_eq!(login.user.id, grant.user.id);
    }

    #[test]
    fn register_requires_all_fields() {
        let tmp = tempdir().expect("tempdir");
        let auth = provider(tmp.path());
        let res = auth.register(&RegisterRequest {
            username: "alice".into(),
            email: String::new(),
            password: "pw".into(),
        });
        assert!(matches!(res, Err(AppError::Validation { .. })));
    }

    #[test]
    fn duplicate_registration_conflicts_once() {
        let tmp = tempdir().expect("tempdir");
        let auth = provider(tmp.path());
        let req = RegisterRequest {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "pw".into(),
        };
        auth.register(&req).expect("first registration succeeds");
        let second = auth.register(&req);
        assert!(matches!(second, Err(AppError::Conflict { .. })));
    }

    #[test]
    fn login_rejects_unknown_email_and_bad_password() {
        let tmp = tempdir().expect("tempdir");
        let auth = provider(tmp.path());
        auth.register(&RegisterRequest {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "right".into(),
        })
        .expect("register");

        let unknown = auth.login(&LoginRequest { email: "ghost@example.com".into(), password: "x".into() });
        assert!(matches!(unknown, Err(AppError::Auth { .. })));

        let wrong = auth.login(&LoginRequest { email: "alice@example.com".into(), password: "wrong".into() });
        assert!(matches!(wrong, Err(AppError::Auth { .. })));
    }

    #[test]
    fn verify_rejects_garbage_token() {
        let tmp = tempdir().expect("tempdir");
        let auth = provider(tmp.path());
        let res = auth.verify("definitely-not-a-token");
        assert!(matches!(res, Err(AppError::Auth { .. })));
    }
}
