//! Central identity and session management for quill.
//! Keep the public surface thin and split implementation across sub-modules.

mod authorizer;
mod principal;
mod provider;
mod session;

pub use authorizer::{require_owner_or_admin, Role};
pub use principal::Principal;
pub use provider::{AuthGrant, AuthProvider, LocalAuthProvider, LoginRequest, RegisterRequest};
pub use session::{Session, SessionManager, SessionToken};
