use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use parking_lot::RwLock;

use crate::tprintln;

pub type SessionToken = String;

/// Bearer sessions are valid for a fixed 30 days from issuance.
const SESSION_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub token: SessionToken,
    pub user_id: String,
    pub issued_at: Instant,
    pub expires_at: Instant,
}

#[derive(Debug)]
struct SessionEntry {
    session: Session,
}

fn gen_id() -> String {
    // 256-bit random token base64url without padding
    let mut buf = [0u8; 32];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

/// Issues and validates opaque bearer tokens. State lives behind shared
/// locks so the manager can be cloned into every handler; it is constructed
/// once at startup and injected, never reached through a global.
#[derive(Clone)]
pub struct SessionManager {
    pub ttl: Duration,
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    revoked: Arc<RwLock<HashSet<String>>>,
}

impl Default for SessionManager {
    fn default() -> Self { Self::new(SESSION_TTL) }
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            revoked: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub fn issue(&self, user_id: &str) -> Session {
        let now = Instant::now();
        let sid = gen_id();
        let token = gen_id();
        let sess = Session {
            session_id: sid.clone(),
            token: token.clone(),
            user_id: user_id.to_string(),
            issued_at: now,
            expires_at: now + self.ttl,
        };
        {
            let mut m = self.sessions.write();
            m.insert(token.clone(), SessionEntry { session: sess.clone() });
        }
        tprintln!("session.issue user={} sid={} ttl_secs={}", user_id, sid, self.ttl.as_secs());
        sess
    }

    /// Resolve a token to its user id; unknown, revoked, and expired tokens
    /// all resolve to None. Expired entries are dropped on the way out.
    pub fn validate(&self, token: &str) -> Option<String> {
        if self.revoked.read().contains(token) { return None; }
        let now = Instant::now();
        let mut drop_key: Option<String> = None;
        let out = {
            let map = self.sessions.read();
            if let Some(ent) = map.get(token) {
                if ent.session.expires_at > now {
                    Some(ent.session.user_id.clone())
                } else {
                    drop_key = Some(token.to_string());
                    None
                }
            } else { None }
        };
        if let Some(k) = drop_key {
            self.sessions.write().remove(&k);
        }
        out
    }

    /// Drop a session and remember the token as revoked.
    pub fn logout(&self, token: &str) -> bool {
        let mut removed = false;
        if let Some(ent) = self.sessions.write().remove(token) {
            removed = true;
            self.revoked.write().insert(token.to_string());
            tprintln!("session.logout user={} sid={}", ent.session.user_id, ent.session.session_id);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_validate() {
        let sm = SessionManager::default();
        let sess = sm.issue("u1");
        assert_eq!(sm.validate(&sess.token).as_deref(), Some("u1"));
        assert!(sm.validate("bogus-token").is_none());
    }

    #[test]
    fn expired_token_rejected() {
        let sm = SessionManager::new(Duration::from_secs(0));
        let sess = sm.issue("u1");
        assert!(sm.validate(&sess.token).is_none());
    }

    #[test]
    fn logout_revokes() {
        let sm = SessionManager::default();
        let sess = sm.issue("u1");
        assert!(sm.logout(&sess.token));
        assert!(sm.validate(&sess.token).is_none());
        assert!(!sm.logout(&sess.token), "second logout is a no-op");
    }

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let sm = SessionManager::default();
        let a = sm.issue("u1");
        let b = sm.issue("u1");
        assert_ne!(a.token, b.token);
        assert!(a.token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
