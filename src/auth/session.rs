//! Session lifecycle
//!
//! Orchestrates issuing, resolving and clearing session cookies. The only
//! observable side effect of the whole subsystem is the Set-Cookie header;
//! resolution is a pure function of the cookie value and the current time.

use chrono::{Duration, Utc};

use crate::auth::token::{SessionClaims, SessionTokenCodec};
use crate::models::{Role, User};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Per-request authentication state derived from the session cookie.
///
/// `Expired` covers every token that is present but fails verification
/// (signature mismatch, malformed structure or past expiry); handlers must
/// treat it exactly like `Anonymous` in user-visible behavior.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// No session cookie present
    Anonymous,
    /// Valid, unexpired token
    Authenticated(SessionClaims),
    /// Token present but failed verification
    Expired,
}

impl SessionState {
    /// Claims when authenticated, `None` otherwise
    pub fn claims(&self) -> Option<&SessionClaims> {
        match self {
            SessionState::Authenticated(claims) => Some(claims),
            _ => None,
        }
    }
}

/// Issues and resolves session cookies
#[derive(Clone)]
pub struct SessionManager {
    codec: SessionTokenCodec,
    ttl: Duration,
    secure_cookies: bool,
}

impl SessionManager {
    /// Create a session manager from the configured secret and lifetime
    pub fn new(secret: &str, ttl_hours: i64, secure_cookies: bool) -> Self {
        Self {
            codec: SessionTokenCodec::new(secret),
            ttl: Duration::hours(ttl_hours),
            secure_cookies,
        }
    }

    /// Session lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a fresh token for the given user, expiring after the
    /// configured lifetime. Overwrites any prior session unconditionally
    /// when the resulting cookie is set.
    pub fn issue(&self, user: &User) -> String {
        self.issue_claims(user.id, user.role)
    }

    /// Issue a token for a bare {id, role} pair
    pub fn issue_claims(&self, user_id: i64, role: Role) -> String {
        let claims = SessionClaims {
            user_id,
            role,
            expires_at: Utc::now() + self.ttl,
        };
        self.codec.encode(&claims)
    }

    /// Resolve the authentication state for a request.
    ///
    /// `cookie_value` is the raw value of the `session` cookie, if present.
    pub fn resolve(&self, cookie_value: Option<&str>) -> SessionState {
        match cookie_value {
            None => SessionState::Anonymous,
            Some(token) => match self.codec.decode(token) {
                Some(claims) => SessionState::Authenticated(claims),
                None => SessionState::Expired,
            },
        }
    }

    /// Build the Set-Cookie value carrying a session token.
    ///
    /// Max-Age matches the token's expiry claim.
    pub fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE,
            token,
            self.ttl.num_seconds()
        );
        if self.secure_cookies {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// Build the Set-Cookie value that clears the session cookie
    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            SESSION_COOKIE
        );
        if self.secure_cookies {
            cookie.push_str("; Secure");
        }
        cookie
    }
}
