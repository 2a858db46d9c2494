//! Authentication core
//!
//! The session/credential lifecycle:
//! - `password`: argon2id credential hashing and verification
//! - `token`: signed session token codec (HMAC-SHA256, URL-safe)
//! - `session`: cookie issuance and per-request state resolution
//! - `authz`: role/resource authorization decision table
//! - `oauth`: GitHub authorization-code exchange boundary

pub mod authz;
pub mod oauth;
pub mod password;
pub mod session;
pub mod token;

pub use authz::{can_access, landing_route, Resource};
pub use oauth::{GitHubOAuth, OAuthError, OAuthProfile, OAuthProvider};
pub use password::{hash_password, verify_password};
pub use session::{SessionManager, SessionState, SESSION_COOKIE};
pub use token::{SessionClaims, SessionTokenCodec};
