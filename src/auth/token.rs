//! Session token codec
//!
//! Encodes and verifies the signed session token carried in the `session`
//! cookie. A token is `base64url(claims json) + "." + base64url(signature)`
//! where the signature is HMAC-SHA256 over the encoded claims, keyed by the
//! server-held session secret. The expiry claim is an absolute UTC unix
//! timestamp so verification does not depend on when the token was minted.
//!
//! Decoding never returns an error: signature mismatch, malformed structure
//! and past expiry all collapse to `None` so callers cannot build an oracle
//! out of the failure mode.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::models::Role;

type HmacSha256 = Hmac<Sha256>;

/// The authenticated identity carried by a session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User identifier
    pub user_id: i64,
    /// Role at the time the token was issued
    pub role: Role,
    /// Absolute expiry timestamp
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl SessionClaims {
    /// Check whether the expiry claim is in the past
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Signs and verifies session tokens with a server-held secret
#[derive(Clone)]
pub struct SessionTokenCodec {
    key: Vec<u8>,
}

impl SessionTokenCodec {
    /// Create a codec from the configured session secret
    pub fn new(secret: &str) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
        }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length
        HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size")
    }

    /// Encode claims into a signed, URL-safe token string.
    ///
    /// Deterministic: the same claims and secret always produce the same token.
    pub fn encode(&self, claims: &SessionClaims) -> String {
        // Struct field order makes the JSON serialization stable
        let payload = serde_json::to_vec(claims).unwrap_or_default();
        let payload_b64 = URL_SAFE_NO_PAD.encode(&payload);

        let mut mac = self.mac();
        mac.update(payload_b64.as_bytes());
        let signature = mac.finalize().into_bytes();

        format!("{}.{}", payload_b64, URL_SAFE_NO_PAD.encode(signature))
    }

    /// Decode and verify a token string.
    ///
    /// Returns the claims only when the structure parses, the signature
    /// validates (constant-time) and the expiry is in the future. All
    /// failure modes are indistinguishable.
    pub fn decode(&self, token: &str) -> Option<SessionClaims> {
        let (payload_b64, signature_b64) = token.split_once('.')?;

        let signature = URL_SAFE_NO_PAD.decode(signature_b64).ok()?;

        let mut mac = self.mac();
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
        let claims: SessionClaims = serde_json::from_slice(&payload).ok()?;

        if claims.is_expired() {
            return None;
        }

        Some(claims)
    }
}
