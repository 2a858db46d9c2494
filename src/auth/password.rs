//! Password hashing
//!
//! Secure password hashing and verification using Argon2id.
//!
//! # Security
//!
//! - Uses Argon2id variant (hybrid of Argon2i and Argon2d)
//! - Uses secure default parameters from the argon2 crate
//! - Generates random salt for each password hash
//! - Verification collapses every failure (wrong password, malformed or
//!   empty stored hash) to `false`, so callers cannot distinguish error
//!   shapes and accounts created via OAuth with a throwaway hash can
//!   never match a password login

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a password using Argon2id with secure defaults.
///
/// Returns the hash as a PHC string (algorithm, parameters, salt, and hash).
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
        .context("Password hashing failed")?;

    Ok(password_hash.to_string())
}

/// Verify a password against a stored hash.
///
/// Returns `true` only when the password matches. A malformed stored hash
/// is treated as a mismatch rather than an error.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}
