//! Password hashing and verification
//!
//! Wraps bcrypt so the rest of the crate never handles raw credential
//! material. Hashes are salted by the library; plaintext passwords exist
//! only transiently inside the auth service.

use bcrypt::DEFAULT_COST;
use thiserror::Error;

/// Errors that can occur during password hashing or verification
#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashFailed(String),

    #[error("Failed to verify password: {0}")]
    VerifyFailed(String),
}

/// Hash a plaintext password with bcrypt at the default cost.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    bcrypt::hash(password, DEFAULT_COST).map_err(|e| PasswordError::HashFailed(e.to_string()))
}

/// Verify a plaintext password against a stored bcrypt hash.
///
/// Returns `Ok(false)` on mismatch; `Err` only when the stored hash is
/// malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    bcrypt::verify(password, hash).map_err(|e| PasswordError::VerifyFailed(e.to_string()))
}
