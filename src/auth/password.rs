//! Password hashing with Argon2.

use std::sync::LazyLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};

/// Throwaway hash checked when a login names no known account.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("fueltrackr-unknown-account").ok());

#[derive(Debug, thiserror::Error)]
#[error("failed to hash password: {0}")]
pub struct PasswordError(String);

/// Hash a plaintext password into a PHC string with a fresh random salt.
pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError(e.to_string()))
}

/// Check a plaintext password against a stored PHC string.
///
/// Returns `false` on mismatch and on a stored hash that cannot be parsed.
pub fn verify_password(plaintext: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        tracing::warn!("stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

/// Run one Argon2 verification against [`DUMMY_HASH`]. Always `false`.
pub fn verify_dummy_password(plaintext: &str) -> bool {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(plaintext, hash);
    }
    false
}
