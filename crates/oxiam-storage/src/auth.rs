//! Password hashing helpers (bcrypt).

use anyhow::Result;
use bcrypt::{hash, verify, DEFAULT_COST};

/// Hash a plain-text password for storage.
pub fn hash_password(plain: &str) -> Result<String> {
    Ok(hash(plain, DEFAULT_COST)?)
}

/// Check a plain-text password against a stored hash.
pub fn verify_password(plain: &str, password_hash: &str) -> Result<bool> {
    Ok(verify(plain, password_hash)?)
}
