//! Password hashing
//!
//! Argon2id with the crate's default parameters and a random salt per hash.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{
        rand_core::{OsRng, RngCore},
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Argon2,
};

/// Length of passwords issued by a reset
pub const GENERATED_PASSWORD_LEN: usize = 8;

/// Hash a password, returning a PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
        .context("Password hashing failed")?;

    Ok(password_hash.to_string())
}

/// Verify a password against a stored PHC hash.
///
/// Returns an error only when the stored hash cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Random password of `len` distinct lowercase ASCII letters.
///
/// `len` is capped at 26.
pub fn generate_password(len: usize) -> String {
    let mut letters: Vec<u8> = (b'a'..=b'z').collect();
    let len = len.min(letters.len());

    // Partial Fisher-Yates: the first `len` slots end up uniformly sampled.
    for i in 0..len {
        let remaining = (letters.len() - i) as u32;
        let j = i + (OsRng.next_u32() % remaining) as usize;
        letters.swap(i, j);
    }

    letters[..len].iter().map(|&b| b as char).collect()
}
