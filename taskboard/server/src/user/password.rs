//! PBKDF2-HMAC-SHA256 password hashing.
//!
//! Hashes are stored as `pbkdf2-sha256$<iterations>$<salt hex>$<hash hex>` so the
//! iteration count can be raised without invalidating existing accounts.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum PasswordHashError {
    #[error("Stored password hash is malformed")]
    Malformed,
    #[error("Password hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Hashes `password` on the blocking thread pool.
pub async fn hash(password: &str, iterations: u32) -> Result<String, PasswordHashError> {
    let password = password.to_string();
    let task = tokio::task::spawn_blocking(move || hash_password(&password, iterations));
    Ok(task.await?)
}

/// Verifies `password` against `stored` on the blocking thread pool.
pub async fn verify(password: &str, stored: &str) -> Result<bool, PasswordHashError> {
    let password = password.to_string();
    let stored = stored.to_string();
    let task = tokio::task::spawn_blocking(move || verify_password(&password, &stored));
    task.await?
}

/// A well-formed hash that no password matches, costing the same as a real one.
///
/// Verified against when the email is unknown so both login failures take as long.
pub fn dummy_hash(iterations: u32) -> String {
    format!(
        "{}${}${}${}",
        SCHEME,
        iterations,
        hex::encode([0u8; SALT_LEN]),
        hex::encode([0u8; HASH_LEN])
    )
}

pub fn hash_password(password: &str, iterations: u32) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let hash = derive(password, &salt, iterations);
    format!(
        "{}${}${}${}",
        SCHEME,
        iterations,
        hex::encode(salt),
        hex::encode(hash)
    )
}

pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordHashError> {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(PasswordHashError::Malformed);
    };
    if scheme != SCHEME {
        return Err(PasswordHashError::Malformed);
    }
    let iterations: u32 = iterations
        .parse()
        .map_err(|_| PasswordHashError::Malformed)?;
    let salt = hex::decode(salt).map_err(|_| PasswordHashError::Malformed)?;
    let expected = hex::decode(expected).map_err(|_| PasswordHashError::Malformed)?;

    let actual = derive(password, &salt, iterations);
    Ok(constant_time_eq(&actual, &expected))
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}
