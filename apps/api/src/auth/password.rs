use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;

use crate::auth::AuthError;

/// Hashes a secret into an Argon2id PHC string. Runs on the blocking pool.
pub async fn hash_password(password: &str) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_sync(&password))
        .await
        .map_err(|e| AuthError::Hashing(format!("spawn_blocking failed in hashing: {e}")))?
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || verify_sync(&password, &hash))
        .await
        .map_err(|e| AuthError::Hashing(format!("spawn_blocking failed in verification: {e}")))?
}

fn hash_sync(password: &str) -> Result<String, AuthError> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AuthError::Hashing(e.to_string()))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

fn verify_sync(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
