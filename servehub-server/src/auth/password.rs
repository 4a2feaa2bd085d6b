//! Argon2id password hashing, offloaded to the blocking pool so key
//! derivation never stalls the async runtime.

use anyhow::{anyhow, Context};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a plaintext password into a self-describing PHC string.
pub async fn hash(password: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| anyhow!("password hashing failed: {e}"))
    })
    .await
    .context("password hashing task panicked")?
}

/// Verify a plaintext password against a stored hash. A malformed stored
/// hash is an error, not a mismatch.
pub async fn verify(password: String, stored_hash: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed =
            PasswordHash::new(&stored_hash).map_err(|e| anyhow!("stored hash is malformed: {e}"))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .context("password verification task panicked")?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify_accepts_correct_password() {
        let hashed = hash("hunter2222".to_string()).await.unwrap();
        assert!(hashed.starts_with("$argon2"));
        assert!(verify("hunter2222".to_string(), hashed).await.unwrap());
    }

    #[tokio::test]
    async fn verify_rejects_wrong_password() {
        let hashed = hash("correct-horse".to_string()).await.unwrap();
        assert!(!verify("battery-staple".to_string(), hashed).await.unwrap());
    }

    #[tokio::test]
    async fn hashes_are_salted() {
        let a = hash("same-password".to_string()).await.unwrap();
        let b = hash("same-password".to_string()).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn malformed_stored_hash_is_an_error() {
        let result = verify("whatever".to_string(), "not-a-phc-string".to_string()).await;
        assert!(result.is_err());
    }
}
