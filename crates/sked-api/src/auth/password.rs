//! Password hashing and verification using Argon2id
//!
//! Implements salted one-way hashing with a configurable work factor:
//! - Algorithm: Argon2id (memory-hard, resistant to GPU attacks)
//! - Defaults: 64 MiB memory, 3 iterations, 4 lanes (see `PasswordConfig`)
//! - Salt: 16 bytes random, embedded in the PHC string
//!
//! Hashing is CPU-bound; the async wrappers move it onto tokio's blocking
//! pool so request handling on the runtime threads is never stalled.

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Argon2, Params,
};
use sked_core::PasswordConfig;
use thiserror::Error;

/// Password hashing errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Invalid work factor: {0}")]
    InvalidParams(String),
}

/// Argon2id hasher bound to one work factor
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Build a hasher, rejecting work factors Argon2 cannot use
    pub fn new(config: &PasswordConfig) -> Result<Self, PasswordError> {
        let params = Params::new(
            config.memory_cost,
            config.time_cost,
            config.parallelism,
            config.output_len,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            self.params.clone(),
        )
    }

    /// Hash a plaintext password into a PHC string
    ///
    /// The returned string includes algorithm, parameters and salt, so no
    /// separate salt storage is needed.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(password_hash.to_string())
    }

    /// Verify a plaintext password against a stored PHC string
    ///
    /// Parameters are read from the digest itself, so hashes produced under an
    /// older work factor keep verifying. The digest comparison is constant
    /// time. A malformed digest verifies as `false`.
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(digest) else {
            return false;
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Hash on the blocking pool
    pub async fn hash_async(&self, password: String) -> Result<String, PasswordError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| PasswordError::HashingFailed(format!("hashing task failed: {e}")))?
    }

    /// Verify on the blocking pool
    pub async fn verify_async(&self, password: String, digest: String) -> bool {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light_hasher() -> PasswordHasher {
        // Lighter parameters keep the test suite fast
        PasswordHasher::new(&PasswordConfig {
            memory_cost: 4096,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        })
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hasher = light_hasher();
        let hash = hasher.hash("secret").expect("Failed to hash password");

        assert!(hasher.verify("secret", &hash));
        assert!(!hasher.verify("WrongPassword", &hash));
    }

    #[test]
    fn test_same_password_produces_different_hashes() {
        // Due to random salt, same password should produce different hashes
        let hasher = light_hasher();

        let hash1 = hasher.hash("SamePassword123!").unwrap();
        let hash2 = hasher.hash("SamePassword123!").unwrap();

        assert_ne!(hash1, hash2);
        assert!(hasher.verify("SamePassword123!", &hash1));
        assert!(hasher.verify("SamePassword123!", &hash2));
    }

    #[test]
    fn test_malformed_digest_is_false() {
        let hasher = light_hasher();
        assert!(!hasher.verify("password", "invalid-hash-format"));
        assert!(!hasher.verify("password", ""));
        assert!(!hasher.verify("password", "$argon2id$v=19$m=4096,t=1,p=1$bad"));
    }

    #[test]
    fn test_custom_config_in_digest() {
        let hasher = PasswordHasher::new(&PasswordConfig {
            memory_cost: 8192,
            time_cost: 2,
            parallelism: 2,
            output_len: Some(32),
        })
        .unwrap();

        let hash = hasher.hash("TestPassword123!").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("m=8192"));
        assert!(hash.contains("t=2"));
        assert!(hash.contains("p=2"));
    }

    #[test]
    fn test_digest_survives_work_factor_change() {
        let old = light_hasher();
        let hash = old.hash("secret").unwrap();

        let new = PasswordHasher::new(&PasswordConfig {
            memory_cost: 8192,
            time_cost: 2,
            parallelism: 1,
            output_len: Some(32),
        })
        .unwrap();
        assert!(new.verify("secret", &hash));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = PasswordHasher::new(&PasswordConfig {
            memory_cost: 1,
            time_cost: 0,
            parallelism: 1,
            output_len: Some(32),
        });
        assert!(matches!(result, Err(PasswordError::InvalidParams(_))));
    }

    #[tokio::test]
    async fn test_async_wrappers() {
        let hasher = light_hasher();
        let hash = hasher.hash_async("secret".to_string()).await.unwrap();

        assert!(hasher.verify_async("secret".to_string(), hash.clone()).await);
        assert!(!hasher.verify_async("nope".to_string(), hash).await);
    }
}
