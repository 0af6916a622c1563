//! Argon2id password hashing.
//!
//! Hashing is CPU-bound: async callers must run these functions through
//! `tokio::task::spawn_blocking`.

use anyhow::Result;
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::Arc;

use crate::config::SecurityConfig;
use crate::services::tokens::generate_access_token;

#[derive(Clone)]
pub struct CredentialHasher {
    params: Params,
    /// Verified against when the username is unknown, so both login failures cost the same.
    dummy_hash: Arc<str>,
}

impl CredentialHasher {
    pub fn new(config: &SecurityConfig) -> Result<Self> {
        let params = Params::new(
            config.argon2_memory_cost_kib,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

        let dummy_hash = hash_with(&params, &generate_access_token())?;

        Ok(Self {
            params,
            dummy_hash: Arc::from(dummy_hash),
        })
    }

    /// Hash with a freshly generated salt. Output is a PHC string.
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        hash_with(&self.params, plaintext)
    }

    /// Parameters are read back from the PHC string, so hashes made with older
    /// settings still verify. A malformed hash never verifies.
    #[must_use]
    pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Same cost as a real verification; always false.
    #[must_use]
    pub fn verify_unknown(&self, plaintext: &str) -> bool {
        std::hint::black_box(self.verify(plaintext, &self.dummy_hash));
        false
    }
}

fn hash_with(params: &Params, plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone());

    let hash = argon2
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}
