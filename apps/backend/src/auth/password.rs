//! Password hashing with Argon2id.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashingError {
    #[error("invalid argon2 parameters: {0}")]
    Params(String),
    #[error("salt generation failed: {0}")]
    Salt(String),
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Produces and checks PHC-format Argon2id digests. Each `hash` call draws
/// a fresh 16-byte salt, so equal passwords never share a digest.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default()),
        }
    }
}

impl CredentialHasher {
    /// Custom cost parameters. Tests use tiny ones to stay fast.
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, HashingError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| HashingError::Params(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash(&self, plaintext: &str) -> Result<String, HashingError> {
        let mut salt_bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut salt_bytes);
        let salt =
            SaltString::encode_b64(&salt_bytes).map_err(|e| HashingError::Salt(e.to_string()))?;

        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|digest| digest.to_string())
            .map_err(|e| HashingError::Hash(e.to_string()))
    }

    /// False on mismatch and on digests that do not parse.
    pub fn verify(&self, digest: &str, plaintext: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        // Parameters come from the digest itself, so older cost settings still verify.
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// Runs one hash at this hasher's cost and returns false. Stands in for
    /// `verify` when there is no stored digest, so a miss costs as much as
    /// a mismatch.
    pub fn verify_missing(&self, plaintext: &str) -> bool {
        let salt = SaltString::encode_b64(&[0u8; 16]);
        if let Ok(salt) = salt {
            let _ = self.argon2.hash_password(plaintext.as_bytes(), &salt);
        }
        false
    }
}
