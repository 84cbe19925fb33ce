//! Password hashing.
//!
//! Digests are Argon2id PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`),
//! so cost and salt travel with the digest and verification never needs
//! the current configuration.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use crate::config::PasswordHashConfig;

/// Upper bound on accepted plaintext length, in bytes.
pub const MAX_PASSWORD_BYTES: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password exceeds {MAX_PASSWORD_BYTES} bytes")]
    TooLong,
    #[error("stored password digest is corrupt")]
    CorruptDigest,
    #[error("invalid hashing parameters: {0}")]
    Params(String),
    #[error("failed to hash password: {0}")]
    Hash(String),
}

/// Hashes and verifies passwords with tunable Argon2id cost.
#[derive(Clone)]
pub struct CredentialCodec {
    params: Params,
}

impl CredentialCodec {
    pub fn new(config: &PasswordHashConfig) -> Result<Self, PasswordError> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| PasswordError::Params(e.to_string()))?;
        Ok(Self { params })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Produce a salted, self-describing digest.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::TooLong);
        }
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Check `password` against `digest` using the digest's embedded cost and salt.
    ///
    /// A mismatch is `Ok(false)`; only an unparsable digest is an error.
    pub fn verify(&self, digest: &str, password: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(digest).map_err(|_| PasswordError::CorruptDigest)?;
        if password.len() > MAX_PASSWORD_BYTES {
            return Ok(false);
        }
        match self.hasher().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(_) => Err(PasswordError::CorruptDigest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_codec() -> CredentialCodec {
        CredentialCodec::new(&PasswordHashConfig {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_then_verify() {
        let codec = fast_codec();
        let longest = "x".repeat(MAX_PASSWORD_BYTES);
        for password in ["secret1", "", "pässwörd ✓", longest.as_str()] {
            let digest = codec.hash(password).unwrap();
            assert!(digest.starts_with("$argon2id$"));
            assert!(codec.verify(&digest, password).unwrap());
        }
    }

    #[test]
    fn test_wrong_password_is_false() {
        let codec = fast_codec();
        let digest = codec.hash("secret1").unwrap();
        assert!(!codec.verify(&digest, "secret2").unwrap());
        assert!(!codec.verify(&digest, "").unwrap());
    }

    #[test]
    fn test_salted() {
        let codec = fast_codec();
        assert_ne!(codec.hash("secret1").unwrap(), codec.hash("secret1").unwrap());
    }

    #[test]
    fn test_too_long() {
        let codec = fast_codec();
        let long = "x".repeat(MAX_PASSWORD_BYTES + 1);
        assert!(matches!(codec.hash(&long), Err(PasswordError::TooLong)));
    }

    #[test]
    fn test_corrupt_digest() {
        let codec = fast_codec();
        assert!(matches!(codec.verify("not-a-digest", "secret1"), Err(PasswordError::CorruptDigest)));
        assert!(matches!(codec.verify("", "secret1"), Err(PasswordError::CorruptDigest)));
    }

    #[test]
    fn test_digest_from_other_cost_still_verifies() {
        let digest = fast_codec().hash("secret1").unwrap();
        let other = CredentialCodec::new(&PasswordHashConfig {
            memory_kib: 128,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();
        assert!(other.verify(&digest, "secret1").unwrap());
    }
}
