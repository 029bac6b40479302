//! # Credential Engine
//!
//! Password hashing and verification for user accounts.
//!
//! ## Overview
//!
//! Two storage schemes coexist in the `users` table:
//!
//! - **Salted** (current): the stored record carries a 64-hex-char salt and
//!   `argon2id(sha256_hex(password ‖ salt))`. The SHA-256 step fixes the input
//!   length fed to the slow hash regardless of password size.
//! - **Legacy**: the salt column is empty and the hash is the slow hash of the
//!   raw password.
//!
//! [`CredentialEngine::check`] tells the two apart. A successful legacy check
//! is the caller's cue to rehash with a fresh salt while the plaintext is
//! still in hand.
//!
//! Both schemes produce PHC strings, so verification reads the cost
//! parameters from the stored hash and keeps working after the configured
//! costs change.

use crate::error::{AuthError, Result};
use argon2::{
    password_hash::{
        rand_core::{OsRng, RngCore},
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use sha2::{Digest, Sha256};

/// Length in bytes of a per-user salt before hex encoding.
pub const SALT_BYTES: usize = 32;

/// Outcome of checking a plaintext against a stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialCheck {
    /// Matched under the salted scheme.
    Salted,
    /// Matched under the legacy scheme; the record should be upgraded.
    Legacy,
    Mismatch,
}

impl CredentialCheck {
    pub fn is_match(&self) -> bool {
        !matches!(self, CredentialCheck::Mismatch)
    }

    pub fn needs_upgrade(&self) -> bool {
        matches!(self, CredentialCheck::Legacy)
    }
}

/// A freshly computed salt and salted hash, ready to persist.
#[derive(Clone, PartialEq, Eq)]
pub struct SaltedCredential {
    pub salt: String,
    pub hash: String,
}

impl std::fmt::Debug for SaltedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaltedCredential")
            .field("salt", &"[REDACTED]")
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

/// Hashes and verifies passwords with Argon2id.
#[derive(Debug, Clone)]
pub struct CredentialEngine {
    params: Params,
}

impl Default for CredentialEngine {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl CredentialEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with explicit Argon2 cost parameters.
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| AuthError::Config(format!("invalid argon2 parameters: {}", e)))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'_> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Generate a new per-user salt: 32 random bytes, lowercase hex.
    pub fn generate_salt(&self) -> Result<String> {
        let mut bytes = [0u8; SALT_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| AuthError::Hashing(format!("entropy source unavailable: {}", e)))?;
        Ok(hex::encode(bytes))
    }

    /// Hash `password` under the salted scheme.
    pub fn hash_with_salt(&self, password: &str, salt: &str) -> Result<String> {
        self.slow_hash(&salted_digest(password, salt))
    }

    /// Returns `false` on mismatch or on a malformed stored hash.
    pub fn verify_with_salt(&self, password: &str, salt: &str, hash: &str) -> bool {
        self.slow_verify(&salted_digest(password, salt), hash)
    }

    /// Hash `password` under the legacy (unsalted) scheme.
    ///
    /// Only needed to seed records that predate per-user salts.
    pub fn hash_legacy(&self, password: &str) -> Result<String> {
        self.slow_hash(password)
    }

    pub fn verify_legacy(&self, password: &str, hash: &str) -> bool {
        self.slow_verify(password, hash)
    }

    /// Generate a salt and hash `password` with it.
    pub fn new_credential(&self, password: &str) -> Result<SaltedCredential> {
        let salt = self.generate_salt()?;
        let hash = self.hash_with_salt(password, &salt)?;
        Ok(SaltedCredential { salt, hash })
    }

    /// Check a plaintext against a stored record.
    ///
    /// An empty `salt` marks a legacy record.
    pub fn check(&self, password: &str, salt: &str, hash: &str) -> CredentialCheck {
        if salt.is_empty() {
            if self.verify_legacy(password, hash) {
                CredentialCheck::Legacy
            } else {
                CredentialCheck::Mismatch
            }
        } else if self.verify_with_salt(password, salt, hash) {
            CredentialCheck::Salted
        } else {
            CredentialCheck::Mismatch
        }
    }

    fn slow_hash(&self, input: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(input.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    }

    fn slow_verify(&self, input: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2()
                .verify_password(input.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

fn salted_digest(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn engine() -> CredentialEngine {
        // Minimum-cost parameters keep the suite fast
        CredentialEngine::with_params(8, 1, 1).unwrap()
    }

    #[test]
    fn test_salted_round_trip() {
        let engine = engine();
        let salt = engine.generate_salt().unwrap();
        let hash = engine.hash_with_salt("correct horse", &salt).unwrap();

        assert!(engine.verify_with_salt("correct horse", &salt, &hash));
    }

    #[test]
    fn test_salted_rejects_mutations() {
        let engine = engine();
        let salt = engine.generate_salt().unwrap();
        let hash = engine.hash_with_salt("correct horse", &salt).unwrap();
        let other_salt = engine.generate_salt().unwrap();
        let other_hash = engine.hash_with_salt("correct horse", &other_salt).unwrap();

        assert!(!engine.verify_with_salt("correct horsE", &salt, &hash));
        assert!(!engine.verify_with_salt("correct horse", &other_salt, &hash));
        assert!(!engine.verify_with_salt("correct horse", &salt, &other_hash));
        assert!(!engine.verify_with_salt("correct horse", &salt, "not-a-phc-string"));
        assert!(!engine.verify_with_salt("correct horse", &salt, ""));
    }

    #[test]
    fn test_same_input_hashes_differently() {
        let engine = engine();
        let a = engine.hash_with_salt("pw", "salt").unwrap();
        let b = engine.hash_with_salt("pw", "salt").unwrap();

        assert_ne!(a, b);
        assert!(engine.verify_with_salt("pw", "salt", &a));
        assert!(engine.verify_with_salt("pw", "salt", &b));
    }

    #[test]
    fn test_long_passwords_are_accepted() {
        let engine = engine();
        let password = "x".repeat(4096);
        let salt = engine.generate_salt().unwrap();
        let hash = engine.hash_with_salt(&password, &salt).unwrap();

        assert!(engine.verify_with_salt(&password, &salt, &hash));
    }

    #[test]
    fn test_generate_salt_shape_and_uniqueness() {
        let engine = engine();
        let mut seen = HashSet::new();

        for _ in 0..10_000 {
            let salt = engine.generate_salt().unwrap();
            assert_eq!(salt.len(), 64);
            assert!(salt
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
            assert!(seen.insert(salt), "duplicate salt generated");
        }
    }

    #[test]
    fn test_legacy_scheme() {
        let engine = engine();
        let legacy = engine.hash_legacy("old-password").unwrap();

        assert!(engine.verify_legacy("old-password", &legacy));
        assert!(!engine.verify_legacy("new-password", &legacy));
        assert_eq!(
            engine.check("old-password", "", &legacy),
            CredentialCheck::Legacy
        );
        assert_eq!(
            engine.check("wrong", "", &legacy),
            CredentialCheck::Mismatch
        );
    }

    #[test]
    fn test_upgraded_hash_no_longer_verifies_as_legacy() {
        let engine = engine();
        let upgraded = engine.new_credential("old-password").unwrap();

        assert!(!engine.verify_legacy("old-password", &upgraded.hash));
        assert!(engine.verify_with_salt("old-password", &upgraded.salt, &upgraded.hash));
        assert_eq!(
            engine.check("old-password", &upgraded.salt, &upgraded.hash),
            CredentialCheck::Salted
        );
    }

    #[test]
    fn test_check_flags() {
        assert!(CredentialCheck::Salted.is_match());
        assert!(CredentialCheck::Legacy.is_match());
        assert!(!CredentialCheck::Mismatch.is_match());
        assert!(CredentialCheck::Legacy.needs_upgrade());
        assert!(!CredentialCheck::Salted.needs_upgrade());
    }

    #[test]
    fn test_verification_survives_cost_change() {
        let cheap = engine();
        let hash = cheap.hash_with_salt("pw", "s").unwrap();
        let costlier = CredentialEngine::with_params(16, 2, 1).unwrap();

        assert!(costlier.verify_with_salt("pw", "s", &hash));
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(matches!(
            CredentialEngine::with_params(1, 0, 1),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let cred = engine().new_credential("pw").unwrap();
        let rendered = format!("{:?}", cred);
        assert!(!rendered.contains(&cred.salt));
    }
}
