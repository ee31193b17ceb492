//! Password verifiers.
//!
//! Argon2id with the library defaults (19 MiB, t=2, p=1) — a single
//! verification costs comfortably more than 50 ms on commodity hardware,
//! which is the work-factor floor for this service. Hashing runs on the
//! blocking pool so handler threads never stall.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use dn_domain::{Error, Result};

/// Hash a password into its PHC-string verifier form.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::Auth(format!("password hash: {e}")))
}

/// Verify a password against a stored verifier. Any parse failure counts
/// as a mismatch.
pub fn verify_password(password: &str, verifier: &str) -> bool {
    PasswordHash::new(verifier)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let hash = hash_password("P@ss1234").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("P@ss1234", &hash));
        assert!(!verify_password("p@ss1234", &hash));
    }

    #[test]
    fn distinct_salts_per_hash() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_verifier_never_matches() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("anything", ""));
    }
}
