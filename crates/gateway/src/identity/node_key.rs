//! Node credentials: one `nk_`-prefixed secret per node.
//!
//! The cleartext is 16 random bytes hex-encoded; only its SHA-256 digest
//! is ever stored. Verification hashes the presented secret and compares
//! digests in constant time, so neither length nor prefix leaks.

use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use dn_domain::IssuedNodeCredential;

pub const NODE_KEY_PREFIX: &str = "nk_";

/// Mint a fresh 128-bit credential. The only producer of the cleartext
/// shape in the whole codebase.
pub fn mint() -> IssuedNodeCredential {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    let cleartext = format!("{NODE_KEY_PREFIX}{}", hex::encode(bytes));
    let verifier = digest(&cleartext);
    IssuedNodeCredential { cleartext, verifier }
}

/// Hex SHA-256 of a cleartext key.
pub fn digest(cleartext: &str) -> String {
    hex::encode(Sha256::digest(cleartext.as_bytes()))
}

/// Constant-time check of a presented secret against the stored verifier.
pub fn verify(presented: &str, verifier_hex: &str) -> bool {
    let presented_digest = Sha256::digest(presented.as_bytes());
    match hex::decode(verifier_hex) {
        Ok(stored) => bool::from(presented_digest.ct_eq(stored.as_slice())),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_keys_have_prefix_and_verify() {
        let cred = mint();
        assert!(cred.cleartext.starts_with(NODE_KEY_PREFIX));
        assert_eq!(cred.cleartext.len(), NODE_KEY_PREFIX.len() + 32);
        assert!(verify(&cred.cleartext, &cred.verifier));
    }

    #[test]
    fn wrong_key_fails() {
        let cred = mint();
        let other = mint();
        assert!(!verify(&other.cleartext, &cred.verifier));
        assert!(!verify("", &cred.verifier));
    }

    #[test]
    fn corrupt_verifier_fails_closed() {
        let cred = mint();
        assert!(!verify(&cred.cleartext, "zzzz-not-hex"));
    }

    #[test]
    fn mints_are_unique() {
        assert_ne!(mint().cleartext, mint().cleartext);
    }
}
