//! Dashboard principals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered dashboard user, as the store sees it.
///
/// The password verifier is a salted argon2id hash. This is the storage
/// shape — API responses go through a view type that omits the verifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Globally unique, compared case-insensitively.
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Canonical form used for the uniqueness check.
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_normalization() {
        assert_eq!(User::normalize_email("  A@X.COM "), "a@x.com");
        assert_eq!(User::normalize_email("e@x"), "e@x");
    }

    #[test]
    fn storage_shape_round_trips_the_verifier() {
        let user = User {
            id: Uuid::new_v4(),
            email: "e@x".into(),
            password_hash: "$argon2id$...".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        let back: User = serde_json::from_str(&json).unwrap();
        assert_eq!(back.password_hash, user.password_hash);
    }
}
