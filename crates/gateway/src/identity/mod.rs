//! Identity & credential service: user registration/login, bearer
//! verification, and node-credential minting/verification.
//!
//! Two auth modes exist. `enforced` is the real thing; `open` is a
//! development convenience where every bearer verify resolves to a fixed
//! demo principal and node-secret comparison is skipped. Open mode never
//! changes the shape of persisted data.

pub mod node_key;
pub mod password;
pub mod token;

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use dn_domain::config::{AuthMode, Config};
use dn_domain::{IssuedNodeCredential, Node, NodeStatus, User};
use dn_store::{Store, StoreError};

use token::TokenSigner;

/// Email of the principal every request resolves to in open mode.
pub const DEMO_EMAIL: &str = "demo@decoynet.local";

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    BadCredentials,
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("node is inactive")]
    NodeInactive,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("internal: {0}")]
    Internal(String),
}

pub struct IdentityService {
    store: Arc<dyn Store>,
    mode: AuthMode,
    /// `None` only in open mode, where tokens are not inspected.
    signer: Option<TokenSigner>,
    demo_user_id: Option<Uuid>,
}

impl IdentityService {
    /// Build the service. In open mode this ensures the demo principal
    /// exists (with an unusable password verifier — nobody logs in as it).
    pub async fn new(store: Arc<dyn Store>, config: &Config) -> Result<Self, IdentityError> {
        let signer = config.token_signing_key.as_deref().map(TokenSigner::new);
        if config.auth_mode == AuthMode::Enforced && signer.is_none() {
            return Err(IdentityError::Internal(
                "TOKEN_SIGNING_KEY missing in enforced mode".into(),
            ));
        }

        let demo_user_id = if config.auth_mode == AuthMode::Open {
            let existing = store.find_user_by_email(DEMO_EMAIL).await?;
            match existing {
                Some(user) => Some(user.id),
                None => {
                    let user = User {
                        id: Uuid::new_v4(),
                        email: DEMO_EMAIL.into(),
                        // Not a valid PHC string, so password login can never match.
                        password_hash: "!".into(),
                        created_at: Utc::now(),
                    };
                    let id = user.id;
                    store.create_user(user).await?;
                    tracing::info!(user_id = %id, "demo principal created (open mode)");
                    Some(id)
                }
            }
        } else {
            None
        };

        Ok(Self {
            store,
            mode: config.auth_mode,
            signer,
            demo_user_id,
        })
    }

    // ── users ────────────────────────────────────────────────────────

    /// Register a new user and return it with a fresh bearer token.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, String), IdentityError> {
        let password = password.to_owned();
        let password_hash = tokio::task::spawn_blocking(move || {
            password::hash_password(&password)
        })
        .await
        .map_err(|e| IdentityError::Internal(e.to_string()))?
        .map_err(|e| IdentityError::Internal(e.to_string()))?;

        let user = User {
            id: Uuid::new_v4(),
            email: User::normalize_email(email),
            password_hash,
            created_at: Utc::now(),
        };
        match self.store.create_user(user.clone()).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => return Err(IdentityError::EmailTaken),
            Err(e) => return Err(e.into()),
        }

        let token = self.issue_token(user.id)?;
        Ok((user, token))
    }

    /// Authenticate by email + password; success returns a fresh token.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, String), IdentityError> {
        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or(IdentityError::BadCredentials)?;

        let password = password.to_owned();
        let verifier = user.password_hash.clone();
        let ok = tokio::task::spawn_blocking(move || {
            password::verify_password(&password, &verifier)
        })
        .await
        .map_err(|e| IdentityError::Internal(e.to_string()))?;
        if !ok {
            return Err(IdentityError::BadCredentials);
        }

        let token = self.issue_token(user.id)?;
        Ok((user, token))
    }

    /// Decode and validate a bearer token, returning the user id.
    /// Open mode short-circuits to the demo principal.
    pub fn verify_bearer(&self, token: &str) -> Result<Uuid, IdentityError> {
        if self.mode == AuthMode::Open {
            return self.demo_user_id.ok_or(IdentityError::Unauthenticated);
        }
        let signer = self.signer.as_ref().ok_or(IdentityError::Unauthenticated)?;
        signer
            .verify(token)
            .map_err(|_| IdentityError::Unauthenticated)
    }

    fn issue_token(&self, user_id: Uuid) -> Result<String, IdentityError> {
        match &self.signer {
            Some(signer) => signer
                .issue(user_id)
                .map_err(|e| IdentityError::Internal(e.to_string())),
            // Open mode: the token is opaque and never inspected.
            None => Ok("open-mode".into()),
        }
    }

    // ── node credentials ─────────────────────────────────────────────

    /// Mint a fresh node credential (cleartext + verifier).
    pub fn mint_node_credential(&self) -> IssuedNodeCredential {
        node_key::mint()
    }

    /// Verify a node credential pair and return the node.
    ///
    /// Unknown node or secret mismatch → `Unauthenticated`; a known node
    /// whose status is inactive → `NodeInactive`.
    pub async fn verify_node_credential(
        &self,
        node_id: &str,
        presented: &str,
    ) -> Result<Node, IdentityError> {
        let node = self
            .store
            .find_node(node_id)
            .await?
            .ok_or(IdentityError::Unauthenticated)?;

        if self.mode == AuthMode::Enforced
            && !node_key::verify(presented, &node.api_key_hash)
        {
            return Err(IdentityError::Unauthenticated);
        }

        if node.status == NodeStatus::Inactive {
            return Err(IdentityError::NodeInactive);
        }

        Ok(node)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
