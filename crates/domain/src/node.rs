//! Deployed probes (honeypot hosts / endpoint agents) and their decoys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Node
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Active,
    Inactive,
    Unknown,
}

impl NodeStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// A deployed probe owned by exactly one user, as the store sees it.
///
/// `api_key_hash` is the SHA-256 verifier of the node credential; the
/// cleartext exists only inside [`IssuedNodeCredential`] at mint time.
/// API responses go through a view type that omits the verifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Opaque, URL-safe, globally unique.
    pub node_id: String,
    /// Owning user. Immutable after creation.
    pub owner_id: Uuid,
    pub name: String,
    pub status: NodeStatus,
    pub api_key_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A freshly minted node credential.
///
/// This is the only shape that carries the cleartext key, and it is only
/// ever produced by the minting path — read paths cannot construct it, so
/// the key appears exactly once, in the create-node response.
#[derive(Debug)]
pub struct IssuedNodeCredential {
    /// `nk_`-prefixed cleartext, handed to the caller once.
    pub cleartext: String,
    /// Hex SHA-256 digest stored on the node record.
    pub verifier: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Decoy
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoyKind {
    File,
    Service,
    Port,
    Honeytoken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoyStatus {
    Active,
    Inactive,
}

impl DecoyStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

/// A bait resource on a node. `(node_id, name)` is unique within a node;
/// repeated triggers increment `trigger_count` rather than duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decoy {
    pub id: Uuid,
    pub node_id: String,
    pub kind: DecoyKind,
    pub name: String,
    pub status: DecoyStatus,
    pub trigger_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_triggered: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub created_at: DateTime<Utc>,
}
