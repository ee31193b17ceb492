//! The storage provider trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use dn_domain::{
    Alert, AlertStatus, AttackerProfile, Decoy, DecoyKind, DecoyStatus, EventRecord, Node,
    NodeStatus, ProfileUpdate, User,
};

use crate::error::StoreError;
use crate::types::{AlertFilter, DashboardStats, EventFilter};

/// Durable persistence surface. One logical read or write per method.
///
/// Required behavior shared by all implementations:
/// - uniqueness on user email (case-insensitive), node id, and
///   `(node_id, decoy name)`;
/// - listings come back newest-first;
/// - `upsert_profile` behaves as if serialised per source identifier;
/// - `delete_node` cascades to the node's decoys, while raw events and
///   alerts are retained for audit.
#[async_trait]
pub trait Store: Send + Sync {
    // ── users ────────────────────────────────────────────────────────
    async fn create_user(&self, user: User) -> Result<(), StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    // ── nodes ────────────────────────────────────────────────────────
    async fn create_node(&self, node: Node) -> Result<(), StoreError>;
    /// Owner's nodes, creation time descending.
    async fn list_nodes_by_owner(&self, owner: Uuid) -> Result<Vec<Node>, StoreError>;
    async fn find_node(&self, node_id: &str) -> Result<Option<Node>, StoreError>;
    async fn update_node_status(
        &self,
        node_id: &str,
        status: NodeStatus,
    ) -> Result<(), StoreError>;
    /// Atomically replace the node's credential verifier (rotation).
    async fn update_node_credential(
        &self,
        node_id: &str,
        verifier: String,
    ) -> Result<(), StoreError>;
    /// Host metadata reported by agent registration.
    async fn set_node_agent_meta(
        &self,
        node_id: &str,
        hostname: String,
        os: String,
    ) -> Result<(), StoreError>;
    async fn bump_node_last_seen(
        &self,
        node_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    async fn delete_node(&self, node_id: &str) -> Result<(), StoreError>;

    // ── decoys ───────────────────────────────────────────────────────
    /// Create-or-bump keyed by `(node_id, name)`: a new decoy starts at
    /// trigger count 1; an existing one increments and refreshes
    /// `last_triggered`.
    async fn upsert_decoy_trigger(
        &self,
        node_id: &str,
        name: &str,
        kind: DecoyKind,
        at: DateTime<Utc>,
    ) -> Result<Decoy, StoreError>;
    async fn list_decoys_by_node(
        &self,
        node_id: &str,
        kind: Option<DecoyKind>,
    ) -> Result<Vec<Decoy>, StoreError>;
    async fn list_decoys_by_nodes(
        &self,
        node_ids: &[String],
        kind: Option<DecoyKind>,
        limit: usize,
    ) -> Result<Vec<Decoy>, StoreError>;
    async fn find_decoy(&self, id: Uuid) -> Result<Option<Decoy>, StoreError>;
    async fn update_decoy_status(
        &self,
        id: Uuid,
        status: DecoyStatus,
    ) -> Result<(), StoreError>;
    async fn delete_decoy(&self, id: Uuid) -> Result<(), StoreError>;

    // ── events ───────────────────────────────────────────────────────
    async fn append_event(&self, event: EventRecord) -> Result<(), StoreError>;
    /// Chronologically descending merge of both event variants across
    /// `node_ids`, with the filter applied.
    async fn list_events(
        &self,
        node_ids: &[String],
        filter: &EventFilter,
    ) -> Result<Vec<EventRecord>, StoreError>;

    // ── alerts ───────────────────────────────────────────────────────
    async fn create_alert(&self, alert: Alert) -> Result<(), StoreError>;
    /// Owner's alerts, timestamp descending.
    async fn list_alerts_by_owner(
        &self,
        owner: Uuid,
        filter: &AlertFilter,
    ) -> Result<Vec<Alert>, StoreError>;
    async fn find_alert(&self, id: Uuid) -> Result<Option<Alert>, StoreError>;
    async fn update_alert_status(
        &self,
        id: Uuid,
        status: AlertStatus,
    ) -> Result<(), StoreError>;

    // ── attacker profiles ────────────────────────────────────────────
    async fn upsert_profile(&self, update: ProfileUpdate) -> Result<(), StoreError>;
    async fn get_profile(
        &self,
        source_id: &str,
    ) -> Result<Option<AttackerProfile>, StoreError>;

    // ── aggregates ───────────────────────────────────────────────────
    async fn dashboard_stats(&self, owner: Uuid) -> Result<DashboardStats, StoreError>;
}
