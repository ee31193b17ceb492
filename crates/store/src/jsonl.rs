//! File-backed store: an append-only events journal plus JSON snapshots
//! for the mutable collections.
//!
//! Raw events only ever append, so they stream into `events.jsonl` one
//! record per line. Users, nodes, decoys, alerts and profiles mutate in
//! place, so each is snapshot-rewritten (tmp file + rename) after a
//! write. All reads are served by the in-memory [`MemStore`] rebuilt from
//! disk at startup; corrupt journal lines are skipped with a warning.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use dn_domain::{
    Alert, AlertStatus, AttackerProfile, Decoy, DecoyKind, DecoyStatus, EventRecord, Node,
    NodeStatus, ProfileUpdate, User,
};

use crate::error::StoreError;
use crate::memory::MemStore;
use crate::provider::Store;
use crate::types::{AlertFilter, DashboardStats, EventFilter};

const EVENTS_FILE: &str = "events.jsonl";
const USERS_FILE: &str = "users.json";
const NODES_FILE: &str = "nodes.json";
const DECOYS_FILE: &str = "decoys.json";
const ALERTS_FILE: &str = "alerts.json";
const PROFILES_FILE: &str = "profiles.json";

pub struct JsonlStore {
    mem: MemStore,
    dir: PathBuf,
}

impl JsonlStore {
    /// Open (or initialize) a store rooted at `dir`.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;

        let users: Vec<User> = load_snapshot(&dir.join(USERS_FILE))?;
        let nodes: Vec<Node> = load_snapshot(&dir.join(NODES_FILE))?;
        let decoys: Vec<Decoy> = load_snapshot(&dir.join(DECOYS_FILE))?;
        let alerts: Vec<Alert> = load_snapshot(&dir.join(ALERTS_FILE))?;
        let profiles: Vec<AttackerProfile> = load_snapshot(&dir.join(PROFILES_FILE))?;
        let events = load_journal(&dir.join(EVENTS_FILE))?;

        tracing::info!(
            dir = %dir.display(),
            users = users.len(),
            nodes = nodes.len(),
            events = events.len(),
            alerts = alerts.len(),
            "file store loaded"
        );

        Ok(Self {
            mem: MemStore::hydrate(users, nodes, decoys, events, alerts, profiles),
            dir: dir.to_path_buf(),
        })
    }

    // ── persistence helpers ──────────────────────────────────────────

    fn save_snapshot<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<(), StoreError> {
        let path = self.dir.join(name);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(rows)?;
        {
            let mut f = File::create(&tmp)?;
            f.write_all(&json)?;
        }
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn save_users(&self) -> Result<(), StoreError> {
        self.save_snapshot(USERS_FILE, &self.mem.dump_users())
    }

    fn save_nodes(&self) -> Result<(), StoreError> {
        self.save_snapshot(NODES_FILE, &self.mem.dump_nodes())
    }

    fn save_decoys(&self) -> Result<(), StoreError> {
        self.save_snapshot(DECOYS_FILE, &self.mem.dump_decoys())
    }

    fn save_alerts(&self) -> Result<(), StoreError> {
        self.save_snapshot(ALERTS_FILE, &self.mem.dump_alerts())
    }

    fn save_profiles(&self) -> Result<(), StoreError> {
        self.save_snapshot(PROFILES_FILE, &self.mem.dump_profiles())
    }

    fn append_journal(&self, event: &EventRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(event)?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(EVENTS_FILE))?;
        writeln!(file, "{json}")?;
        Ok(())
    }
}

fn load_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn load_journal(path: &Path) -> Result<Vec<EventRecord>, StoreError> {
    let mut events = Vec::new();
    if !path.exists() {
        return Ok(events);
    }
    let content = std::fs::read_to_string(path)?;
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EventRecord>(line) {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    line = lineno + 1,
                    error = %e,
                    "skipping corrupt journal line"
                );
            }
        }
    }
    Ok(events)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store impl — delegate to MemStore, then persist the touched collection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl Store for JsonlStore {
    async fn create_user(&self, user: User) -> Result<(), StoreError> {
        self.mem.create_user(user).await?;
        self.save_users()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.mem.find_user_by_email(email).await
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.mem.find_user(id).await
    }

    async fn create_node(&self, node: Node) -> Result<(), StoreError> {
        self.mem.create_node(node).await?;
        self.save_nodes()
    }

    async fn list_nodes_by_owner(&self, owner: Uuid) -> Result<Vec<Node>, StoreError> {
        self.mem.list_nodes_by_owner(owner).await
    }

    async fn find_node(&self, node_id: &str) -> Result<Option<Node>, StoreError> {
        self.mem.find_node(node_id).await
    }

    async fn update_node_status(
        &self,
        node_id: &str,
        status: NodeStatus,
    ) -> Result<(), StoreError> {
        self.mem.update_node_status(node_id, status).await?;
        self.save_nodes()
    }

    async fn update_node_credential(
        &self,
        node_id: &str,
        verifier: String,
    ) -> Result<(), StoreError> {
        self.mem.update_node_credential(node_id, verifier).await?;
        self.save_nodes()
    }

    async fn set_node_agent_meta(
        &self,
        node_id: &str,
        hostname: String,
        os: String,
    ) -> Result<(), StoreError> {
        self.mem.set_node_agent_meta(node_id, hostname, os).await?;
        self.save_nodes()
    }

    async fn bump_node_last_seen(
        &self,
        node_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.mem.bump_node_last_seen(node_id, at).await?;
        self.save_nodes()
    }

    async fn delete_node(&self, node_id: &str) -> Result<(), StoreError> {
        self.mem.delete_node(node_id).await?;
        self.save_nodes()?;
        self.save_decoys()
    }

    async fn upsert_decoy_trigger(
        &self,
        node_id: &str,
        name: &str,
        kind: DecoyKind,
        at: DateTime<Utc>,
    ) -> Result<Decoy, StoreError> {
        let decoy = self.mem.upsert_decoy_trigger(node_id, name, kind, at).await?;
        self.save_decoys()?;
        Ok(decoy)
    }

    async fn list_decoys_by_node(
        &self,
        node_id: &str,
        kind: Option<DecoyKind>,
    ) -> Result<Vec<Decoy>, StoreError> {
        self.mem.list_decoys_by_node(node_id, kind).await
    }

    async fn list_decoys_by_nodes(
        &self,
        node_ids: &[String],
        kind: Option<DecoyKind>,
        limit: usize,
    ) -> Result<Vec<Decoy>, StoreError> {
        self.mem.list_decoys_by_nodes(node_ids, kind, limit).await
    }

    async fn find_decoy(&self, id: Uuid) -> Result<Option<Decoy>, StoreError> {
        self.mem.find_decoy(id).await
    }

    async fn update_decoy_status(
        &self,
        id: Uuid,
        status: DecoyStatus,
    ) -> Result<(), StoreError> {
        self.mem.update_decoy_status(id, status).await?;
        self.save_decoys()
    }

    async fn delete_decoy(&self, id: Uuid) -> Result<(), StoreError> {
        self.mem.delete_decoy(id).await?;
        self.save_decoys()
    }

    async fn append_event(&self, event: EventRecord) -> Result<(), StoreError> {
        // Journal first: if the disk write fails the event is not
        // considered durable and the caller sees the failure.
        self.append_journal(&event)?;
        self.mem.append_event(event).await
    }

    async fn list_events(
        &self,
        node_ids: &[String],
        filter: &EventFilter,
    ) -> Result<Vec<EventRecord>, StoreError> {
        self.mem.list_events(node_ids, filter).await
    }

    async fn create_alert(&self, alert: Alert) -> Result<(), StoreError> {
        self.mem.create_alert(alert).await?;
        self.save_alerts()
    }

    async fn list_alerts_by_owner(
        &self,
        owner: Uuid,
        filter: &AlertFilter,
    ) -> Result<Vec<Alert>, StoreError> {
        self.mem.list_alerts_by_owner(owner, filter).await
    }

    async fn find_alert(&self, id: Uuid) -> Result<Option<Alert>, StoreError> {
        self.mem.find_alert(id).await
    }

    async fn update_alert_status(
        &self,
        id: Uuid,
        status: AlertStatus,
    ) -> Result<(), StoreError> {
        self.mem.update_alert_status(id, status).await?;
        self.save_alerts()
    }

    async fn upsert_profile(&self, update: ProfileUpdate) -> Result<(), StoreError> {
        self.mem.upsert_profile(update).await?;
        self.save_profiles()
    }

    async fn get_profile(
        &self,
        source_id: &str,
    ) -> Result<Option<AttackerProfile>, StoreError> {
        self.mem.get_profile(source_id).await
    }

    async fn dashboard_stats(&self, owner: Uuid) -> Result<DashboardStats, StoreError> {
        self.mem.dashboard_stats(owner).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use dn_domain::{AttackKind, Classification, EventDetails};

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "e@x.com".into(),
            password_hash: "$argon2id$fake".into(),
            created_at: Utc::now(),
        }
    }

    fn sample_node(owner: Uuid) -> Node {
        Node {
            node_id: Uuid::new_v4().to_string(),
            owner_id: owner,
            name: "edge-1".into(),
            status: NodeStatus::Active,
            api_key_hash: "hash".into(),
            hostname: None,
            os: None,
            last_seen: None,
            created_at: Utc::now(),
        }
    }

    fn sample_event(node_id: &str) -> EventRecord {
        EventRecord {
            id: Uuid::new_v4(),
            node_id: node_id.into(),
            timestamp: Utc::now(),
            received_at: Utc::now(),
            classification: Classification {
                attack_type: AttackKind::BruteForce,
                risk_score: 3.0,
                confidence: 0.6,
                anomaly: false,
            },
            details: EventDetails::HoneypotLog {
                service: "SSH".into(),
                source_ip: "1.2.3.4".into(),
                activity: "login_attempt".into(),
                payload: "user=root".into(),
                extra: Default::default(),
            },
        }
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let user = sample_user();
        let node = sample_node(user.id);
        let node_id = node.node_id.clone();
        {
            let store = JsonlStore::open(dir.path()).unwrap();
            store.create_user(user.clone()).await.unwrap();
            store.create_node(node).await.unwrap();
            store.append_event(sample_event(&node_id)).await.unwrap();
            store
                .upsert_decoy_trigger(&node_id, "aws_keys.txt", DecoyKind::Honeytoken, Utc::now())
                .await
                .unwrap();
            store
                .upsert_profile(ProfileUpdate {
                    source_id: "1.2.3.4".into(),
                    attack_type: AttackKind::BruteForce,
                    risk_score: 3.0,
                    service: "SSH".into(),
                    timestamp: Utc::now(),
                })
                .await
                .unwrap();
        }

        let reopened = JsonlStore::open(dir.path()).unwrap();
        let fetched = reopened
            .find_user_by_email("e@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.id, user.id);
        // The verifier must round-trip even though it never serializes to API JSON.
        assert_eq!(fetched.password_hash, "$argon2id$fake");

        assert!(reopened.find_node(&node_id).await.unwrap().is_some());
        let ids = vec![node_id.clone()];
        assert_eq!(
            reopened
                .list_events(&ids, &EventFilter::default())
                .await
                .unwrap()
                .len(),
            1
        );
        let decoys = reopened.list_decoys_by_node(&node_id, None).await.unwrap();
        assert_eq!(decoys.len(), 1);
        assert_eq!(decoys[0].trigger_count, 1);
        assert!(reopened.get_profile("1.2.3.4").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn corrupt_journal_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonlStore::open(dir.path()).unwrap();
            store.append_event(sample_event("n1")).await.unwrap();
        }
        // Garbage in the middle of the journal must not poison the load.
        let journal = dir.path().join(EVENTS_FILE);
        let mut f = std::fs::OpenOptions::new()
            .append(true)
            .open(&journal)
            .unwrap();
        writeln!(f, "{{not json").unwrap();
        drop(f);
        {
            let store = JsonlStore::open(dir.path()).unwrap();
            store.append_event(sample_event("n1")).await.unwrap();
        }

        let reopened = JsonlStore::open(dir.path()).unwrap();
        let ids = vec!["n1".to_string()];
        assert_eq!(
            reopened
                .list_events(&ids, &EventFilter::default())
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn uniqueness_still_enforced_after_reload() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonlStore::open(dir.path()).unwrap();
            store.create_user(sample_user()).await.unwrap();
        }
        let reopened = JsonlStore::open(dir.path()).unwrap();
        let err = reopened.create_user(sample_user()).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
