//! In-memory store — the authoritative implementation of the storage
//! semantics. Also the substrate [`crate::JsonlStore`] layers persistence
//! on top of.
//!
//! All state sits behind one `parking_lot::RwLock`; the lock is never held
//! across an await point. Taking the write lock for every mutation is what
//! makes decoy and profile upserts observationally serial per key.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use dn_domain::{
    Alert, AlertStatus, AttackerProfile, Decoy, DecoyKind, DecoyStatus, EventRecord, Node,
    NodeStatus, ProfileUpdate, User,
};

use crate::error::StoreError;
use crate::provider::Store;
use crate::types::{AlertFilter, DashboardStats, EventFilter};
use crate::MAX_LIST_LIMIT;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Interior state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    /// Normalized email → user id (the unique index on email).
    users_by_email: HashMap<String, Uuid>,
    nodes: HashMap<String, Node>,
    nodes_by_owner: HashMap<Uuid, HashSet<String>>,
    decoys: HashMap<Uuid, Decoy>,
    /// node id → decoy name → decoy id (the (node, name) unique index).
    decoy_ids_by_node: HashMap<String, HashMap<String, Uuid>>,
    events: Vec<EventRecord>,
    alerts: HashMap<Uuid, Alert>,
    alert_ids_by_owner: HashMap<Uuid, Vec<Uuid>>,
    profiles: HashMap<String, AttackerProfile>,
}

pub struct MemStore {
    inner: RwLock<Inner>,
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Rebuild a store (and all its indexes) from collection dumps.
    /// Used by the file-backed store on startup.
    pub(crate) fn hydrate(
        users: Vec<User>,
        nodes: Vec<Node>,
        decoys: Vec<Decoy>,
        events: Vec<EventRecord>,
        alerts: Vec<Alert>,
        profiles: Vec<AttackerProfile>,
    ) -> Self {
        let mut inner = Inner::default();
        for user in users {
            inner
                .users_by_email
                .insert(User::normalize_email(&user.email), user.id);
            inner.users.insert(user.id, user);
        }
        for node in nodes {
            inner
                .nodes_by_owner
                .entry(node.owner_id)
                .or_default()
                .insert(node.node_id.clone());
            inner.nodes.insert(node.node_id.clone(), node);
        }
        for decoy in decoys {
            inner
                .decoy_ids_by_node
                .entry(decoy.node_id.clone())
                .or_default()
                .insert(decoy.name.clone(), decoy.id);
            inner.decoys.insert(decoy.id, decoy);
        }
        inner.events = events;
        for alert in alerts {
            inner
                .alert_ids_by_owner
                .entry(alert.user_id)
                .or_default()
                .push(alert.id);
            inner.alerts.insert(alert.id, alert);
        }
        for profile in profiles {
            inner.profiles.insert(profile.source_id.clone(), profile);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    // ── snapshot accessors (persistence support) ─────────────────────

    pub(crate) fn dump_users(&self) -> Vec<User> {
        self.inner.read().users.values().cloned().collect()
    }

    pub(crate) fn dump_nodes(&self) -> Vec<Node> {
        self.inner.read().nodes.values().cloned().collect()
    }

    pub(crate) fn dump_decoys(&self) -> Vec<Decoy> {
        self.inner.read().decoys.values().cloned().collect()
    }

    pub(crate) fn dump_alerts(&self) -> Vec<Alert> {
        self.inner.read().alerts.values().cloned().collect()
    }

    pub(crate) fn dump_profiles(&self) -> Vec<AttackerProfile> {
        self.inner.read().profiles.values().cloned().collect()
    }
}

fn clamp_limit(limit: usize) -> usize {
    if limit == 0 {
        MAX_LIST_LIMIT
    } else {
        limit.min(MAX_LIST_LIMIT)
    }
}

/// Round to one decimal place, the precision the dashboard shows.
fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store impl
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl Store for MemStore {
    async fn create_user(&self, user: User) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let key = User::normalize_email(&user.email);
        if inner.users_by_email.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "email already registered: {key}"
            )));
        }
        inner.users_by_email.insert(key, user.id);
        inner.users.insert(user.id, user);
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .users_by_email
            .get(&User::normalize_email(email))
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().users.get(&id).cloned())
    }

    async fn create_node(&self, node: Node) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.nodes.contains_key(&node.node_id) {
            return Err(StoreError::Conflict(format!(
                "duplicate node id: {}",
                node.node_id
            )));
        }
        inner
            .nodes_by_owner
            .entry(node.owner_id)
            .or_default()
            .insert(node.node_id.clone());
        inner.nodes.insert(node.node_id.clone(), node);
        Ok(())
    }

    async fn list_nodes_by_owner(&self, owner: Uuid) -> Result<Vec<Node>, StoreError> {
        let inner = self.inner.read();
        let mut nodes: Vec<Node> = inner
            .nodes_by_owner
            .get(&owner)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.nodes.get(id))
            .cloned()
            .collect();
        nodes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(nodes)
    }

    async fn find_node(&self, node_id: &str) -> Result<Option<Node>, StoreError> {
        Ok(self.inner.read().nodes.get(node_id).cloned())
    }

    async fn update_node_status(
        &self,
        node_id: &str,
        status: NodeStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let node = inner.nodes.get_mut(node_id).ok_or(StoreError::NotFound)?;
        node.status = status;
        Ok(())
    }

    async fn update_node_credential(
        &self,
        node_id: &str,
        verifier: String,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let node = inner.nodes.get_mut(node_id).ok_or(StoreError::NotFound)?;
        node.api_key_hash = verifier;
        Ok(())
    }

    async fn set_node_agent_meta(
        &self,
        node_id: &str,
        hostname: String,
        os: String,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let node = inner.nodes.get_mut(node_id).ok_or(StoreError::NotFound)?;
        node.hostname = Some(hostname);
        node.os = Some(os);
        Ok(())
    }

    async fn bump_node_last_seen(
        &self,
        node_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let node = inner.nodes.get_mut(node_id).ok_or(StoreError::NotFound)?;
        // Monotone: a delayed bump never rewinds the clock.
        node.last_seen = Some(node.last_seen.map_or(at, |prev| prev.max(at)));
        Ok(())
    }

    async fn delete_node(&self, node_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let node = inner.nodes.remove(node_id).ok_or(StoreError::NotFound)?;
        if let Some(owned) = inner.nodes_by_owner.get_mut(&node.owner_id) {
            owned.remove(node_id);
        }
        // Cascade to decoys; events and alerts stay for audit.
        if let Some(names) = inner.decoy_ids_by_node.remove(node_id) {
            for id in names.values() {
                inner.decoys.remove(id);
            }
        }
        Ok(())
    }

    async fn upsert_decoy_trigger(
        &self,
        node_id: &str,
        name: &str,
        kind: DecoyKind,
        at: DateTime<Utc>,
    ) -> Result<Decoy, StoreError> {
        let mut inner = self.inner.write();
        if !inner.nodes.contains_key(node_id) {
            return Err(StoreError::NotFound);
        }
        let existing = inner
            .decoy_ids_by_node
            .get(node_id)
            .and_then(|names| names.get(name))
            .copied();
        if let Some(id) = existing {
            let decoy = inner.decoys.get_mut(&id).ok_or(StoreError::NotFound)?;
            decoy.trigger_count += 1;
            decoy.last_triggered = Some(decoy.last_triggered.map_or(at, |prev| prev.max(at)));
            return Ok(decoy.clone());
        }
        let decoy = Decoy {
            id: Uuid::new_v4(),
            node_id: node_id.to_string(),
            kind,
            name: name.to_string(),
            status: DecoyStatus::Active,
            trigger_count: 1,
            last_triggered: Some(at),
            port: None,
            created_at: Utc::now(),
        };
        inner
            .decoy_ids_by_node
            .entry(node_id.to_string())
            .or_default()
            .insert(name.to_string(), decoy.id);
        inner.decoys.insert(decoy.id, decoy.clone());
        Ok(decoy)
    }

    async fn list_decoys_by_node(
        &self,
        node_id: &str,
        kind: Option<DecoyKind>,
    ) -> Result<Vec<Decoy>, StoreError> {
        let ids = vec![node_id.to_string()];
        self.list_decoys_by_nodes(&ids, kind, MAX_LIST_LIMIT).await
    }

    async fn list_decoys_by_nodes(
        &self,
        node_ids: &[String],
        kind: Option<DecoyKind>,
        limit: usize,
    ) -> Result<Vec<Decoy>, StoreError> {
        let wanted: HashSet<&str> = node_ids.iter().map(String::as_str).collect();
        let inner = self.inner.read();
        let mut decoys: Vec<Decoy> = inner
            .decoys
            .values()
            .filter(|d| wanted.contains(d.node_id.as_str()))
            .filter(|d| kind.map_or(true, |k| d.kind == k))
            .cloned()
            .collect();
        // Most recently triggered first; untouched decoys last.
        decoys.sort_by(|a, b| {
            b.last_triggered
                .cmp(&a.last_triggered)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        decoys.truncate(clamp_limit(limit));
        Ok(decoys)
    }

    async fn find_decoy(&self, id: Uuid) -> Result<Option<Decoy>, StoreError> {
        Ok(self.inner.read().decoys.get(&id).cloned())
    }

    async fn update_decoy_status(
        &self,
        id: Uuid,
        status: DecoyStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let decoy = inner.decoys.get_mut(&id).ok_or(StoreError::NotFound)?;
        decoy.status = status;
        Ok(())
    }

    async fn delete_decoy(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let decoy = inner.decoys.remove(&id).ok_or(StoreError::NotFound)?;
        if let Some(names) = inner.decoy_ids_by_node.get_mut(&decoy.node_id) {
            names.remove(&decoy.name);
        }
        Ok(())
    }

    async fn append_event(&self, event: EventRecord) -> Result<(), StoreError> {
        self.inner.write().events.push(event);
        Ok(())
    }

    async fn list_events(
        &self,
        node_ids: &[String],
        filter: &EventFilter,
    ) -> Result<Vec<EventRecord>, StoreError> {
        let wanted: HashSet<&str> = node_ids.iter().map(String::as_str).collect();
        let needle = filter.search.as_deref().map(str::to_ascii_lowercase);
        let inner = self.inner.read();
        let mut events: Vec<EventRecord> = inner
            .events
            .iter()
            .filter(|e| wanted.contains(e.node_id.as_str()))
            .filter(|e| {
                filter
                    .node_id
                    .as_deref()
                    .map_or(true, |id| e.node_id == id)
            })
            .filter(|e| filter.severity.map_or(true, |s| e.severity() == s))
            .filter(|e| {
                needle
                    .as_deref()
                    .map_or(true, |n| e.matches_search(n))
            })
            .cloned()
            .collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        events.truncate(clamp_limit(filter.limit));
        Ok(events)
    }

    async fn create_alert(&self, alert: Alert) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        inner
            .alert_ids_by_owner
            .entry(alert.user_id)
            .or_default()
            .push(alert.id);
        inner.alerts.insert(alert.id, alert);
        Ok(())
    }

    async fn list_alerts_by_owner(
        &self,
        owner: Uuid,
        filter: &AlertFilter,
    ) -> Result<Vec<Alert>, StoreError> {
        let inner = self.inner.read();
        let mut alerts: Vec<Alert> = inner
            .alert_ids_by_owner
            .get(&owner)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.alerts.get(id))
            .filter(|a| filter.severity.map_or(true, |s| a.severity() == s))
            .filter(|a| filter.status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        alerts.truncate(clamp_limit(filter.limit));
        Ok(alerts)
    }

    async fn find_alert(&self, id: Uuid) -> Result<Option<Alert>, StoreError> {
        Ok(self.inner.read().alerts.get(&id).cloned())
    }

    async fn update_alert_status(
        &self,
        id: Uuid,
        status: AlertStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let alert = inner.alerts.get_mut(&id).ok_or(StoreError::NotFound)?;
        alert.status = status;
        Ok(())
    }

    async fn upsert_profile(&self, update: ProfileUpdate) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        match inner.profiles.get_mut(&update.source_id) {
            Some(profile) => profile.apply(&update),
            None => {
                inner
                    .profiles
                    .insert(update.source_id.clone(), AttackerProfile::new(&update));
            }
        }
        Ok(())
    }

    async fn get_profile(
        &self,
        source_id: &str,
    ) -> Result<Option<AttackerProfile>, StoreError> {
        Ok(self.inner.read().profiles.get(source_id).cloned())
    }

    async fn dashboard_stats(&self, owner: Uuid) -> Result<DashboardStats, StoreError> {
        let inner = self.inner.read();
        let mut alerts: Vec<&Alert> = inner
            .alert_ids_by_owner
            .get(&owner)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.alerts.get(id))
            .collect();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let total_attacks = alerts.len() as u64;
        let active_alerts = alerts.iter().filter(|a| a.status.is_active()).count() as u64;
        let unique_attackers = alerts
            .iter()
            .map(|a| a.source_id.as_str())
            .collect::<HashSet<_>>()
            .len() as u64;
        let avg_risk_score = if alerts.is_empty() {
            0.0
        } else {
            round1(alerts.iter().map(|a| a.risk_score).sum::<f64>() / alerts.len() as f64)
        };
        let high_risk_count = alerts.iter().filter(|a| a.risk_score >= 7.0).count() as u64;
        let recent: Vec<&&Alert> = alerts.iter().take(10).collect();
        let recent_risk_average = if recent.is_empty() {
            0.0
        } else {
            round1(recent.iter().map(|a| a.risk_score).sum::<f64>() / recent.len() as f64)
        };

        let owned = inner.nodes_by_owner.get(&owner);
        let total_nodes = owned.map_or(0, |n| n.len()) as u64;
        let active_nodes = owned
            .into_iter()
            .flatten()
            .filter_map(|id| inner.nodes.get(id))
            .filter(|n| n.status == NodeStatus::Active)
            .count() as u64;

        Ok(DashboardStats {
            total_attacks,
            active_alerts,
            unique_attackers,
            avg_risk_score,
            high_risk_count,
            total_nodes,
            active_nodes,
            recent_risk_average,
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dn_domain::{AttackKind, Classification, EventDetails};

    fn user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: "h".into(),
            created_at: Utc::now(),
        }
    }

    fn node(owner: Uuid, name: &str) -> Node {
        Node {
            node_id: Uuid::new_v4().to_string(),
            owner_id: owner,
            name: name.into(),
            status: NodeStatus::Active,
            api_key_hash: "h".into(),
            hostname: None,
            os: None,
            last_seen: None,
            created_at: Utc::now(),
        }
    }

    fn honeypot_event(node_id: &str, source_ip: &str, risk: f64, ts: i64) -> EventRecord {
        EventRecord {
            id: Uuid::new_v4(),
            node_id: node_id.into(),
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
            received_at: Utc::now(),
            classification: Classification {
                attack_type: AttackKind::BruteForce,
                risk_score: risk,
                confidence: 0.5,
                anomaly: false,
            },
            details: EventDetails::HoneypotLog {
                service: "SSH".into(),
                source_ip: source_ip.into(),
                activity: "login_attempt".into(),
                payload: "user=root pass=wrong".into(),
                extra: Default::default(),
            },
        }
    }

    fn alert(owner: Uuid, node_id: &str, source: &str, risk: f64, ts: i64) -> Alert {
        Alert {
            id: Uuid::new_v4(),
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
            source_id: source.into(),
            service: "SSH".into(),
            activity: "login_attempt".into(),
            attack_type: AttackKind::BruteForce,
            risk_score: risk,
            confidence: 0.9,
            payload_digest: None,
            node_id: node_id.into(),
            user_id: owner,
            status: AlertStatus::Open,
        }
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let store = MemStore::new();
        store.create_user(user("e@x.com")).await.unwrap();
        let err = store.create_user(user("E@X.COM")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn nodes_list_newest_first_and_scope_by_owner() {
        let store = MemStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut n1 = node(a, "n1");
        n1.created_at = Utc.timestamp_opt(100, 0).unwrap();
        let mut n2 = node(a, "n2");
        n2.created_at = Utc.timestamp_opt(200, 0).unwrap();
        store.create_node(n1).await.unwrap();
        store.create_node(n2).await.unwrap();
        store.create_node(node(b, "other")).await.unwrap();

        let listed = store.list_nodes_by_owner(a).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "n2");
        assert_eq!(listed[1].name, "n1");
    }

    #[tokio::test]
    async fn decoy_upsert_increments_instead_of_duplicating() {
        let store = MemStore::new();
        let owner = Uuid::new_v4();
        let n = node(owner, "n1");
        let node_id = n.node_id.clone();
        store.create_node(n).await.unwrap();

        let t1 = Utc.timestamp_opt(100, 0).unwrap();
        let t2 = Utc.timestamp_opt(200, 0).unwrap();
        let d1 = store
            .upsert_decoy_trigger(&node_id, "aws_keys.txt", DecoyKind::Honeytoken, t1)
            .await
            .unwrap();
        let d2 = store
            .upsert_decoy_trigger(&node_id, "aws_keys.txt", DecoyKind::Honeytoken, t2)
            .await
            .unwrap();

        assert_eq!(d1.id, d2.id);
        assert_eq!(d2.trigger_count, 2);
        assert_eq!(d2.last_triggered, Some(t2));

        let listed = store.list_decoys_by_node(&node_id, None).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn decoy_kind_filter_selects_honeytokens() {
        let store = MemStore::new();
        let owner = Uuid::new_v4();
        let n = node(owner, "n1");
        let node_id = n.node_id.clone();
        store.create_node(n).await.unwrap();

        let now = Utc::now();
        store
            .upsert_decoy_trigger(&node_id, "aws_keys.txt", DecoyKind::Honeytoken, now)
            .await
            .unwrap();
        store
            .upsert_decoy_trigger(&node_id, "fake-ssh", DecoyKind::Service, now)
            .await
            .unwrap();

        let tokens = store
            .list_decoys_by_node(&node_id, Some(DecoyKind::Honeytoken))
            .await
            .unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].name, "aws_keys.txt");
    }

    #[tokio::test]
    async fn delete_node_cascades_to_decoys_only() {
        let store = MemStore::new();
        let owner = Uuid::new_v4();
        let n = node(owner, "n1");
        let node_id = n.node_id.clone();
        store.create_node(n).await.unwrap();
        store
            .upsert_decoy_trigger(&node_id, "d", DecoyKind::File, Utc::now())
            .await
            .unwrap();
        store
            .append_event(honeypot_event(&node_id, "1.2.3.4", 3.0, 100))
            .await
            .unwrap();
        store
            .create_alert(alert(owner, &node_id, "1.2.3.4", 8.0, 100))
            .await
            .unwrap();

        store.delete_node(&node_id).await.unwrap();

        assert!(store.find_node(&node_id).await.unwrap().is_none());
        assert!(store.list_nodes_by_owner(owner).await.unwrap().is_empty());
        let ids = vec![node_id.clone()];
        assert!(store
            .list_decoys_by_nodes(&ids, None, 10)
            .await
            .unwrap()
            .is_empty());
        // Audit trail survives.
        let alerts = store
            .list_alerts_by_owner(owner, &AlertFilter::default())
            .await
            .unwrap();
        assert_eq!(alerts.len(), 1);
    }

    #[tokio::test]
    async fn event_listing_filters_and_sorts_descending() {
        let store = MemStore::new();
        let owner = Uuid::new_v4();
        let n = node(owner, "n1");
        let node_id = n.node_id.clone();
        store.create_node(n).await.unwrap();

        store
            .append_event(honeypot_event(&node_id, "1.2.3.4", 3.0, 100))
            .await
            .unwrap();
        store
            .append_event(honeypot_event(&node_id, "5.6.7.8", 3.0, 300))
            .await
            .unwrap();
        store
            .append_event(honeypot_event("unrelated-node", "9.9.9.9", 3.0, 200))
            .await
            .unwrap();

        let ids = vec![node_id.clone()];
        let listed = store
            .list_events(&ids, &EventFilter::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].timestamp > listed[1].timestamp);

        let searched = store
            .list_events(
                &ids,
                &EventFilter {
                    search: Some("5.6.7".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].source_id(), "5.6.7.8");
    }

    #[tokio::test]
    async fn event_listing_caps_at_max_limit() {
        let store = MemStore::new();
        let node_id = "n".to_string();
        for i in 0..(MAX_LIST_LIMIT + 50) {
            store
                .append_event(honeypot_event(&node_id, "1.2.3.4", 1.0, i as i64))
                .await
                .unwrap();
        }
        let ids = vec![node_id];
        let listed = store
            .list_events(
                &ids,
                &EventFilter {
                    limit: MAX_LIST_LIMIT + 50,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(listed.len(), MAX_LIST_LIMIT);
    }

    #[tokio::test]
    async fn profile_upsert_accumulates() {
        let store = MemStore::new();
        let t = Utc.timestamp_opt(100, 0).unwrap();
        store
            .upsert_profile(ProfileUpdate {
                source_id: "1.2.3.4".into(),
                attack_type: AttackKind::BruteForce,
                risk_score: 3.0,
                service: "SSH".into(),
                timestamp: t,
            })
            .await
            .unwrap();
        store
            .upsert_profile(ProfileUpdate {
                source_id: "1.2.3.4".into(),
                attack_type: AttackKind::BruteForce,
                risk_score: 9.0,
                service: "HTTP".into(),
                timestamp: Utc.timestamp_opt(200, 0).unwrap(),
            })
            .await
            .unwrap();

        let profile = store.get_profile("1.2.3.4").await.unwrap().unwrap();
        assert_eq!(profile.total_attacks, 2);
        assert!((profile.average_risk - 6.0).abs() < 1e-9);
        assert_eq!(profile.services_targeted.len(), 2);
        assert!(store.get_profile("8.8.8.8").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stats_aggregate_per_owner() {
        let store = MemStore::new();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let n = node(owner, "n1");
        let node_id = n.node_id.clone();
        store.create_node(n).await.unwrap();

        store
            .create_alert(alert(owner, &node_id, "1.2.3.4", 9.0, 100))
            .await
            .unwrap();
        let mut resolved = alert(owner, &node_id, "5.6.7.8", 5.0, 200);
        resolved.status = AlertStatus::Resolved;
        store.create_alert(resolved).await.unwrap();
        store
            .create_alert(alert(stranger, "other", "9.9.9.9", 9.9, 300))
            .await
            .unwrap();

        let stats = store.dashboard_stats(owner).await.unwrap();
        assert_eq!(stats.total_attacks, 2);
        assert_eq!(stats.active_alerts, 1);
        assert_eq!(stats.unique_attackers, 2);
        assert_eq!(stats.avg_risk_score, 7.0);
        assert_eq!(stats.high_risk_count, 1);
        assert_eq!(stats.total_nodes, 1);
        assert_eq!(stats.active_nodes, 1);
        assert_eq!(stats.recent_risk_average, 7.0);
    }

    #[tokio::test]
    async fn last_seen_bump_is_monotone() {
        let store = MemStore::new();
        let owner = Uuid::new_v4();
        let n = node(owner, "n1");
        let node_id = n.node_id.clone();
        store.create_node(n).await.unwrap();

        let later = Utc.timestamp_opt(500, 0).unwrap();
        let earlier = Utc.timestamp_opt(100, 0).unwrap();
        store.bump_node_last_seen(&node_id, later).await.unwrap();
        store.bump_node_last_seen(&node_id, earlier).await.unwrap();

        let fetched = store.find_node(&node_id).await.unwrap().unwrap();
        assert_eq!(fetched.last_seen, Some(later));
    }

    #[tokio::test]
    async fn missing_entities_return_not_found() {
        let store = MemStore::new();
        assert!(matches!(
            store.update_node_status("nope", NodeStatus::Active).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store
                .update_alert_status(Uuid::new_v4(), AlertStatus::Resolved)
                .await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.delete_decoy(Uuid::new_v4()).await,
            Err(StoreError::NotFound)
        ));
    }
}
