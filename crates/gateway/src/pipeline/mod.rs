//! The shared ingestion pipeline behind both agent-facing entry points.
//!
//! Steps, in commit order: derive features → classify → persist raw event
//! → decoy bookkeeping (agent events) → alert materialisation → profile
//! update → node last-seen bump. Only the raw-event write can fail the
//! call; everything after it is best-effort — failures are logged and the
//! caller still gets a success, with the raw event as source of truth.

pub mod features;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use dn_classifier::ClassifierClient;
use dn_domain::{
    Alert, AlertStatus, Classification, DecoyKind, EventDetails, EventRecord, Node,
    ProfileUpdate, Severity,
};
use dn_store::{Store, StoreError};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Input shapes + validation limits
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub const MAX_SERVICE_LEN: usize = 50;
pub const MAX_SOURCE_LEN: usize = 64;
pub const MAX_ACTIVITY_LEN: usize = 100;
pub const MAX_PAYLOAD_BYTES: usize = 10 * 1024;
pub const MAX_EXTRA_BYTES: usize = 4 * 1024;
pub const MAX_HOSTNAME_LEN: usize = 255;
pub const MAX_USERNAME_LEN: usize = 100;
pub const MAX_FILE_LEN: usize = 255;
pub const MAX_PATH_LEN: usize = 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct HoneypotLogRequest {
    pub service: String,
    pub source_ip: String,
    pub activity: String,
    pub payload: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
    /// Redundant with the authenticated `X-Node-Id`; when present it must
    /// agree with it.
    #[serde(default)]
    pub node_id: Option<String>,
}

impl HoneypotLogRequest {
    /// Size-limit checks, run before the pipeline starts.
    pub fn validate(&self) -> Result<(), String> {
        check_len("service", &self.service, MAX_SERVICE_LEN)?;
        check_len("source_ip", &self.source_ip, MAX_SOURCE_LEN)?;
        check_len("activity", &self.activity, MAX_ACTIVITY_LEN)?;
        if self.payload.len() > MAX_PAYLOAD_BYTES {
            return Err(format!(
                "payload exceeds {MAX_PAYLOAD_BYTES} bytes ({})",
                self.payload.len()
            ));
        }
        let extra_bytes: usize = self
            .extra
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum();
        if extra_bytes > MAX_EXTRA_BYTES {
            return Err(format!(
                "extra map exceeds {MAX_EXTRA_BYTES} bytes ({extra_bytes})"
            ));
        }
        if self.service.is_empty() || self.source_ip.is_empty() {
            return Err("service and source_ip must not be empty".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentEventRequest {
    pub hostname: String,
    pub username: String,
    pub file_accessed: String,
    pub file_path: String,
    pub action: String,
    pub severity: Severity,
    pub alert_kind: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub node_id: Option<String>,
}

impl AgentEventRequest {
    pub fn validate(&self) -> Result<(), String> {
        check_len("hostname", &self.hostname, MAX_HOSTNAME_LEN)?;
        check_len("username", &self.username, MAX_USERNAME_LEN)?;
        check_len("file_accessed", &self.file_accessed, MAX_FILE_LEN)?;
        check_len("file_path", &self.file_path, MAX_PATH_LEN)?;
        check_len("action", &self.action, MAX_ACTIVITY_LEN)?;
        check_len("alert_kind", &self.alert_kind, MAX_ACTIVITY_LEN)?;
        if self.hostname.is_empty() || self.file_accessed.is_empty() {
            return Err("hostname and file_accessed must not be empty".into());
        }
        Ok(())
    }
}

fn check_len(field: &str, value: &str, max: usize) -> Result<(), String> {
    if value.len() > max {
        Err(format!("{field} exceeds {max} bytes ({})", value.len()))
    } else {
        Ok(())
    }
}

fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Pipeline
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct IngestPipeline {
    store: Arc<dyn Store>,
    classifier: Arc<ClassifierClient>,
    /// Θ: risk at or above this materialises an alert.
    threshold: f64,
}

impl IngestPipeline {
    pub fn new(store: Arc<dyn Store>, classifier: Arc<ClassifierClient>, threshold: f64) -> Self {
        Self {
            store,
            classifier,
            threshold,
        }
    }

    /// Ingest a honeypot service log. The caller has already
    /// authenticated `node` and validated the request.
    pub async fn ingest_honeypot_log(
        &self,
        node: &Node,
        req: HoneypotLogRequest,
    ) -> Result<EventRecord, StoreError> {
        let features = features::honeypot_features(&req.activity, &req.payload, &req.extra);
        let classification = self.classifier.classify(&features).await;

        let record = EventRecord {
            id: Uuid::new_v4(),
            node_id: node.node_id.clone(),
            timestamp: req.timestamp,
            received_at: Utc::now(),
            classification,
            details: EventDetails::HoneypotLog {
                service: req.service.clone(),
                source_ip: req.source_ip.clone(),
                activity: req.activity.clone(),
                payload: req.payload.clone(),
                extra: req.extra.clone(),
            },
        };
        self.store.append_event(record.clone()).await?;

        self.materialise_alert(
            node,
            &record,
            &classification,
            req.source_ip.clone(),
            req.service.clone(),
            req.activity.clone(),
            Some(sha256_hex(&req.payload)),
        )
        .await;
        self.update_profile(&record, &classification).await;
        self.bump_last_seen(node, record.received_at).await;

        Ok(record)
    }

    /// Ingest an endpoint agent event (a decoy/honeytoken trigger).
    pub async fn ingest_agent_event(
        &self,
        node: &Node,
        req: AgentEventRequest,
    ) -> Result<EventRecord, StoreError> {
        let features = features::agent_event_features();
        let classification = self.classifier.classify(&features).await;

        let record = EventRecord {
            id: Uuid::new_v4(),
            node_id: node.node_id.clone(),
            timestamp: req.timestamp,
            received_at: Utc::now(),
            classification,
            details: EventDetails::AgentEvent {
                hostname: req.hostname.clone(),
                username: req.username.clone(),
                file_accessed: req.file_accessed.clone(),
                file_path: req.file_path.clone(),
                action: req.action.clone(),
                severity: req.severity,
                alert_kind: req.alert_kind.clone(),
            },
        };
        self.store.append_event(record.clone()).await?;

        // Decoy bookkeeping, keyed (node, file). Best-effort.
        if let Err(e) = self
            .store
            .upsert_decoy_trigger(
                &node.node_id,
                &req.file_accessed,
                DecoyKind::Honeytoken,
                req.timestamp,
            )
            .await
        {
            tracing::warn!(
                node_id = %node.node_id,
                decoy = %req.file_accessed,
                error = %e,
                "decoy upsert failed"
            );
        }

        self.materialise_alert(
            node,
            &record,
            &classification,
            req.hostname.clone(),
            req.file_accessed.clone(),
            req.alert_kind.clone(),
            None,
        )
        .await;
        self.update_profile(&record, &classification).await;
        self.bump_last_seen(node, record.received_at).await;

        Ok(record)
    }

    // ── best-effort steps ────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    async fn materialise_alert(
        &self,
        node: &Node,
        record: &EventRecord,
        classification: &Classification,
        source_id: String,
        service: String,
        activity: String,
        payload_digest: Option<String>,
    ) {
        if classification.risk_score < self.threshold {
            return;
        }
        let alert = Alert {
            id: Uuid::new_v4(),
            timestamp: record.timestamp,
            source_id,
            service,
            activity,
            attack_type: classification.attack_type,
            risk_score: classification.risk_score,
            confidence: classification.confidence,
            payload_digest,
            node_id: node.node_id.clone(),
            // Owner as observed at ingest time.
            user_id: node.owner_id,
            status: AlertStatus::Open,
        };
        let alert_id = alert.id;
        if let Err(e) = self.store.create_alert(alert).await {
            tracing::warn!(
                event_id = %record.id,
                alert_id = %alert_id,
                error = %e,
                "alert materialisation failed"
            );
        }
    }

    async fn update_profile(&self, record: &EventRecord, classification: &Classification) {
        let update = ProfileUpdate {
            source_id: record.source_id().to_string(),
            attack_type: classification.attack_type,
            risk_score: classification.risk_score,
            service: record.service_label().to_string(),
            timestamp: record.timestamp,
        };
        if let Err(e) = self.store.upsert_profile(update).await {
            tracing::warn!(
                event_id = %record.id,
                source_id = %record.source_id(),
                error = %e,
                "profile update failed"
            );
        }
    }

    async fn bump_last_seen(&self, node: &Node, at: DateTime<Utc>) {
        if let Err(e) = self.store.bump_node_last_seen(&node.node_id, at).await {
            tracing::warn!(node_id = %node.node_id, error = %e, "last-seen bump failed");
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use dn_domain::{AttackKind, NodeStatus};
    use dn_store::{AlertFilter, EventFilter, MemStore};

    fn test_node() -> Node {
        Node {
            node_id: "n1".into(),
            owner_id: Uuid::new_v4(),
            name: "edge".into(),
            status: NodeStatus::Active,
            api_key_hash: "h".into(),
            hostname: None,
            os: None,
            last_seen: None,
            created_at: Utc::now(),
        }
    }

    /// A classifier pointed at a closed port: every call falls back.
    fn dead_classifier() -> Arc<ClassifierClient> {
        Arc::new(ClassifierClient::new("http://127.0.0.1:9").unwrap())
    }

    fn honeypot_req() -> HoneypotLogRequest {
        HoneypotLogRequest {
            service: "SSH".into(),
            source_ip: "1.2.3.4".into(),
            activity: "login_attempt".into(),
            payload: "user=root pass=wrong".into(),
            timestamp: Utc::now(),
            extra: BTreeMap::new(),
            node_id: None,
        }
    }

    fn agent_req() -> AgentEventRequest {
        AgentEventRequest {
            hostname: "web-01".into(),
            username: "svc".into(),
            file_accessed: "aws_keys.txt".into(),
            file_path: "/srv/aws_keys.txt".into(),
            action: "read".into(),
            severity: Severity::High,
            alert_kind: "honeytoken_access".into(),
            timestamp: Utc::now(),
            node_id: None,
        }
    }

    #[tokio::test]
    async fn fallback_classification_persists_event_without_alert() {
        let store: Arc<dyn Store> = Arc::new(MemStore::new());
        let node = test_node();
        store.create_node(node.clone()).await.unwrap();
        let pipeline = IngestPipeline::new(store.clone(), dead_classifier(), 7.0);

        let record = pipeline
            .ingest_honeypot_log(&node, honeypot_req())
            .await
            .unwrap();
        assert_eq!(record.classification.attack_type, AttackKind::Unknown);
        assert_eq!(record.classification.risk_score, 0.0);

        let ids = vec!["n1".to_string()];
        let events = store.list_events(&ids, &EventFilter::default()).await.unwrap();
        assert_eq!(events.len(), 1);

        let alerts = store
            .list_alerts_by_owner(node.owner_id, &AlertFilter::default())
            .await
            .unwrap();
        assert!(alerts.is_empty());

        let profile = store.get_profile("1.2.3.4").await.unwrap().unwrap();
        assert_eq!(profile.total_attacks, 1);
        assert_eq!(profile.most_common_attack, AttackKind::Unknown);

        let bumped = store.find_node("n1").await.unwrap().unwrap();
        assert!(bumped.last_seen.is_some());
    }

    #[tokio::test]
    async fn agent_event_creates_decoy_even_on_fallback() {
        let store: Arc<dyn Store> = Arc::new(MemStore::new());
        let node = test_node();
        store.create_node(node.clone()).await.unwrap();
        let pipeline = IngestPipeline::new(store.clone(), dead_classifier(), 7.0);

        pipeline.ingest_agent_event(&node, agent_req()).await.unwrap();
        pipeline.ingest_agent_event(&node, agent_req()).await.unwrap();

        let decoys = store.list_decoys_by_node("n1", None).await.unwrap();
        assert_eq!(decoys.len(), 1);
        assert_eq!(decoys[0].name, "aws_keys.txt");
        assert_eq!(decoys[0].kind, DecoyKind::Honeytoken);
        assert_eq!(decoys[0].trigger_count, 2);

        // Profile keyed by hostname for agent events.
        let profile = store.get_profile("web-01").await.unwrap().unwrap();
        assert_eq!(profile.total_attacks, 2);
        assert!(profile.services_targeted.contains("aws_keys.txt"));
    }

    #[test]
    fn honeypot_validation_limits() {
        let mut req = honeypot_req();
        assert!(req.validate().is_ok());

        req.payload = "x".repeat(MAX_PAYLOAD_BYTES);
        assert!(req.validate().is_ok());
        req.payload.push('x');
        assert!(req.validate().is_err());

        let mut req = honeypot_req();
        req.service = "s".repeat(MAX_SERVICE_LEN + 1);
        assert!(req.validate().is_err());

        let mut req = honeypot_req();
        req.extra
            .insert("k".into(), "v".repeat(MAX_EXTRA_BYTES + 1));
        assert!(req.validate().is_err());
    }

    #[test]
    fn agent_validation_limits() {
        let mut req = agent_req();
        assert!(req.validate().is_ok());
        req.file_path = "p".repeat(MAX_PATH_LEN + 1);
        assert!(req.validate().is_err());

        let mut req = agent_req();
        req.hostname = String::new();
        assert!(req.validate().is_err());
    }
}
