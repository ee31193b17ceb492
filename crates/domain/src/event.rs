//! Raw ingestion records: the common envelope, the two event variants, and
//! the classifier output attached to every event.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Attack kinds
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The classifier's closed universe of attack labels.
///
/// Anything the classifier emits that we do not recognise maps to
/// `Unknown` — the profile histogram stays bounded by this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    BruteForce,
    SqlInjection,
    CommandInjection,
    PortScan,
    Reconnaissance,
    DataExfil,
    HoneytokenAccess,
    Unknown,
}

// Deserialization goes through the tolerant parser so unrecognized wire
// labels land on `Unknown` instead of failing the record.
impl<'de> Deserialize<'de> for AttackKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Ok(Self::parse(&label))
    }
}

impl AttackKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BruteForce => "brute_force",
            Self::SqlInjection => "sql_injection",
            Self::CommandInjection => "command_injection",
            Self::PortScan => "port_scan",
            Self::Reconnaissance => "reconnaissance",
            Self::DataExfil => "data_exfil",
            Self::HoneytokenAccess => "honeytoken_access",
            Self::Unknown => "unknown",
        }
    }

    /// Tolerant parse for classifier wire labels: case- and
    /// separator-insensitive, so `BruteForce`, `brute-force` and
    /// `brute_force` all resolve to the same kind.
    pub fn parse(label: &str) -> Self {
        let norm: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match norm.as_str() {
            "bruteforce" => Self::BruteForce,
            "sqlinjection" => Self::SqlInjection,
            "commandinjection" => Self::CommandInjection,
            "portscan" => Self::PortScan,
            "reconnaissance" | "recon" => Self::Reconnaissance,
            "dataexfil" | "dataexfiltration" => Self::DataExfil,
            "honeytokenaccess" => Self::HoneytokenAccess,
            _ => Self::Unknown,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Severity
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Derive a severity band from a risk score: critical ≥ 9, high ≥ 7,
    /// medium ≥ 4, else low.
    pub fn from_risk(risk: f64) -> Self {
        if risk >= 9.0 {
            Self::Critical
        } else if risk >= 7.0 {
            Self::High
        } else if risk >= 4.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Classification
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Classifier output attached to every raw event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub attack_type: AttackKind,
    /// 0..10.
    pub risk_score: f64,
    /// 0..1.
    pub confidence: f64,
    pub anomaly: bool,
}

impl Classification {
    /// Deterministic result used when the classifier is unreachable or
    /// returns garbage. Risk 0 guarantees no alert is materialised.
    pub fn fallback() -> Self {
        Self {
            attack_type: AttackKind::Unknown,
            risk_score: 0.0,
            confidence: 0.0,
            anomaly: false,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Event envelope + variants
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The two concrete event variants behind a common envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventDetails {
    HoneypotLog {
        service: String,
        source_ip: String,
        activity: String,
        payload: String,
        /// Bounded string-to-string map for forward compatibility.
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        extra: BTreeMap<String, String>,
    },
    AgentEvent {
        hostname: String,
        username: String,
        file_accessed: String,
        file_path: String,
        action: String,
        severity: Severity,
        alert_kind: String,
    },
}

/// An immutable ingestion record. Append-only; never mutated after write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub node_id: String,
    /// Event time as reported by the caller.
    pub timestamp: DateTime<Utc>,
    /// Ingest instant as observed by the gateway.
    pub received_at: DateTime<Utc>,
    pub classification: Classification,
    #[serde(flatten)]
    pub details: EventDetails,
}

impl EventRecord {
    /// Attacker-side source identifier: the honeypot's reported source IP,
    /// or the host name for endpoint agent events.
    pub fn source_id(&self) -> &str {
        match &self.details {
            EventDetails::HoneypotLog { source_ip, .. } => source_ip,
            EventDetails::AgentEvent { hostname, .. } => hostname,
        }
    }

    /// Targeted-resource label: honeypot service name, or the decoy file
    /// an agent observed being accessed.
    pub fn service_label(&self) -> &str {
        match &self.details {
            EventDetails::HoneypotLog { service, .. } => service,
            EventDetails::AgentEvent { file_accessed, .. } => file_accessed,
        }
    }

    /// Declared severity for agent events, risk-derived for honeypot logs.
    pub fn severity(&self) -> Severity {
        match &self.details {
            EventDetails::AgentEvent { severity, .. } => *severity,
            EventDetails::HoneypotLog { .. } => {
                Severity::from_risk(self.classification.risk_score)
            }
        }
    }

    /// Case-insensitive substring match across the searchable fields:
    /// source identifier, service, activity, alert kind, file accessed.
    pub fn matches_search(&self, needle_lower: &str) -> bool {
        let hit = |s: &str| s.to_ascii_lowercase().contains(needle_lower);
        match &self.details {
            EventDetails::HoneypotLog {
                service,
                source_ip,
                activity,
                ..
            } => hit(service) || hit(source_ip) || hit(activity),
            EventDetails::AgentEvent {
                hostname,
                file_accessed,
                alert_kind,
                action,
                ..
            } => hit(hostname) || hit(file_accessed) || hit(alert_kind) || hit(action),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_kind_parse_is_tolerant() {
        assert_eq!(AttackKind::parse("BruteForce"), AttackKind::BruteForce);
        assert_eq!(AttackKind::parse("brute_force"), AttackKind::BruteForce);
        assert_eq!(AttackKind::parse("DATA-EXFIL"), AttackKind::DataExfil);
        assert_eq!(AttackKind::parse("quantum_blast"), AttackKind::Unknown);
    }

    #[test]
    fn unknown_wire_label_deserializes_to_unknown() {
        let kind: AttackKind = serde_json::from_str("\"never_heard_of_it\"").unwrap();
        assert_eq!(kind, AttackKind::Unknown);
    }

    #[test]
    fn severity_bands() {
        assert_eq!(Severity::from_risk(9.0), Severity::Critical);
        assert_eq!(Severity::from_risk(8.9), Severity::High);
        assert_eq!(Severity::from_risk(7.0), Severity::High);
        assert_eq!(Severity::from_risk(6.9), Severity::Medium);
        assert_eq!(Severity::from_risk(4.0), Severity::Medium);
        assert_eq!(Severity::from_risk(3.9), Severity::Low);
        assert_eq!(Severity::from_risk(0.0), Severity::Low);
    }

    #[test]
    fn envelope_serializes_with_event_type_tag() {
        let record = EventRecord {
            id: Uuid::new_v4(),
            node_id: "n1".into(),
            timestamp: Utc::now(),
            received_at: Utc::now(),
            classification: Classification::fallback(),
            details: EventDetails::HoneypotLog {
                service: "SSH".into(),
                source_ip: "1.2.3.4".into(),
                activity: "login_attempt".into(),
                payload: "user=root".into(),
                extra: BTreeMap::new(),
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["event_type"], "honeypot_log");
        assert_eq!(json["source_ip"], "1.2.3.4");
        assert_eq!(json["classification"]["attack_type"], "unknown");
    }

    #[test]
    fn agent_event_severity_is_declared_not_derived() {
        let record = EventRecord {
            id: Uuid::new_v4(),
            node_id: "n1".into(),
            timestamp: Utc::now(),
            received_at: Utc::now(),
            classification: Classification {
                attack_type: AttackKind::DataExfil,
                risk_score: 9.5,
                confidence: 0.9,
                anomaly: true,
            },
            details: EventDetails::AgentEvent {
                hostname: "web-01".into(),
                username: "svc".into(),
                file_accessed: "aws_keys.txt".into(),
                file_path: "/srv/aws_keys.txt".into(),
                action: "read".into(),
                severity: Severity::Medium,
                alert_kind: "honeytoken_access".into(),
            },
        };
        assert_eq!(record.severity(), Severity::Medium);
        assert_eq!(record.source_id(), "web-01");
        assert_eq!(record.service_label(), "aws_keys.txt");
    }

    #[test]
    fn search_matches_case_insensitively() {
        let record = EventRecord {
            id: Uuid::new_v4(),
            node_id: "n1".into(),
            timestamp: Utc::now(),
            received_at: Utc::now(),
            classification: Classification::fallback(),
            details: EventDetails::HoneypotLog {
                service: "SSH".into(),
                source_ip: "1.2.3.4".into(),
                activity: "login_attempt".into(),
                payload: "x".into(),
                extra: BTreeMap::new(),
            },
        };
        assert!(record.matches_search("ssh"));
        assert!(record.matches_search("login"));
        assert!(!record.matches_search("ftp"));
    }
}
