//! Materialised high-risk incidents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::{AttackKind, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Open,
    Investigating,
    Resolved,
}

impl AlertStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "investigating" => Some(Self::Investigating),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }

    /// Open and investigating alerts count as active for dashboard stats.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Open | Self::Investigating)
    }
}

/// An incident materialised when a classified event's risk met the
/// threshold. `user_id` is denormalised from the node's owner at ingest
/// time so alert queries never need a node join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub source_id: String,
    /// Honeypot service name, or the decoy file for agent events.
    pub service: String,
    pub activity: String,
    pub attack_type: AttackKind,
    pub risk_score: f64,
    pub confidence: f64,
    /// Hex SHA-256 of the honeypot payload. Payloads themselves are never
    /// echoed out of the ingest path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_digest: Option<String>,
    pub node_id: String,
    pub user_id: Uuid,
    pub status: AlertStatus,
}

impl Alert {
    pub fn severity(&self) -> Severity {
        Severity::from_risk(self.risk_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_activity() {
        assert!(AlertStatus::Open.is_active());
        assert!(AlertStatus::Investigating.is_active());
        assert!(!AlertStatus::Resolved.is_active());
    }

    #[test]
    fn status_parse_rejects_unknown() {
        assert_eq!(AlertStatus::parse("open"), Some(AlertStatus::Open));
        assert_eq!(AlertStatus::parse("closed"), None);
    }
}
