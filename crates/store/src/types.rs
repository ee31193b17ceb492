//! Query-side helper shapes shared by all store implementations.

use dn_domain::{AlertStatus, Severity};
use serde::Serialize;

/// Filters for combined event listings. `node_ids` scoping is a separate
/// argument because it is mandatory, not optional.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Narrow to one node (already ownership-checked by the caller).
    pub node_id: Option<String>,
    pub severity: Option<Severity>,
    /// Case-insensitive substring over the searchable event fields.
    pub search: Option<String>,
    pub limit: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub severity: Option<Severity>,
    pub status: Option<AlertStatus>,
    pub limit: usize,
}

/// Aggregates for the dashboard landing page, all scoped to one owner.
/// Averages carry one decimal place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_attacks: u64,
    pub active_alerts: u64,
    pub unique_attackers: u64,
    pub avg_risk_score: f64,
    pub high_risk_count: u64,
    pub total_nodes: u64,
    pub active_nodes: u64,
    pub recent_risk_average: f64,
}
