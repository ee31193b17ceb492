//! Event (log) listings: a chronologically descending merge of honeypot
//! logs and agent events across the caller's fleet.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;

use dn_domain::{EventRecord, Severity};
use dn_store::EventFilter;

use crate::api::auth::Scope;
use crate::api::error::ApiError;
use crate::api::{load_owned_node, owned_node_ids};
use crate::state::AppState;

const DEFAULT_EVENT_LIMIT: usize = 100;

#[derive(Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
    pub node_id: Option<String>,
    pub severity: Option<String>,
    pub search: Option<String>,
}

impl LogsQuery {
    fn to_filter(&self) -> Result<EventFilter, ApiError> {
        let severity = match self.severity.as_deref() {
            Some(raw) => Some(Severity::parse(raw).ok_or_else(|| {
                ApiError::InvalidInput(format!("unknown severity \"{raw}\""))
            })?),
            None => None,
        };
        Ok(EventFilter {
            node_id: self.node_id.clone(),
            severity,
            search: self.search.clone().filter(|s| !s.is_empty()),
            limit: self.limit.unwrap_or(DEFAULT_EVENT_LIMIT),
        })
    }
}

/// `GET /logs` — fleet-wide. An explicit `node_id` filter must name a
/// node inside the caller's fleet.
pub async fn list_logs(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<EventRecord>>, ApiError> {
    let filter = query.to_filter()?;
    let node_ids = owned_node_ids(&state, scope).await?;
    if let Some(wanted) = &filter.node_id {
        if !node_ids.iter().any(|id| id == wanted) {
            return Err(ApiError::Forbidden(
                "node does not belong to the caller".into(),
            ));
        }
    }
    Ok(Json(state.store.list_events(&node_ids, &filter).await?))
}

/// `GET /logs/node/:id` — one node, after the ownership check.
pub async fn list_node_logs(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
    Path(node_id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<EventRecord>>, ApiError> {
    let mut filter = query.to_filter()?;
    load_owned_node(&state, scope, &node_id).await?;
    filter.node_id = None; // the path segment is the only node filter
    let ids = vec![node_id];
    Ok(Json(state.store.list_events(&ids, &filter).await?))
}
