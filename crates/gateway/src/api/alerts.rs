//! Alert endpoints.
//!
//! - `GET   /alerts`         — the caller's alerts, newest first
//! - `PATCH /alerts/:id`     — status workflow (open → investigating → resolved)
//! - `GET   /recent-attacks` — compact dashboard feed

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dn_domain::{Alert, AlertStatus, AttackKind, Severity};
use dn_store::AlertFilter;

use crate::api::auth::Scope;
use crate::api::error::{parse_json, ApiError};
use crate::state::AppState;

const DEFAULT_ALERT_LIMIT: usize = 100;
const DEFAULT_RECENT_LIMIT: usize = 10;

#[derive(Deserialize)]
pub struct AlertsQuery {
    pub limit: Option<usize>,
    pub severity: Option<String>,
    pub status: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /alerts
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn list_alerts(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
    Query(query): Query<AlertsQuery>,
) -> Result<Json<Vec<Alert>>, ApiError> {
    let severity = match query.severity.as_deref() {
        Some(raw) => Some(Severity::parse(raw).ok_or_else(|| {
            ApiError::InvalidInput(format!("unknown severity \"{raw}\""))
        })?),
        None => None,
    };
    let status = match query.status.as_deref() {
        Some(raw) => Some(AlertStatus::parse(raw).ok_or_else(|| {
            ApiError::InvalidInput(format!("unknown status \"{raw}\""))
        })?),
        None => None,
    };
    let filter = AlertFilter {
        severity,
        status,
        limit: query.limit.unwrap_or(DEFAULT_ALERT_LIMIT),
    };
    Ok(Json(state.store.list_alerts_by_owner(scope.0, &filter).await?))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PATCH /alerts/:id
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Deserialize)]
pub struct UpdateAlertRequest {
    pub status: String,
}

pub async fn update_alert(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
    Path(alert_id): Path<Uuid>,
    body: Result<Json<UpdateAlertRequest>, JsonRejection>,
) -> Result<Json<Alert>, ApiError> {
    let req = parse_json(body)?;
    let status = AlertStatus::parse(&req.status)
        .ok_or_else(|| ApiError::InvalidInput(format!("unknown status \"{}\"", req.status)))?;

    let alert = state
        .store
        .find_alert(alert_id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("alert does not belong to the caller".into()))?;
    if alert.user_id != scope.0 {
        return Err(ApiError::Forbidden(
            "alert does not belong to the caller".into(),
        ));
    }

    state.store.update_alert_status(alert_id, status).await?;
    let updated = state
        .store
        .find_alert(alert_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(updated))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /recent-attacks
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct RecentAttack {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub source_id: String,
    pub attack_type: AttackKind,
    pub risk_score: f64,
    pub severity: Severity,
    pub service: String,
    pub node_id: String,
}

pub async fn recent_attacks(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<RecentAttack>>, ApiError> {
    let filter = AlertFilter {
        limit: query.limit.unwrap_or(DEFAULT_RECENT_LIMIT),
        ..Default::default()
    };
    let alerts = state.store.list_alerts_by_owner(scope.0, &filter).await?;
    let feed = alerts
        .into_iter()
        .map(|a| RecentAttack {
            severity: a.severity(),
            id: a.id,
            timestamp: a.timestamp,
            source_id: a.source_id,
            attack_type: a.attack_type,
            risk_score: a.risk_score,
            service: a.service,
            node_id: a.node_id,
        })
        .collect();
    Ok(Json(feed))
}
