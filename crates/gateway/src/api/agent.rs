//! Agent-facing endpoints, authenticated per-request by node credentials.
//!
//! - `POST /agent/register`  — first-launch hello: body credentials,
//!                             records host/OS, activates the node
//! - `POST /agent/heartbeat` — liveness: bumps last-seen
//! - `POST /honeypot-log`    — honeypot service log (header credentials)
//! - `POST /agent-alert`     — endpoint agent event (header credentials)

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use dn_domain::{EventRecord, Node, NodeStatus};
use dn_store::StoreError;

use crate::api::error::{parse_json, ApiError};
use crate::api::nodes::NodeView;
use crate::pipeline::{AgentEventRequest, HoneypotLogRequest};
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Credential plumbing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Authenticate the ingest endpoints from the `X-Node-Id` / `X-Node-Key`
/// header pair.
async fn node_from_headers(state: &AppState, headers: &HeaderMap) -> Result<Node, ApiError> {
    let node_id = headers
        .get("x-node-id")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthenticated)?;
    let node_key = headers
        .get("x-node-key")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthenticated)?;
    Ok(state
        .identity
        .verify_node_credential(node_id, node_key)
        .await?)
}

/// A body `node_id` that disagrees with the authenticated node is a
/// caller bug, rejected before the pipeline starts.
fn check_body_node_id(node: &Node, body_node_id: &Option<String>) -> Result<(), ApiError> {
    match body_node_id {
        Some(id) if *id != node.node_id => Err(ApiError::InvalidInput(
            "body node_id does not match the authenticated node".into(),
        )),
        _ => Ok(()),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /agent/register, POST /agent/heartbeat
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Deserialize)]
pub struct AgentRegisterRequest {
    pub node_id: String,
    pub node_api_key: String,
    pub hostname: String,
    pub os: String,
}

/// Idempotent: repeating with the same credential yields the same node
/// record (modulo last-seen).
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<AgentRegisterRequest>, JsonRejection>,
) -> Result<Json<NodeView>, ApiError> {
    let req = parse_json(body)?;
    let node = state
        .identity
        .verify_node_credential(&req.node_id, &req.node_api_key)
        .await?;

    state
        .store
        .set_node_agent_meta(&node.node_id, req.hostname, req.os)
        .await?;
    state
        .store
        .update_node_status(&node.node_id, NodeStatus::Active)
        .await?;
    state
        .store
        .bump_node_last_seen(&node.node_id, Utc::now())
        .await?;
    tracing::info!(node_id = %node.node_id, "agent registered");

    let node = state
        .store
        .find_node(&node.node_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(node.into()))
}

#[derive(Deserialize)]
pub struct HeartbeatRequest {
    pub node_id: String,
    pub node_api_key: String,
}

pub async fn heartbeat(
    State(state): State<AppState>,
    body: Result<Json<HeartbeatRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let req = parse_json(body)?;
    let node = state
        .identity
        .verify_node_credential(&req.node_id, &req.node_api_key)
        .await?;
    state
        .store
        .bump_node_last_seen(&node.node_id, Utc::now())
        .await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /honeypot-log, POST /agent-alert
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn ingest_response(record: &EventRecord) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "event_id": record.id,
        "risk_score": record.classification.risk_score,
    }))
}

/// The raw-event write is the only pipeline step allowed to fail the
/// call; it surfaces as 503 so the agent retries.
fn map_ingest_error(e: StoreError) -> ApiError {
    match e {
        StoreError::Unavailable(m) => {
            tracing::error!(error = %m, "raw-event write failed");
            ApiError::StorageUnavailable
        }
        other => other.into(),
    }
}

pub async fn honeypot_log(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<HoneypotLogRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let req = parse_json(body)?;
    let node = node_from_headers(&state, &headers).await?;
    check_body_node_id(&node, &req.node_id)?;
    req.validate().map_err(ApiError::InvalidInput)?;

    let record = state
        .pipeline
        .ingest_honeypot_log(&node, req)
        .await
        .map_err(map_ingest_error)?;
    Ok(ingest_response(&record))
}

pub async fn agent_alert(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AgentEventRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let req = parse_json(body)?;
    let node = node_from_headers(&state, &headers).await?;
    check_body_node_id(&node, &req.node_id)?;
    req.validate().map_err(ApiError::InvalidInput)?;

    let record = state
        .pipeline
        .ingest_agent_event(&node, req)
        .await
        .map_err(map_ingest_error)?;
    Ok(ingest_response(&record))
}
