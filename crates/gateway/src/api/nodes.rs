//! Node lifecycle endpoints.
//!
//! - `GET    /nodes`                    — list the caller's fleet
//! - `POST   /nodes`                    — create; the only response that
//!                                        ever carries a cleartext key
//! - `GET    /nodes/:id`                — fetch one node
//! - `PATCH  /nodes/:id`                — update status
//! - `DELETE /nodes/:id`                — delete (decoys cascade)
//! - `GET    /nodes/:id/agent-download` — zip bundle; rotates the key

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dn_domain::{Node, NodeStatus};

use crate::api::auth::Scope;
use crate::api::error::{parse_json, ApiError};
use crate::api::load_owned_node;
use crate::bundle::{build_agent_bundle, BundleConfig};
use crate::state::AppState;

const MAX_NODE_NAME_LEN: usize = 100;

/// API-facing node shape: the storage entity minus the credential
/// verifier. Every read path goes through this.
#[derive(Serialize)]
pub struct NodeView {
    pub node_id: String,
    pub owner: Uuid,
    pub name: String,
    pub status: NodeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Node> for NodeView {
    fn from(node: Node) -> Self {
        Self {
            node_id: node.node_id,
            owner: node.owner_id,
            name: node.name,
            status: node.status,
            hostname: node.hostname,
            os: node.os,
            last_seen: node.last_seen,
            created_at: node.created_at,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /nodes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn list_nodes(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
) -> Result<Json<Vec<NodeView>>, ApiError> {
    let nodes = state.store.list_nodes_by_owner(scope.0).await?;
    Ok(Json(nodes.into_iter().map(NodeView::from).collect()))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /nodes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Deserialize)]
pub struct CreateNodeRequest {
    pub name: String,
}

/// The create response is the one place the cleartext key exists; no
/// read path can reproduce it.
#[derive(Serialize)]
pub struct NodeCreatedResponse {
    pub node_id: String,
    pub node_api_key: String,
    pub name: String,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub status: NodeStatus,
}

pub async fn create_node(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
    body: Result<Json<CreateNodeRequest>, JsonRejection>,
) -> Result<Json<NodeCreatedResponse>, ApiError> {
    let req = parse_json(body)?;
    let name = req.name.trim();
    if name.is_empty() || name.len() > MAX_NODE_NAME_LEN {
        return Err(ApiError::InvalidInput(format!(
            "name must be 1..={MAX_NODE_NAME_LEN} characters"
        )));
    }

    let credential = state.identity.mint_node_credential();
    let node = Node {
        node_id: Uuid::new_v4().to_string(),
        owner_id: scope.0,
        name: name.to_string(),
        status: NodeStatus::Unknown,
        api_key_hash: credential.verifier,
        hostname: None,
        os: None,
        last_seen: None,
        created_at: Utc::now(),
    };
    state.store.create_node(node.clone()).await?;
    tracing::info!(node_id = %node.node_id, owner = %scope.0, "node created");

    Ok(Json(NodeCreatedResponse {
        node_id: node.node_id,
        node_api_key: credential.cleartext,
        name: node.name,
        owner: node.owner_id,
        created_at: node.created_at,
        status: node.status,
    }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET / PATCH / DELETE /nodes/:id
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn get_node(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
    Path(node_id): Path<String>,
) -> Result<Json<NodeView>, ApiError> {
    Ok(Json(load_owned_node(&state, scope, &node_id).await?.into()))
}

#[derive(Deserialize)]
pub struct UpdateNodeRequest {
    pub status: String,
}

pub async fn update_node(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
    Path(node_id): Path<String>,
    body: Result<Json<UpdateNodeRequest>, JsonRejection>,
) -> Result<Json<NodeView>, ApiError> {
    let req = parse_json(body)?;
    let status = NodeStatus::parse(&req.status)
        .ok_or_else(|| ApiError::InvalidInput(format!("unknown status \"{}\"", req.status)))?;
    load_owned_node(&state, scope, &node_id).await?;
    state.store.update_node_status(&node_id, status).await?;
    let node = state
        .store
        .find_node(&node_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(node.into()))
}

pub async fn delete_node(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
    Path(node_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    load_owned_node(&state, scope, &node_id).await?;
    state.store.delete_node(&node_id).await?;
    tracing::info!(node_id = %node_id, owner = %scope.0, "node deleted");
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /nodes/:id/agent-download
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Build the per-node agent bundle.
///
/// Each download mints a replacement credential and swaps the verifier
/// atomically; previously issued bundles stop working.
pub async fn agent_download(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
    Path(node_id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let node = load_owned_node(&state, scope, &node_id).await?;

    let credential = state.identity.mint_node_credential();
    state
        .store
        .update_node_credential(&node.node_id, credential.verifier.clone())
        .await?;
    tracing::info!(node_id = %node.node_id, "node credential rotated for bundle download");

    let backend_url = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(|host| format!("http://{host}"))
        .unwrap_or_else(|| format!("http://{}", state.config.listen_addr));

    let bytes = build_agent_bundle(&BundleConfig {
        node: &node,
        node_api_key: &credential.cleartext,
        backend_url: &backend_url,
        classifier_url: &state.config.classifier_url,
    })
    .map_err(|e| {
        tracing::error!(error = %e, "bundle build failed");
        ApiError::Internal
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"agent-{}.zip\"", node.node_id),
            ),
        ],
        bytes,
    ))
}
