//! Decoy and honeytoken endpoints. Honeytokens are the `kind =
//! honeytoken` slice of the decoy table; both route families share the
//! same handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use dn_domain::{Decoy, DecoyKind, DecoyStatus};

use crate::api::auth::Scope;
use crate::api::error::{parse_json, ApiError};
use crate::api::{load_owned_node, owned_node_ids};
use crate::state::AppState;

const DEFAULT_DECOY_LIMIT: usize = 50;

#[derive(Deserialize)]
pub struct DecoyListQuery {
    pub limit: Option<usize>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Fleet-wide listings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn list_fleet(
    state: &AppState,
    scope: Scope,
    kind: Option<DecoyKind>,
    limit: Option<usize>,
) -> Result<Vec<Decoy>, ApiError> {
    let node_ids = owned_node_ids(state, scope).await?;
    Ok(state
        .store
        .list_decoys_by_nodes(&node_ids, kind, limit.unwrap_or(DEFAULT_DECOY_LIMIT))
        .await?)
}

pub async fn list_decoys(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
    Query(query): Query<DecoyListQuery>,
) -> Result<Json<Vec<Decoy>>, ApiError> {
    Ok(Json(list_fleet(&state, scope, None, query.limit).await?))
}

pub async fn list_honeytokens(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
    Query(query): Query<DecoyListQuery>,
) -> Result<Json<Vec<Decoy>>, ApiError> {
    Ok(Json(
        list_fleet(&state, scope, Some(DecoyKind::Honeytoken), query.limit).await?,
    ))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Node-scoped listings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn list_for_node(
    state: &AppState,
    scope: Scope,
    node_id: &str,
    kind: Option<DecoyKind>,
) -> Result<Vec<Decoy>, ApiError> {
    load_owned_node(state, scope, node_id).await?;
    Ok(state.store.list_decoys_by_node(node_id, kind).await?)
}

pub async fn list_node_decoys(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
    Path(node_id): Path<String>,
) -> Result<Json<Vec<Decoy>>, ApiError> {
    Ok(Json(list_for_node(&state, scope, &node_id, None).await?))
}

pub async fn list_node_honeytokens(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
    Path(node_id): Path<String>,
) -> Result<Json<Vec<Decoy>>, ApiError> {
    Ok(Json(
        list_for_node(&state, scope, &node_id, Some(DecoyKind::Honeytoken)).await?,
    ))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// PATCH / DELETE by decoy id
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Ownership is re-checked through the decoy's node: the decoy id alone
/// proves nothing about who may touch it.
async fn load_owned_decoy(
    state: &AppState,
    scope: Scope,
    decoy_id: Uuid,
) -> Result<Decoy, ApiError> {
    let decoy = state
        .store
        .find_decoy(decoy_id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("decoy does not belong to the caller".into()))?;
    load_owned_node(state, scope, &decoy.node_id).await?;
    Ok(decoy)
}

#[derive(Deserialize)]
pub struct UpdateDecoyRequest {
    pub status: String,
}

pub async fn update_decoy(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
    Path(decoy_id): Path<Uuid>,
    body: Result<Json<UpdateDecoyRequest>, JsonRejection>,
) -> Result<Json<Decoy>, ApiError> {
    let req = parse_json(body)?;
    let status = DecoyStatus::parse(&req.status)
        .ok_or_else(|| ApiError::InvalidInput(format!("unknown status \"{}\"", req.status)))?;
    load_owned_decoy(&state, scope, decoy_id).await?;
    state.store.update_decoy_status(decoy_id, status).await?;
    let decoy = state
        .store
        .find_decoy(decoy_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(decoy))
}

pub async fn delete_decoy(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
    Path(decoy_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    load_owned_decoy(&state, scope, decoy_id).await?;
    state.store.delete_decoy(decoy_id).await?;
    Ok(Json(serde_json::json!({ "status": "deleted" })))
}
