//! HTTP surface. Routes split into **public** (auth + agent-facing, which
//! carry their own node credentials) and **protected** (user-facing query
//! layer gated behind the bearer middleware).

pub mod agent;
pub mod alerts;
pub mod auth;
pub mod decoys;
pub mod error;
pub mod events;
pub mod nodes;
pub mod profile;
pub mod stats;

use axum::middleware;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use dn_domain::Node;

use crate::state::AppState;

use auth::Scope;
use error::ApiError;

/// Build the full API router.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/healthz", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        // Agent-facing: authenticated per-request by node credentials.
        .route("/agent/register", post(agent::register))
        .route("/agent/heartbeat", post(agent::heartbeat))
        .route("/honeypot-log", post(agent::honeypot_log))
        .route("/agent-alert", post(agent::agent_alert));

    let protected = Router::new()
        // Nodes
        .route("/nodes", get(nodes::list_nodes).post(nodes::create_node))
        .route(
            "/nodes/:id",
            get(nodes::get_node)
                .patch(nodes::update_node)
                .delete(nodes::delete_node),
        )
        .route("/nodes/:id/agent-download", get(nodes::agent_download))
        // Decoys
        .route("/decoys", get(decoys::list_decoys))
        .route("/decoys/node/:id", get(decoys::list_node_decoys))
        .route(
            "/decoys/:id",
            patch(decoys::update_decoy).delete(decoys::delete_decoy),
        )
        // Honeytokens (the kind = honeytoken slice of decoys)
        .route("/honeytokens", get(decoys::list_honeytokens))
        .route("/honeytokens/node/:id", get(decoys::list_node_honeytokens))
        .route(
            "/honeytokens/:id",
            patch(decoys::update_decoy).delete(decoys::delete_decoy),
        )
        // Events
        .route("/logs", get(events::list_logs))
        .route("/logs/node/:id", get(events::list_node_logs))
        // Alerts
        .route("/alerts", get(alerts::list_alerts))
        .route("/alerts/:id", patch(alerts::update_alert))
        .route("/recent-attacks", get(alerts::recent_attacks))
        // Aggregates
        .route("/stats", get(stats::dashboard_stats))
        .route("/attacker-profile/:source_id", get(profile::get_profile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_user,
        ));

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scoping helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Load a node and assert the caller owns it. Absent and foreign nodes
/// are indistinguishable to the caller (both 403).
pub(crate) async fn load_owned_node(
    state: &AppState,
    scope: Scope,
    node_id: &str,
) -> Result<Node, ApiError> {
    match state.store.find_node(node_id).await? {
        Some(node) if node.owner_id == scope.0 => Ok(node),
        _ => Err(ApiError::Forbidden(
            "node does not belong to the caller".into(),
        )),
    }
}

/// The caller's fleet: the node-id set every fleet-wide query filters by.
pub(crate) async fn owned_node_ids(
    state: &AppState,
    scope: Scope,
) -> Result<Vec<String>, ApiError> {
    Ok(state
        .store
        .list_nodes_by_owner(scope.0)
        .await?
        .into_iter()
        .map(|n| n.node_id)
        .collect())
}
