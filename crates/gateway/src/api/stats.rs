//! `GET /stats` — dashboard aggregates for the caller.

use axum::extract::State;
use axum::{Extension, Json};

use dn_store::DashboardStats;

use crate::api::auth::Scope;
use crate::api::error::ApiError;
use crate::state::AppState;

pub async fn dashboard_stats(
    State(state): State<AppState>,
    Extension(scope): Extension<Scope>,
) -> Result<Json<DashboardStats>, ApiError> {
    Ok(Json(state.store.dashboard_stats(scope.0).await?))
}
