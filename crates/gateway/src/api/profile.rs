//! `GET /attacker-profile/:source_id`.
//!
//! Profiles are global, not user-scoped: a source identifier is not
//! user-owned data, so any authenticated principal may look one up.

use axum::extract::{Path, State};
use axum::Json;

use dn_domain::AttackerProfile;

use crate::api::error::ApiError;
use crate::state::AppState;

pub async fn get_profile(
    State(state): State<AppState>,
    Path(source_id): Path<String>,
) -> Result<Json<AttackerProfile>, ApiError> {
    state
        .store
        .get_profile(&source_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}
