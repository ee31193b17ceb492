//! User authentication: registration, login, and the bearer middleware
//! that resolves the request scope once per request.

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dn_domain::User;

use crate::api::error::{parse_json, ApiError};
use crate::state::AppState;

/// The authenticated user id, resolved by [`require_user`] and threaded
/// into handlers as a request extension.
#[derive(Debug, Clone, Copy)]
pub struct Scope(pub Uuid);

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Middleware
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Axum middleware guarding the user-facing routes. Verifies the bearer
/// once and stores the resulting [`Scope`]; handlers never re-parse the
/// Authorization header.
pub async fn require_user(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    match state.identity.verify_bearer(token) {
        Ok(user_id) => {
            req.extensions_mut().insert(Scope(user_id));
            next.run(req).await
        }
        Err(_) => ApiError::Unauthenticated.into_response(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /auth/register, POST /auth/login
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// API-facing user shape: the storage entity minus the password verifier.
#[derive(Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: UserView,
}

const MIN_PASSWORD_LEN: usize = 8;

fn check_credentials_shape(req: &CredentialsRequest) -> Result<(), ApiError> {
    if !req.email.contains('@') || req.email.trim().is_empty() {
        return Err(ApiError::InvalidInput("email is not valid".into()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let req = parse_json(body)?;
    check_credentials_shape(&req)?;
    let (user, access_token) = state.identity.register(&req.email, &req.password).await?;
    tracing::info!(user_id = %user.id, "user registered");
    Ok(Json(AuthResponse {
        access_token,
        user: user.into(),
    }))
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let req = parse_json(body)?;
    let (user, access_token) = state.identity.login(&req.email, &req.password).await?;
    Ok(Json(AuthResponse {
        access_token,
        user: user.into(),
    }))
}
