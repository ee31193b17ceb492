//! API error type: every failure kind carries a stable machine code and a
//! human-readable message. Payloads are never echoed back in errors.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use dn_store::StoreError;

use crate::identity::IdentityError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    BadCredentials,
    #[error("missing or invalid credentials")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(String),
    #[error("node is inactive")]
    NodeInactive,
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
    /// The primary write could not reach persistence (ingest path).
    #[error("storage unavailable")]
    StorageUnavailable,
    #[error("internal error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::EmailTaken | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadCredentials | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::NodeInactive => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::EmailTaken => "email_taken",
            Self::BadCredentials => "bad_credentials",
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::NodeInactive => "node_inactive",
            Self::NotFound => "not_found",
            Self::Conflict(_) => "conflict",
            Self::StorageUnavailable => "storage_unavailable",
            Self::Internal => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({
            "error": { "code": self.code(), "message": self.to_string() }
        }));
        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => Self::NotFound,
            StoreError::Conflict(m) => Self::Conflict(m),
            StoreError::Unavailable(m) => {
                // Read-path degradation surfaces as 500; the ingest path
                // maps its primary write explicitly to 503.
                tracing::error!(error = %m, "storage unavailable");
                Self::Internal
            }
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::EmailTaken => Self::EmailTaken,
            IdentityError::BadCredentials => Self::BadCredentials,
            IdentityError::Unauthenticated => Self::Unauthenticated,
            IdentityError::NodeInactive => Self::NodeInactive,
            IdentityError::Store(inner) => inner.into(),
            IdentityError::Internal(m) => {
                tracing::error!(error = %m, "identity internal error");
                Self::Internal
            }
        }
    }
}

/// Unwrap an axum JSON extraction, turning rejections (bad syntax,
/// unknown enum values, missing fields) into 400 `invalid_input`.
pub fn parse_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match result {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(ApiError::InvalidInput(rejection.body_text())),
    }
}
