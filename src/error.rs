// HTTP API error types
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{auth::AuthRejection, db::StoreError};

/// Every failure a request can end with. Rendered as `{"message": ...}`.
///
/// Storage and internal messages are passed through to the client verbatim.
/// That is the existing contract of this API, not something to copy into a
/// hardened deployment.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(#[from] AuthRejection),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Endpoint not found")]
    RouteNotFound,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Constraint violations and other failed writes.
    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Server error: {0}")]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::RouteNotFound | ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::Storage(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => {
                ApiError::Unavailable(format!("Database connection failed: {msg}"))
            }
            StoreError::Query(msg) => {
                error!(error = %msg, "query failed");
                ApiError::Internal(anyhow::anyhow!(msg))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(%status, error = %self, "request failed");
        }
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

/// Maps a failed write to the 400 the client sees, e.g. `Error updating product: ...`.
pub fn write_failed(action: &str, err: StoreError) -> ApiError {
    match err {
        StoreError::Unavailable(_) => err.into(),
        StoreError::Query(msg) => {
            error!(error = %msg, action, "write failed");
            ApiError::Storage(format!("Error {action}: {msg}"))
        }
    }
}
