//! Error types for the admin crate.

use crate::api_types::ErrorResponse;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use warden_store::StoreError;

/// Errors that can occur in the admin API.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Failed to start the server.
    #[error("failed to start admin API: {0}")]
    StartupFailed(String),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The record was already approved or rejected.
    #[error("{0}")]
    Conflict(String),

    /// Store error.
    #[error("store error: {0}")]
    Store(String),
}

impl From<StoreError> for AdminError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => AdminError::NotFound("Query not found".to_string()),
            StoreError::AlreadyResolved { .. } => AdminError::Conflict(err.to_string()),
            other => AdminError::Store(other.to_string()),
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdminError::NotFound(_) => StatusCode::NOT_FOUND,
            AdminError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AdminError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Admin request failed");
        }

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}
