//! services/mentoring_api/src/error.rs
//!
//! Defines the primary error type for the service and how it is reported over HTTP.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mentoring_core::{ImportError, PortError, TrackerError};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

/// Shown when an import file is not JSON at all.
pub const INVALID_FILE_MESSAGE: &str = "Invalid JSON file. Please check the file and try again.";
/// Shown when an import could not be saved.
pub const IMPORT_WRITE_MESSAGE: &str =
    "Import failed while saving. Your local data may be partially updated; export a backup before retrying.";

/// The primary error type for the `mentoring_api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from the store port.
    #[error("Store error: {0}")]
    Port(#[from] PortError),

    /// A record operation was refused.
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// An import could not be read, validated or written.
    #[error(transparent)]
    Import(#[from] ImportError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl ApiError {
    /// The status code and user-facing message for this error.
    pub fn status_and_body(&self) -> (StatusCode, ErrorBody) {
        let plain = |status: StatusCode, error: String| {
            (
                status,
                ErrorBody {
                    error,
                    details: Vec::new(),
                },
            )
        };

        match self {
            ApiError::Tracker(TrackerError::ProfileRequired) => {
                plain(StatusCode::CONFLICT, self.to_string())
            }
            ApiError::Tracker(TrackerError::Invalid(_)) => plain(StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Tracker(TrackerError::LimitReached { .. }) => {
                plain(StatusCode::CONFLICT, self.to_string())
            }
            ApiError::Tracker(TrackerError::NotFound { .. }) | ApiError::NotFound(_) => {
                plain(StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::Import(ImportError::InvalidFile(_)) => {
                plain(StatusCode::BAD_REQUEST, INVALID_FILE_MESSAGE.to_string())
            }
            ApiError::Import(ImportError::Rejected(reasons)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorBody {
                    error: "The file is not a valid export.".to_string(),
                    details: reasons.clone(),
                },
            ),
            ApiError::Import(ImportError::Storage(_)) => {
                plain(StatusCode::INTERNAL_SERVER_ERROR, IMPORT_WRITE_MESSAGE.to_string())
            }
            ApiError::BadRequest(_) => plain(StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Tracker(TrackerError::Port(_))
            | ApiError::Port(_)
            | ApiError::Config(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => plain(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong while saving your data.".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        if status.is_server_error() {
            error!("Request failed: {:?}", self);
        }
        (status, Json(body)).into_response()
    }
}
