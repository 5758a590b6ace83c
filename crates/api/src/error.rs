//! API error mapping
//!
//! Converts tracker errors into HTTP responses with a JSON error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use aircap_datasource::SourceError;

/// Errors surfaced by API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Tracker rejected the request
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The uuid form field was not a valid UUID
    #[error("invalid uuid '{0}'")]
    InvalidUuid(String),

    /// No source with the given UUID exists
    #[error("no source with uuid '{0}'")]
    UnknownSource(uuid::Uuid),
}

impl ApiError {
    /// HTTP status for this error
    fn status(&self) -> StatusCode {
        match self {
            Self::Source(SourceError::DefinitionParse { .. })
            | Self::Source(SourceError::UnknownType(_))
            | Self::InvalidUuid(_) => StatusCode::BAD_REQUEST,
            Self::UnknownSource(_) => StatusCode::NOT_FOUND,
            Self::Source(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({
            "error": status.canonical_reason().unwrap_or("error"),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
