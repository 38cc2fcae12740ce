//! JSON error responses.
//!
//! Every handler converts failures into `{"error": "<message>"}` at its own
//! boundary. The status is picked from the [`ErrorKind`]; routes whose
//! contract only knows one failure status use [`ApiError::internal`].

use crate::error::{ErrorKind, ImgPdfError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Report any failure as a 500.
    pub fn internal(err: ImgPdfError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }
}

impl From<ImgPdfError> for ApiError {
    fn from(err: ImgPdfError) -> Self {
        let status = match err.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::SourceMissing | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{} {}", self.status, self.message);
        }
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        let cases = [
            (ImgPdfError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                ImgPdfError::NotFound { name: "a".into() },
                StatusCode::NOT_FOUND,
            ),
            (
                ImgPdfError::SourceMissing { name: "a".into() },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ImgPdfError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn internal_overrides_kind() {
        let e = ApiError::internal(ImgPdfError::Validation("No files to convert".into()));
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.message, "No files to convert");
    }
}
