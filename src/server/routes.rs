//! HTTP route handlers.
//!
//! Handlers are thin: parse the request, call into the library, shape the
//! response. JSON bodies are read as raw bytes and parsed here so a malformed
//! body produces the same `{"error": ...}` shape as every other failure.

use crate::config::{lenient_string, QualityTier};
use crate::convert::{self, ConvertBody, ConvertRequest, OUTPUT_FILENAME};
use crate::error::ImgPdfError;
use crate::estimate;
use crate::output::SizeEstimate;
use crate::server::error::ApiError;
use crate::server::AppState;
use crate::upload;
use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Multipart field carrying the uploaded image.
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    /// Same as `filename`; the directory is never exposed.
    pub filepath: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoveBody {
    pub file: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PreviewBody {
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub compression: Option<String>,
}

fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ImgPdfError> {
    serde_json::from_slice(body)
        .map_err(|e| ImgPdfError::Validation(format!("Invalid JSON body: {}", e)))
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::new(err.status(), err.body_text())
}

/// Health Check
///
/// Confirmation that the service can respond to requests
pub async fn health_check() -> &'static str {
    "OK"
}

/// `POST /upload`: store one JPEG from the `file` multipart field.
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        debug!("Upload without multipart body: {}", rejection);
        ApiError::from(ImgPdfError::Validation("No file selected".into()))
    })?;

    let mut upload: Option<(Option<String>, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(UPLOAD_FIELD) {
            let client_name = field.file_name().map(str::to_string);
            let data = field.bytes().await.map_err(multipart_error)?;
            upload = Some((client_name, data.to_vec()));
            break;
        }
    }

    let (client_name, bytes) =
        upload.ok_or_else(|| ImgPdfError::Validation("No file selected".into()))?;
    let stored = upload::accept_upload(&state.storage, client_name.as_deref(), bytes).await?;

    Ok(Json(UploadResponse {
        success: true,
        filename: stored.name.clone(),
        filepath: stored.name,
    }))
}

/// `GET /uploads/{filename}`: raw bytes of a stored image, for previews.
pub async fn serve_upload(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state.storage.read(&filename).await?;
    let content_type = if upload::has_allowed_extension(&filename) {
        "image/jpeg"
    } else {
        "application/octet-stream"
    };
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

/// `POST /remove-file`: delete one stored image.
///
/// A missing name is a 400 and an unknown one a 404. An unreadable body is
/// a 500.
pub async fn remove_file(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let body: RemoveBody = parse_json(&body).map_err(ApiError::internal)?;
    upload::remove_upload(&state.storage, body.file.as_deref()).await?;
    Ok(Json(MessageResponse {
        message: "File deleted".into(),
    }))
}

/// `POST /convert`: merge stored images into one PDF download.
///
/// Every failure is reported as a 500.
pub async fn convert_to_pdf(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let body: ConvertBody = parse_json(&body).map_err(ApiError::internal)?;
    let request = ConvertRequest::from(body);
    let output = convert::convert(&state.storage, &request, &state.config)
        .await
        .map_err(ApiError::internal)?;

    let disposition = format!("attachment; filename=\"{}\"", OUTPUT_FILENAME);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        output.pdf,
    )
        .into_response())
}

/// `POST /preview-size`: projected savings for a compression tier.
///
/// Every failure is reported as a 500.
pub async fn preview_size(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SizeEstimate>, ApiError> {
    let body: PreviewBody = parse_json(&body).map_err(ApiError::internal)?;
    let tier = QualityTier::parse(body.compression.as_deref());
    let estimate = estimate::estimate_savings(&state.storage, &body.files, tier)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(estimate))
}
