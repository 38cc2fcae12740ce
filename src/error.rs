//! Error types for the imgpdf library.
//!
//! A single [`ImgPdfError`] enum covers every failure. Each variant belongs to
//! one of four [`ErrorKind`]s, and the HTTP layer maps kinds to statuses:
//!
//! * [`ErrorKind::Validation`]: the request itself is unusable (no file,
//!   empty name, wrong extension).
//! * [`ErrorKind::NotFound`]: a referenced stored file is absent.
//! * [`ErrorKind::SourceMissing`]: a file named in a conversion request is
//!   absent. Kept apart from `NotFound` because conversion reports it as a
//!   server error, not a 404.
//! * [`ErrorKind::Internal`]: decode/encode, PDF assembly, or storage I/O
//!   failed.
//!
//! Messages are human-readable only; there are no structured error codes.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the imgpdf library.
#[derive(Debug, Error)]
pub enum ImgPdfError {
    // ── Request errors ────────────────────────────────────────────────────
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// No stored file with this name exists.
    #[error("File not found: '{name}'")]
    NotFound { name: String },

    /// A file named in a conversion request is not in the upload directory.
    #[error("Source image '{name}' is missing from the upload directory")]
    SourceMissing { name: String },

    // ── Processing errors ─────────────────────────────────────────────────
    /// The image could not be decoded or re-encoded.
    #[error("Failed to process image '{name}': {source}")]
    Image {
        name: String,
        #[source]
        source: image::ImageError,
    },

    /// lopdf failed while building, merging or serialising the document.
    #[error("PDF assembly failed: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Reading, writing or deleting inside the upload directory failed.
    #[error("Storage I/O failed for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`ImgPdfError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    SourceMissing,
    Internal,
}

impl ImgPdfError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImgPdfError::Validation(_) => ErrorKind::Validation,
            ImgPdfError::NotFound { .. } => ErrorKind::NotFound,
            ImgPdfError::SourceMissing { .. } => ErrorKind::SourceMissing,
            ImgPdfError::Image { .. }
            | ImgPdfError::Pdf(_)
            | ImgPdfError::Io { .. }
            | ImgPdfError::InvalidConfig(_)
            | ImgPdfError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Wrap an I/O error, turning `ErrorKind::NotFound` into [`ImgPdfError::NotFound`].
    pub(crate) fn from_io(name: &str, path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            ImgPdfError::NotFound {
                name: name.to_string(),
            }
        } else {
            ImgPdfError::Io { path, source }
        }
    }
}
