//! # imgpdf
//!
//! Upload JPEG images over HTTP, preview how much recompression would save,
//! and merge them into a single downloadable PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! client
//!  │
//!  ├─ POST /upload        validate extension, store as <uuid>_<name>
//!  ├─ POST /preview-size  recompress in memory, report byte savings
//!  ├─ POST /remove-file   delete one stored image
//!  └─ POST /convert       recompress → one PDF page per image → merge
//!                         → delete sources → converted.pdf
//! ```
//!
//! The upload directory is the only state. Nothing is cached, nothing is
//! retried, and every request either fully succeeds or reports one error.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imgpdf::{server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::builder().upload_dir("uploads").build()?;
//!     let state = server::AppState::init(config).await?;
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     server::serve(listener, state, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Quality Tiers
//!
//! | Tier | JPEG quality |
//! |------|--------------|
//! | `none` | 100 |
//! | `low` | 85 |
//! | `medium` | 60 (default, also used for unknown values) |
//! | `high` | 40 |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `imgpdf` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod estimate;
pub mod output;
pub mod pipeline;
pub mod server;
pub mod storage;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Orientation, PageLayout, PageSize, QualityTier, ServerConfig, ServerConfigBuilder};
pub use convert::{convert, ConvertRequest};
pub use error::{ErrorKind, ImgPdfError};
pub use estimate::estimate_savings;
pub use output::{ConversionOutput, ConversionStats, SizeEstimate};
pub use storage::{Storage, StoredImage};
pub use upload::{accept_upload, remove_upload};
