//! Configuration types for the image-to-PDF service.
//!
//! Process-wide settings live in [`ServerConfig`], built once at startup via
//! its [`ServerConfigBuilder`] and shared read-only with every handler.
//! Per-request knobs ([`QualityTier`], [`PageLayout`]) are parsed leniently
//! from client strings: unknown values fall back to defaults instead of
//! failing the request.

use crate::error::ImgPdfError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Default request-body cap: 16 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Resolution hint used when page geometry is derived from image pixels.
pub const DEFAULT_DPI: u32 = 300;

/// Configuration for the service.
///
/// # Example
/// ```rust
/// use imgpdf::ServerConfig;
///
/// let config = ServerConfig::builder()
///     .upload_dir("/tmp/imgpdf-uploads")
///     .max_body_bytes(8 * 1024 * 1024)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 300);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory holding uploaded images. Created on startup. Default: `uploads`.
    pub upload_dir: PathBuf,

    /// Maximum request body size in bytes. Default: 16 MiB.
    pub max_body_bytes: usize,

    /// DPI used to turn image pixels into page points when the page layout
    /// is not applied. Range: 72–1200. Default: 300.
    pub dpi: u32,

    /// Apply the requested page size, orientation and margin to each page
    /// instead of sizing the page from the image. Default: false.
    pub apply_page_layout: bool,

    /// Delete uploads older than this in a background sweep. Default: None (never).
    pub sweep_after: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            dpi: DEFAULT_DPI,
            apply_page_layout: false,
            sweep_after: None,
        }
    }
}

impl ServerConfig {
    /// Create a new builder for `ServerConfig`.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.upload_dir = dir.into();
        self
    }

    pub fn max_body_bytes(mut self, bytes: usize) -> Self {
        self.config.max_body_bytes = bytes;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn apply_page_layout(mut self, v: bool) -> Self {
        self.config.apply_page_layout = v;
        self
    }

    pub fn sweep_after(mut self, age: Option<Duration>) -> Self {
        self.config.sweep_after = age;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServerConfig, ImgPdfError> {
        let c = &self.config;
        if c.upload_dir.as_os_str().is_empty() {
            return Err(ImgPdfError::InvalidConfig(
                "Upload directory must not be empty".into(),
            ));
        }
        if c.max_body_bytes < 1024 {
            return Err(ImgPdfError::InvalidConfig(format!(
                "Body limit must be at least 1024 bytes, got {}",
                c.max_body_bytes
            )));
        }
        if c.dpi < 72 || c.dpi > 1200 {
            return Err(ImgPdfError::InvalidConfig(format!(
                "DPI must be 72–1200, got {}",
                c.dpi
            )));
        }
        if c.sweep_after.is_some_and(|d| d.is_zero()) {
            return Err(ImgPdfError::InvalidConfig(
                "Sweep age must be greater than zero".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Named compression bucket mapped to a JPEG encoder quality.
///
/// | Tier | Quality |
/// |------|---------|
/// | `none` | 100 |
/// | `low` | 85 |
/// | `medium` | 60 (default) |
/// | `high` | 40 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Re-encode at quality 100.
    #[serde(rename = "none")]
    Uncompressed,
    Low,
    #[default]
    Medium,
    High,
}

impl QualityTier {
    /// Parse a client-supplied tier. Absent or unrecognised values yield `Medium`.
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("none") => QualityTier::Uncompressed,
            Some("low") => QualityTier::Low,
            Some("medium") => QualityTier::Medium,
            Some("high") => QualityTier::High,
            _ => QualityTier::Medium,
        }
    }

    /// JPEG encoder quality on the 0–100 scale.
    pub fn quality(self) -> u8 {
        match self {
            QualityTier::Uncompressed => 100,
            QualityTier::Low => 85,
            QualityTier::Medium => 60,
            QualityTier::High => 40,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityTier::Uncompressed => "none",
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
        }
    }
}

/// Named page-size preset. Dimensions are portrait, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSize {
    A3,
    #[default]
    A4,
    A5,
    Letter,
    Legal,
}

impl PageSize {
    /// Parse a preset name case-insensitively. Unknown names yield `A4`.
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("a3") => PageSize::A3,
            Some("a5") => PageSize::A5,
            Some("letter") => PageSize::Letter,
            Some("legal") => PageSize::Legal,
            _ => PageSize::A4,
        }
    }

    /// Portrait `(width, height)` in points.
    pub fn points(self) -> (f32, f32) {
        match self {
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A4 => (595.28, 841.89),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    /// Unknown values yield `Portrait`.
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("landscape") => Orientation::Landscape,
            _ => Orientation::Portrait,
        }
    }
}

/// Page size, orientation and margin requested for a conversion.
///
/// Only applied when [`ServerConfig::apply_page_layout`] is set; otherwise
/// each page is sized from its image at [`ServerConfig::dpi`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub size: PageSize,
    pub orientation: Orientation,
    /// Margin on every side, in points. Default: 20.
    pub margin: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            orientation: Orientation::Portrait,
            margin: 20.0,
        }
    }
}

impl PageLayout {
    /// Build a layout from optional request fields. Negative or non-finite
    /// margins fall back to the default.
    pub fn from_request(
        page_size: Option<&str>,
        orientation: Option<&str>,
        margin: Option<f64>,
    ) -> Self {
        let margin = margin
            .filter(|m| m.is_finite() && *m >= 0.0)
            .map(|m| m as f32)
            .unwrap_or(20.0);
        Self {
            size: PageSize::parse(page_size),
            orientation: Orientation::parse(orientation),
            margin,
        }
    }

    /// Oriented `(width, height)` in points.
    pub fn dimensions(&self) -> (f32, f32) {
        let (w, h) = self.size.points();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

/// Read an optional string field, treating any other JSON type as absent.
///
/// For use with `#[serde(default, deserialize_with = "...")]` on request
/// bodies, so a mistyped knob falls back to its default.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Read an optional number field. Numeric strings are accepted; any other
/// JSON type is treated as absent.
pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}
