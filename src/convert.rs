//! Conversion entry point: stored JPEGs → one merged PDF.
//!
//! The request is all-or-nothing with respect to output: any missing file,
//! undecodable image or PDF error aborts before a single byte is returned,
//! and in that case no stored file is deleted either. Only after the merged
//! document has been fully serialised are the sources removed.

use crate::config::{lenient_number, lenient_string, PageLayout, QualityTier, ServerConfig};
use crate::error::ImgPdfError;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::merge::MergeAccumulator;
use crate::pipeline::page::{self, PageError, PageGeometry};
use crate::pipeline::recompress;
use crate::storage::Storage;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Attachment name used for the downloaded document.
pub const OUTPUT_FILENAME: &str = "converted.pdf";

/// A conversion request as parsed from the client.
#[derive(Debug, Clone, Default)]
pub struct ConvertRequest {
    /// Stored names, in page order.
    pub files: Vec<String>,
    pub tier: QualityTier,
    pub layout: PageLayout,
}

/// Raw JSON body of a conversion request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertBody {
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub page_size: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub orientation: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub margins: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub compression: Option<String>,
}

impl From<ConvertBody> for ConvertRequest {
    fn from(body: ConvertBody) -> Self {
        Self {
            layout: PageLayout::from_request(
                body.page_size.as_deref(),
                body.orientation.as_deref(),
                body.margins,
            ),
            tier: QualityTier::parse(body.compression.as_deref()),
            files: body.files,
        }
    }
}

/// Convert the named uploads into one PDF and delete them.
///
/// An empty `files` list yields a valid zero-page PDF.
///
/// # Errors
/// - [`ImgPdfError::SourceMissing`] when a named file is not stored
/// - [`ImgPdfError::Image`] / [`ImgPdfError::Pdf`] when processing fails
pub async fn convert(
    storage: &Storage,
    request: &ConvertRequest,
    config: &ServerConfig,
) -> Result<ConversionOutput, ImgPdfError> {
    let start = Instant::now();
    info!(
        "Starting conversion: {} file(s), tier {}",
        request.files.len(),
        request.tier.as_str()
    );

    // ── Step 1: Load sources ─────────────────────────────────────────────
    let mut sources = Vec::with_capacity(request.files.len());
    for name in &request.files {
        let bytes = storage.read(name).await.map_err(|e| match e {
            ImgPdfError::NotFound { name } => ImgPdfError::SourceMissing { name },
            other => other,
        })?;
        sources.push((name.clone(), bytes));
    }

    // ── Step 2: Choose page geometry ─────────────────────────────────────
    let geometry = if config.apply_page_layout {
        PageGeometry::Fitted(request.layout)
    } else {
        debug!(
            "Page layout {:?} received but not applied; sizing pages at {} DPI",
            request.layout, config.dpi
        );
        PageGeometry::Native {
            dpi: config.dpi as f32,
        }
    };

    // ── Step 3: Recompress, synthesise, merge ────────────────────────────
    let quality = request.tier.quality();
    let (pdf, mut stats) =
        tokio::task::spawn_blocking(move || build_pdf(sources, quality, &geometry))
            .await
            .map_err(|e| ImgPdfError::Internal(format!("Conversion task panicked: {}", e)))??;

    // ── Step 4: Remove sources ───────────────────────────────────────────
    for name in &request.files {
        match storage.remove(name).await {
            Ok(()) => stats.removed_files += 1,
            Err(e) => warn!("Cleanup after conversion failed for {}: {}", name, e),
        }
    }

    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Conversion complete: {} page(s), {} → {} bytes embedded, {} byte PDF, {}ms",
        stats.page_count,
        stats.source_bytes,
        stats.embedded_bytes,
        pdf.len(),
        stats.duration_ms
    );

    Ok(ConversionOutput { pdf, stats })
}

/// Blocking core of the conversion: every source becomes one page, in order.
pub fn build_pdf(
    sources: Vec<(String, Vec<u8>)>,
    quality: u8,
    geometry: &PageGeometry,
) -> Result<(Vec<u8>, ConversionStats), ImgPdfError> {
    let mut merger = MergeAccumulator::new();
    let mut stats = ConversionStats::default();

    for (name, bytes) in sources {
        let jpeg = recompress::recompress(&bytes, quality).map_err(|source| {
            ImgPdfError::Image {
                name: name.clone(),
                source,
            }
        })?;

        let doc = page::synthesize_page(&jpeg, geometry).map_err(|e| match e {
            PageError::Decode(source) => ImgPdfError::Image {
                name: name.clone(),
                source,
            },
            PageError::Pdf(e) => ImgPdfError::Pdf(e),
        })?;

        debug!("{}: {} → {} bytes", name, bytes.len(), jpeg.len());
        stats.source_bytes += bytes.len() as u64;
        stats.embedded_bytes += jpeg.len() as u64;
        merger.append(doc);
    }

    if merger.is_empty() {
        debug!("No pages to merge; writing an empty document");
    }
    stats.page_count = merger.len();
    let pdf = merger.finish()?;
    Ok((pdf, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};
    use lopdf::{Document, Object};
    use tempfile::TempDir;

    fn jpeg_of_width(px_w: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(px_w, 120, Rgb([30, 60, 90])));
        recompress::compress_image(img, 90).unwrap()
    }

    async fn setup() -> (TempDir, Storage, ServerConfig) {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path()).await.unwrap();
        let config = ServerConfig::builder()
            .upload_dir(dir.path())
            .build()
            .unwrap();
        (dir, storage, config)
    }

    fn request(files: &[&str]) -> ConvertRequest {
        ConvertRequest {
            files: files.iter().map(|s| s.to_string()).collect(),
            ..ConvertRequest::default()
        }
    }

    #[tokio::test]
    async fn converts_in_order_and_cleans_up() {
        let (_dir, storage, config) = setup().await;
        storage.save("b.jpg", jpeg_of_width(600)).await.unwrap();
        storage.save("a.jpg", jpeg_of_width(300)).await.unwrap();

        let out = convert(&storage, &request(&["b.jpg", "a.jpg"]), &config)
            .await
            .unwrap();
        assert_eq!(out.stats.page_count, 2);
        assert_eq!(out.stats.removed_files, 2);

        let doc = Document::load_mem(&out.pdf).unwrap();
        let widths: Vec<f32> = doc
            .get_pages()
            .values()
            .map(|&id| {
                let page = doc.get_object(id).and_then(Object::as_dict).unwrap();
                page.get(b"MediaBox").and_then(Object::as_array).unwrap()[2]
                    .as_float()
                    .unwrap()
            })
            .collect();
        assert_eq!(widths, vec![144.0, 72.0]);

        assert!(!storage.contains("a.jpg").await);
        assert!(!storage.contains("b.jpg").await);
    }

    #[tokio::test]
    async fn missing_source_aborts_without_deleting() {
        let (_dir, storage, config) = setup().await;
        storage.save("keep.jpg", jpeg_of_width(300)).await.unwrap();

        let err = convert(&storage, &request(&["keep.jpg", "never.jpg"]), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ImgPdfError::SourceMissing { ref name } if name == "never.jpg"));
        assert!(storage.contains("keep.jpg").await);
    }

    #[tokio::test]
    async fn corrupt_source_aborts_without_deleting() {
        let (_dir, storage, config) = setup().await;
        storage.save("ok.jpg", jpeg_of_width(300)).await.unwrap();
        storage.save("bad.jpg", b"garbage".to_vec()).await.unwrap();

        let err = convert(&storage, &request(&["ok.jpg", "bad.jpg"]), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ImgPdfError::Image { ref name, .. } if name == "bad.jpg"));
        assert!(storage.contains("ok.jpg").await);
        assert!(storage.contains("bad.jpg").await);
    }

    #[tokio::test]
    async fn empty_request_yields_zero_page_pdf() {
        let (_dir, storage, config) = setup().await;
        let out = convert(&storage, &request(&[]), &config).await.unwrap();
        assert_eq!(out.stats.page_count, 0);
        assert_eq!(out.stats.removed_files, 0);
        let doc = Document::load_mem(&out.pdf).unwrap();
        assert!(doc.get_pages().is_empty());
    }

    #[tokio::test]
    async fn applied_layout_uses_paper_size() {
        let (dir, storage, _) = setup().await;
        let config = ServerConfig::builder()
            .upload_dir(dir.path())
            .apply_page_layout(true)
            .build()
            .unwrap();
        storage.save("x.jpg", jpeg_of_width(300)).await.unwrap();

        let mut req = request(&["x.jpg"]);
        req.layout = PageLayout::from_request(Some("Letter"), Some("landscape"), Some(20.0));
        let out = convert(&storage, &req, &config).await.unwrap();

        let doc = Document::load_mem(&out.pdf).unwrap();
        let id = *doc.get_pages().values().next().unwrap();
        let page = doc.get_object(id).and_then(Object::as_dict).unwrap();
        let media_box = page.get(b"MediaBox").and_then(Object::as_array).unwrap();
        assert_eq!(media_box[2].as_float().unwrap(), 792.0);
        assert_eq!(media_box[3].as_float().unwrap(), 612.0);
    }

    #[test]
    fn body_defaults() {
        let body: ConvertBody = serde_json::from_str(r#"{"files": ["a.jpg"]}"#).unwrap();
        let req = ConvertRequest::from(body);
        assert_eq!(req.files, vec!["a.jpg"]);
        assert_eq!(req.tier, QualityTier::Medium);
        assert_eq!(req.layout, PageLayout::default());
    }

    #[test]
    fn body_reads_camel_case_fields() {
        let body: ConvertBody = serde_json::from_str(
            r#"{"files": [], "pageSize": "A3", "orientation": "landscape", "margins": 5, "compression": "high"}"#,
        )
        .unwrap();
        let req = ConvertRequest::from(body);
        assert_eq!(req.tier, QualityTier::High);
        assert_eq!(req.layout.dimensions(), (1190.55, 841.89));
        assert_eq!(req.layout.margin, 5.0);
    }
}
