//! Compression estimator: how much would recompressing these uploads save?
//!
//! Read-only. Every listed file that exists is decoded and re-encoded in
//! memory at the tier's quality; the result is measured and discarded.
//! Names that do not resolve to a stored file are skipped silently and
//! contribute nothing to either total.

use crate::config::QualityTier;
use crate::error::ImgPdfError;
use crate::output::SizeEstimate;
use crate::pipeline::recompress;
use crate::storage::Storage;
use tracing::{debug, info};

/// Estimate total original and recompressed sizes for `files`.
pub async fn estimate_savings(
    storage: &Storage,
    files: &[String],
    tier: QualityTier,
) -> Result<SizeEstimate, ImgPdfError> {
    let quality = tier.quality();
    let mut original_total: u64 = 0;
    let mut compressed_total: u64 = 0;

    for name in files {
        let bytes = match storage.read(name).await {
            Ok(b) => b,
            Err(ImgPdfError::NotFound { .. }) => {
                debug!("Skipping missing file in estimate: {}", name);
                continue;
            }
            Err(e) => return Err(e),
        };

        let original = bytes.len() as u64;
        let owned = name.clone();
        let compressed = tokio::task::spawn_blocking(move || {
            recompress::recompress(&bytes, quality)
                .map(|buf| buf.len() as u64)
                .map_err(|source| ImgPdfError::Image {
                    name: owned,
                    source,
                })
        })
        .await
        .map_err(|e| ImgPdfError::Internal(format!("Estimate task panicked: {}", e)))??;

        debug!("{}: {} → {} bytes at q{}", name, original, compressed, quality);
        original_total += original;
        compressed_total += compressed;
    }

    let estimate = SizeEstimate::from_totals(original_total, compressed_total);
    info!(
        "Estimate ({} file(s), tier {}): {} → {} bytes ({:.1}% saved)",
        files.len(),
        tier.as_str(),
        estimate.original_size,
        estimate.compressed_size,
        estimate.savings
    );
    Ok(estimate)
}
