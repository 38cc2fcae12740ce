//! Result types returned by the estimator and the conversion pipeline.

use serde::{Deserialize, Serialize};

/// Projected effect of recompressing a set of stored images.
///
/// Serialised with the field names the browser client expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeEstimate {
    /// Sum of on-disk sizes of the files that exist.
    pub original_size: u64,
    /// Sum of recompressed sizes of the same files.
    pub compressed_size: u64,
    /// `(original − compressed) / original × 100`, or 0 when nothing was measured.
    /// Negative when recompression grows the files.
    pub savings: f64,
}

impl SizeEstimate {
    pub fn from_totals(original_size: u64, compressed_size: u64) -> Self {
        let savings = if original_size > 0 {
            (original_size as f64 - compressed_size as f64) / original_size as f64 * 100.0
        } else {
            0.0
        };
        Self {
            original_size,
            compressed_size,
            savings,
        }
    }
}

/// The merged document plus bookkeeping about how it was produced.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// Serialised PDF, one page per input image, in input order.
    pub pdf: Vec<u8>,
    pub stats: ConversionStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub page_count: usize,
    /// Total bytes of the stored source images.
    pub source_bytes: u64,
    /// Total bytes of the recompressed JPEGs embedded in the PDF.
    pub embedded_bytes: u64,
    /// Source files deleted after the merge.
    pub removed_files: usize,
    pub duration_ms: u64,
}
