//! Pipeline stages for image-to-PDF conversion.
//!
//! Each submodule implements exactly one transformation step, synchronously.
//! The async entry points in [`crate::convert`] and [`crate::estimate`] run
//! them inside `spawn_blocking` because JPEG codecs and PDF serialisation are
//! CPU-bound.
//!
//! ## Data Flow
//!
//! ```text
//! stored bytes ──▶ recompress ──▶ page ──▶ merge
//!  (JPEG)           (JPEG @ q)    (1-page PDF)  (N-page PDF)
//! ```
//!
//! 1. [`recompress`]: decode, normalise colour, re-encode at the tier quality
//! 2. [`page`]: wrap one JPEG in a single-page PDF document
//! 3. [`merge`]: concatenate single-page documents in input order

pub mod merge;
pub mod page;
pub mod recompress;
