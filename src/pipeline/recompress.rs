//! JPEG recompression: stored bytes → `DynamicImage` → JPEG at a given quality.
//!
//! The JPEG encoder only accepts 8-bit grayscale or RGB pixels. Grayscale
//! sources stay grayscale; everything else (alpha, 16-bit, palette-expanded
//! PNGs misnamed as `.jpg`) is flattened to 8-bit RGB first.

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// Decode an image from memory, guessing the format from its magic bytes.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, image::ImageError> {
    image::load_from_memory(bytes)
}

/// Convert to a colour model the JPEG encoder accepts.
pub fn normalize_color(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Re-encode `img` as a JPEG at `quality` (clamped to 1–100).
pub fn compress_image(img: DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let img = normalize_color(img);
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    img.write_with_encoder(encoder)?;
    debug!(
        "Recompressed {}x{} image at q{} → {} bytes",
        img.width(),
        img.height(),
        quality,
        buf.len()
    );
    Ok(buf)
}

/// Decode `bytes` and re-encode them at `quality`.
pub fn recompress(bytes: &[u8], quality: u8) -> Result<Vec<u8>, image::ImageError> {
    compress_image(decode(bytes)?, quality)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn noisy_jpeg(w: u32, h: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8])
        });
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, 95))
            .unwrap();
        buf
    }

    #[test]
    fn output_is_jpeg_with_same_dimensions() {
        let src = noisy_jpeg(40, 30);
        let out = recompress(&src, 60).unwrap();
        assert_eq!(
            image::guess_format(&out).unwrap(),
            ImageFormat::Jpeg
        );
        let back = decode(&out).unwrap();
        assert_eq!((back.width(), back.height()), (40, 30));
    }

    #[test]
    fn lower_quality_is_smaller() {
        let src = noisy_jpeg(128, 128);
        let high = recompress(&src, 95).unwrap();
        let low = recompress(&src, 40).unwrap();
        assert!(low.len() < high.len(), "{} vs {}", low.len(), high.len());
    }

    #[test]
    fn alpha_is_flattened_to_rgb() {
        let rgba = RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 128]));
        let mut png = Vec::new();
        DynamicImage::ImageRgba8(rgba)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let out = recompress(&png, 85).unwrap();
        assert!(matches!(decode(&out).unwrap(), DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn grayscale_stays_grayscale() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(4, 4, image::Luma([90])));
        assert!(matches!(normalize_color(gray), DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(recompress(b"not an image at all", 60).is_err());
    }
}
