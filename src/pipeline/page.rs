//! Page synthesis: one JPEG → one single-page PDF document.
//!
//! The JPEG bytes are embedded verbatim as a `DCTDecode` image XObject, so
//! the page carries exactly the recompressed data and nothing is re-encoded
//! a second time.
//!
//! Page geometry comes from a [`PageGeometry`]:
//!
//! * [`PageGeometry::Native`] sizes the page to the image at a DPI hint
//!   (points = pixels ÷ DPI × 72) and fills it edge to edge.
//! * [`PageGeometry::Fitted`] uses the requested paper size and orientation,
//!   scales the image to fit inside the margins, and centres it.

use crate::config::PageLayout;
use crate::pipeline::recompress;
use image::ColorType;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tracing::debug;

/// How a page's MediaBox and image placement are chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageGeometry {
    Native { dpi: f32 },
    Fitted(PageLayout),
}

/// Where the image lands on the page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub page_width: f32,
    pub page_height: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PageGeometry {
    /// Compute the placement for an image of `px_w` × `px_h` pixels.
    pub fn place(&self, px_w: u32, px_h: u32) -> Placement {
        let (px_w, px_h) = (px_w as f32, px_h as f32);
        match *self {
            PageGeometry::Native { dpi } => {
                let width = px_w * 72.0 / dpi;
                let height = px_h * 72.0 / dpi;
                Placement {
                    page_width: width,
                    page_height: height,
                    x: 0.0,
                    y: 0.0,
                    width,
                    height,
                }
            }
            PageGeometry::Fitted(layout) => {
                let (page_width, page_height) = layout.dimensions();
                // Keep at least one point of drawable area on each axis.
                let margin = layout
                    .margin
                    .min((page_width - 1.0) / 2.0)
                    .min((page_height - 1.0) / 2.0)
                    .max(0.0);
                let avail_w = page_width - 2.0 * margin;
                let avail_h = page_height - 2.0 * margin;
                let scale = (avail_w / px_w).min(avail_h / px_h);
                let width = px_w * scale;
                let height = px_h * scale;
                Placement {
                    page_width,
                    page_height,
                    x: (page_width - width) / 2.0,
                    y: (page_height - height) / 2.0,
                    width,
                    height,
                }
            }
        }
    }
}

/// Build a one-page PDF showing `jpeg`.
///
/// The buffer is decoded once more to learn its dimensions and colour model,
/// which also rejects anything the encoder did not actually produce as JPEG.
pub fn synthesize_page(jpeg: &[u8], geometry: &PageGeometry) -> Result<Document, PageError> {
    let img = recompress::decode(jpeg).map_err(PageError::Decode)?;
    let (px_w, px_h) = (img.width(), img.height());
    let color_space = match img.color() {
        ColorType::L8 | ColorType::L16 => "DeviceGray",
        _ => "DeviceRGB",
    };

    let placement = geometry.place(px_w, px_h);
    debug!(
        "Page {}x{} px → {:.1}x{:.1} pt ({})",
        px_w, px_h, placement.page_width, placement.page_height, color_space
    );

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => px_w as i64,
            "Height" => px_h as i64,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8i64,
            "Filter" => "DCTDecode",
        },
        jpeg.to_vec(),
    ));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    placement.width.into(),
                    0i64.into(),
                    0i64.into(),
                    placement.height.into(),
                    placement.x.into(),
                    placement.y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            0i64.into(),
            0i64.into(),
            placement.page_width.into(),
            placement.page_height.into(),
        ],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    Ok(doc)
}

/// Failure while synthesising a page.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("recompressed buffer is not a decodable image: {0}")]
    Decode(#[source] image::ImageError),

    #[error(transparent)]
    Pdf(#[from] lopdf::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Orientation, PageSize};
    use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

    fn jpeg(img: DynamicImage) -> Vec<u8> {
        recompress::compress_image(img, 80).unwrap()
    }

    fn rgb_jpeg(w: u32, h: u32) -> Vec<u8> {
        jpeg(DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([200, 10, 10]))))
    }

    #[test]
    fn native_geometry_uses_dpi() {
        let p = PageGeometry::Native { dpi: 300.0 }.place(600, 300);
        assert_eq!((p.page_width, p.page_height), (144.0, 72.0));
        assert_eq!((p.x, p.y, p.width, p.height), (0.0, 0.0, 144.0, 72.0));
    }

    #[test]
    fn fitted_geometry_centres_inside_margins() {
        let layout = PageLayout {
            size: PageSize::Letter,
            orientation: Orientation::Portrait,
            margin: 36.0,
        };
        // Wide image: width-bound.
        let p = PageGeometry::Fitted(layout).place(1080, 540);
        assert_eq!((p.page_width, p.page_height), (612.0, 792.0));
        assert!((p.width - 540.0).abs() < 1e-3);
        assert!((p.height - 270.0).abs() < 1e-3);
        assert!((p.x - 36.0).abs() < 1e-3);
        assert!((p.y - 261.0).abs() < 1e-3);
    }

    #[test]
    fn fitted_geometry_survives_huge_margin() {
        let layout = PageLayout {
            margin: 10_000.0,
            ..PageLayout::default()
        };
        let p = PageGeometry::Fitted(layout).place(100, 100);
        assert!(p.width > 0.0 && p.height > 0.0);
        assert!(p.x >= 0.0 && p.y >= 0.0);
    }

    #[test]
    fn single_page_document() {
        let doc = synthesize_page(&rgb_jpeg(300, 600), &PageGeometry::Native { dpi: 300.0 })
            .unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);

        let page = doc
            .get_object(pages[&1])
            .and_then(Object::as_dict)
            .unwrap();
        let media_box = page.get(b"MediaBox").and_then(Object::as_array).unwrap();
        assert_eq!(media_box[2].as_float().unwrap(), 72.0);
        assert_eq!(media_box[3].as_float().unwrap(), 144.0);
    }

    #[test]
    fn gray_jpeg_uses_device_gray() {
        let bytes = jpeg(DynamicImage::ImageLuma8(GrayImage::from_pixel(10, 10, Luma([7]))));
        let doc = synthesize_page(&bytes, &PageGeometry::Native { dpi: 300.0 }).unwrap();
        let gray = doc.objects.values().any(|o| match o {
            Object::Stream(s) => matches!(
                s.dict.get(b"ColorSpace"),
                Ok(Object::Name(n)) if n == b"DeviceGray"
            ),
            _ => false,
        });
        assert!(gray);
    }

    #[test]
    fn rejects_non_image_bytes() {
        let err = synthesize_page(b"nope", &PageGeometry::Native { dpi: 300.0 }).unwrap_err();
        assert!(matches!(err, PageError::Decode(_)));
    }
}
