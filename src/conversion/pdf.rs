//! Single-page PDF output
//!
//! The page is one nominal A4 width wide and as tall as the image's aspect ratio demands, so
//! the image fills the page edge to edge.

use std::io::Write;

use flate2::{Compression, write::ZlibEncoder};
use image::ImageFormat;
use lopdf::{
    Document, Object, Stream,
    content::{Content, Operation},
    dictionary,
};
use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::conversion::EncodeError;

/// A4 width in points.
pub const NOMINAL_PAGE_WIDTH: Decimal = Decimal::from_parts(59528, 0, 0, false, 2);

const IMAGE_NAME: &str = "Im0";

/// Page dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    /// Page width
    pub width: Decimal,

    /// Page height
    pub height: Decimal,
}

impl PageLayout {
    /// Layout for an image of the given pixel size.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::EmptyImage`] if either dimension is zero.
    pub fn for_image(width: u32, height: u32) -> Result<Self, EncodeError> {
        if width == 0 || height == 0 {
            return Err(EncodeError::EmptyImage);
        }

        Ok(Self {
            width: NOMINAL_PAGE_WIDTH,
            height: NOMINAL_PAGE_WIDTH * Decimal::from(height) / Decimal::from(width),
        })
    }

    fn points(self) -> Result<(f32, f32), EncodeError> {
        match (self.width.to_f32(), self.height.to_f32()) {
            (Some(width), Some(height)) => Ok((width, height)),
            _ => Err(EncodeError::EmptyImage),
        }
    }
}

/// Build a one-page PDF holding the given PNG at full page size.
///
/// # Errors
///
/// Returns an [`EncodeError`] if the PNG cannot be read back or the document cannot be written.
pub fn single_page(png: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let rgba = image::load_from_memory_with_format(png, ImageFormat::Png)?.to_rgba8();
    let (pixel_width, pixel_height) = rgba.dimensions();
    let (width, height) = PageLayout::for_image(pixel_width, pixel_height)?.points()?;

    let mut rgb = Vec::with_capacity(rgba.as_raw().len() / 4 * 3);
    let mut alpha = Vec::with_capacity(rgba.as_raw().len() / 4);

    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(pixel_width),
        "Height" => i64::from(pixel_height),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };

    if alpha.iter().any(|&a| a < u8::MAX) {
        let mask = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(pixel_width),
            "Height" => i64::from(pixel_height),
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        };
        let mask_id = doc.add_object(Stream::new(mask, deflate(&alpha)?));

        image_dict.set("SMask", mask_id);
    }

    let image_id = doc.add_object(Stream::new(image_dict, deflate(&rgb)?));

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    0.into(),
                    0.into(),
                    height.into(),
                    0.into(),
                    0.into(),
                ],
            ),
            Operation::new("Do", vec![IMAGE_NAME.into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                IMAGE_NAME => image_id,
            },
        },
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)?;

    Ok(out)
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;

    Ok(encoder.finish()?)
}
