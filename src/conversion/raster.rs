//! Raster encoding

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, codecs::jpeg::JpegEncoder};

use crate::conversion::{EncodeError, TargetFormat, pdf};

/// JPEG quality used for every JPG download
pub const JPEG_QUALITY: u8 = 90;

/// Encodes a decoded image into a download format.
pub trait AssetEncoder: Send + Sync {
    /// Encode `image` as `format`.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodeError`] if the image cannot be encoded.
    fn encode(&self, image: &DynamicImage, format: TargetFormat) -> Result<Vec<u8>, EncodeError>;
}

/// Encoder backed by the `image` codecs, with PDFs built around a PNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterEncoder;

impl AssetEncoder for RasterEncoder {
    fn encode(&self, image: &DynamicImage, format: TargetFormat) -> Result<Vec<u8>, EncodeError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(EncodeError::EmptyImage);
        }

        match format {
            TargetFormat::Png => encode_png(image),
            TargetFormat::Jpg => encode_jpeg(image),
            TargetFormat::Pdf => pdf::single_page(&encode_png(image)?),
        }
    }
}

/// Encode as PNG, keeping the alpha channel.
///
/// # Errors
///
/// Returns [`EncodeError::Image`] if the PNG codec fails.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();

    DynamicImage::ImageRgba8(image.to_rgba8())
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;

    Ok(out)
}

/// Encode as JPEG at [`JPEG_QUALITY`], compositing onto white first.
///
/// # Errors
///
/// Returns [`EncodeError::Image`] if the JPEG codec fails.
pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();

    flatten_on_white(image)
        .write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))?;

    Ok(out)
}

/// Alpha-composite the image over an opaque white canvas.
pub fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();

    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let over_white = |channel: u8| {
            let blended = (u16::from(channel) * alpha + 255 * (255 - alpha) + 127) / 255;
            u8::try_from(blended).unwrap_or(u8::MAX)
        };

        Rgb([over_white(r), over_white(g), over_white(b)])
    })
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};
    use testresult::TestResult;

    use super::*;

    fn transparent(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0])))
    }

    #[test]
    fn flatten_replaces_transparency_with_white() {
        let mut image = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
        image.put_pixel(1, 0, Rgba([255, 0, 0, 255]));

        let flat = flatten_on_white(&DynamicImage::ImageRgba8(image));

        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn half_transparent_pixels_blend_towards_white() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128]));

        let flat = flatten_on_white(&DynamicImage::ImageRgba8(image));

        assert_eq!(flat.get_pixel(0, 0), &Rgb([127, 127, 127]));
    }

    #[test]
    fn jpg_output_is_opaque() -> TestResult {
        let bytes = RasterEncoder.encode(&transparent(8, 8), TargetFormat::Jpg)?;
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)?;

        assert!(!decoded.color().has_alpha());

        let [r, g, b] = decoded.to_rgb8().get_pixel(4, 4).0;
        assert!(r > 245 && g > 245 && b > 245);

        Ok(())
    }

    #[test]
    fn png_output_keeps_transparency() -> TestResult {
        let bytes = RasterEncoder.encode(&transparent(3, 2), TargetFormat::Png)?;
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?;

        assert_eq!((decoded.width(), decoded.height()), (3, 2));
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0).0[3], 0);

        Ok(())
    }

    #[test]
    fn empty_images_are_rejected() {
        let result = RasterEncoder.encode(&transparent(0, 0), TargetFormat::Png);

        assert!(matches!(result, Err(EncodeError::EmptyImage)));
    }
}
