//! Image XObject embedding

use crate::{PdfError, Result};
use image::{DynamicImage, ImageReader};
use lopdf::{Dictionary, Stream};
use std::io::Cursor;

impl From<image::ImageError> for PdfError {
    fn from(err: image::ImageError) -> Self {
        PdfError::ImageError(err.to_string())
    }
}

/// Detected raster format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// Detect image format from magic bytes
pub fn detect_format(data: &[u8]) -> Result<ImageFormat> {
    if data.len() < 8 {
        return Err(PdfError::ImageError("image data too short".to_string()));
    }
    if data[0] == 0xFF && data[1] == 0xD8 && data[2] == 0xFF {
        return Ok(ImageFormat::Jpeg);
    }
    if data[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        return Ok(ImageFormat::Png);
    }
    Err(PdfError::ImageError("unsupported image format".to_string()))
}

/// Image XObject ready for PDF embedding
#[derive(Debug, Clone)]
pub struct ImageXObject {
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
    /// "DeviceRGB" or "DeviceGray"
    pub color_space: String,
    /// "DCTDecode" for JPEG passthrough, "FlateDecode" for PNG
    pub filter: String,
    /// Encoded sample data
    pub data: Vec<u8>,
}

impl ImageXObject {
    /// Build an XObject from JPEG or PNG file bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        match detect_format(data)? {
            ImageFormat::Jpeg => Self::from_jpeg(data),
            ImageFormat::Png => Self::from_png(data),
        }
    }

    /// JPEG embeds directly under DCTDecode
    pub fn from_jpeg(data: &[u8]) -> Result<Self> {
        let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        let (width, height) = reader.into_dimensions()?;

        Ok(Self {
            width,
            height,
            color_space: "DeviceRGB".to_string(),
            filter: "DCTDecode".to_string(),
            data: data.to_vec(),
        })
    }

    /// PNG decodes to raw samples re-compressed with FlateDecode
    ///
    /// Alpha is blended against white; PDF image XObjects carry no
    /// alpha channel without a separate soft mask.
    pub fn from_png(data: &[u8]) -> Result<Self> {
        let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        let image = reader.decode()?;
        let (width, height) = (image.width(), image.height());

        let (raw, color_space) = match &image {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageLuma16(_) => {
                (image.to_luma8().into_raw(), "DeviceGray")
            }
            DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLumaA16(_) => {
                let la = image.to_luma_alpha8();
                let mut gray = Vec::with_capacity((width * height) as usize);
                for px in la.pixels() {
                    let alpha = f32::from(px[1]) / 255.0;
                    gray.push((f32::from(px[0]) * alpha + 255.0 * (1.0 - alpha)) as u8);
                }
                (gray, "DeviceGray")
            }
            DynamicImage::ImageRgba8(_) | DynamicImage::ImageRgba16(_) => {
                let rgba = image.to_rgba8();
                let mut rgb = Vec::with_capacity((width * height * 3) as usize);
                for px in rgba.pixels() {
                    let alpha = f32::from(px[3]) / 255.0;
                    for ch in 0..3 {
                        rgb.push((f32::from(px[ch]) * alpha + 255.0 * (1.0 - alpha)) as u8);
                    }
                }
                (rgb, "DeviceRGB")
            }
            _ => (image.to_rgb8().into_raw(), "DeviceRGB"),
        };

        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        std::io::Write::write_all(&mut encoder, &raw)?;
        let data = encoder.finish()?;

        Ok(Self {
            width,
            height,
            color_space: color_space.to_string(),
            filter: "FlateDecode".to_string(),
            data,
        })
    }

    /// Convert to a lopdf stream object
    pub fn to_pdf_stream(&self) -> Stream {
        let mut dict = Dictionary::new();
        dict.set("Type", lopdf::Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", lopdf::Object::Name(b"Image".to_vec()));
        dict.set("Width", i64::from(self.width));
        dict.set("Height", i64::from(self.height));
        dict.set(
            "ColorSpace",
            lopdf::Object::Name(self.color_space.as_bytes().to_vec()),
        );
        dict.set("BitsPerComponent", 8);
        dict.set(
            "Filter",
            lopdf::Object::Name(self.filter.as_bytes().to_vec()),
        );
        dict.set("Length", self.data.len() as i64);
        Stream::new(dict, self.data.clone())
    }
}

/// Operators drawing an image resource at a position
///
/// `x`/`y` are PDF coordinates (origin bottom-left) of the image's
/// lower-left corner; `width`/`height` are in points.
pub fn generate_image_operators(
    image_name: &str,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
) -> Vec<u8> {
    format!("q\n{width} 0 0 {height} {x} {y} cm\n/{image_name} Do\nQ\n").into_bytes()
}
