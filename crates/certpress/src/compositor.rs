//! Background raster compositing
//!
//! Flattens every image-type field onto the template background before
//! text rendering. Image fields are placed with x/y as raw pixel offsets
//! into the background, not through the fractional anchor model (see
//! the note on [`FieldDef::x`]).
//!
//! [`FieldDef::x`]: crate::schema::FieldDef::x

use crate::config::ImageStore;
use crate::schema::{FieldKind, ResolvedField};
use crate::{Error, Result};
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// The background after image fields have been drawn onto it
///
/// Owns its temporary file: dropping the raster removes it, on success
/// and failure paths alike. When no image fields needed compositing the
/// raster points at the original background and nothing is deleted.
#[derive(Debug)]
pub struct FlattenedRaster {
    source: RasterSource,
    width: u32,
    height: u32,
}

#[derive(Debug)]
enum RasterSource {
    /// Composited output in a temp file, deleted on drop
    Flattened(NamedTempFile),
    /// Untouched original background
    Background(PathBuf),
}

impl FlattenedRaster {
    pub fn path(&self) -> &Path {
        match &self.source {
            RasterSource::Flattened(file) => file.path(),
            RasterSource::Background(path) => path,
        }
    }

    /// Pixel width of the background (authoritative for coordinates)
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Pixel height of the background
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether compositing produced a new raster
    pub fn is_flattened(&self) -> bool {
        matches!(self.source, RasterSource::Flattened(_))
    }
}

/// Destination size for a source image constrained to a box
///
/// The ratio is `min(max_w/src_w, max_h/src_h, 1)`: images shrink to
/// fit but are never upscaled. A missing bound leaves that axis
/// unconstrained.
pub fn scaled_dimensions(
    src_width: u32,
    src_height: u32,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> (u32, u32) {
    let mut ratio: f64 = 1.0;
    if let Some(max_w) = max_width {
        ratio = ratio.min(f64::from(max_w) / f64::from(src_width));
    }
    if let Some(max_h) = max_height {
        ratio = ratio.min(f64::from(max_h) / f64::from(src_height));
    }
    (
        (f64::from(src_width) * ratio).round() as u32,
        (f64::from(src_height) * ratio).round() as u32,
    )
}

/// Composite image fields onto the background
///
/// Per-field load failures are logged and skipped; compositing always
/// continues with the remaining fields. An undecodable background is
/// fatal ([`Error::TemplateImageInvalid`]).
pub fn composite(
    background_path: &Path,
    fields: &[ResolvedField],
    images: &dyn ImageStore,
) -> Result<FlattenedRaster> {
    let mut background = image::open(background_path)
        .map_err(|e| Error::TemplateImageInvalid(format!("{}: {e}", background_path.display())))?;
    let (width, height) = (background.width(), background.height());

    let image_fields: Vec<&ResolvedField> = fields
        .iter()
        .filter(|f| f.def.kind == FieldKind::Image && f.def.display && !f.value.is_empty())
        .collect();

    if image_fields.is_empty() {
        return Ok(FlattenedRaster {
            source: RasterSource::Background(background_path.to_path_buf()),
            width,
            height,
        });
    }

    let mut drawn = 0usize;
    for field in &image_fields {
        match load_field_image(field, images) {
            Ok(overlay) => {
                let (w, h) = scaled_dimensions(
                    overlay.width(),
                    overlay.height(),
                    field.def.image_max_width,
                    field.def.image_max_height,
                );
                let resized = if (w, h) == (overlay.width(), overlay.height()) {
                    overlay
                } else {
                    overlay.resize_exact(w, h, FilterType::Lanczos3)
                };
                image::imageops::overlay(
                    &mut background,
                    &resized,
                    field.def.x as i64,
                    field.def.y as i64,
                );
                drawn += 1;
            }
            Err(reason) => {
                tracing::warn!(key = %field.def.key, %reason, "skipping image field");
            }
        }
    }
    tracing::debug!(drawn, total = image_fields.len(), "composited image fields");

    let file = NamedTempFile::with_suffix(".png")
        .map_err(|e| Error::TempFileError(e.to_string()))?;
    background
        .save_with_format(file.path(), image::ImageFormat::Png)
        .map_err(|e| Error::TempFileError(e.to_string()))?;

    Ok(FlattenedRaster {
        source: RasterSource::Flattened(file),
        width,
        height,
    })
}

fn load_field_image(
    field: &ResolvedField,
    images: &dyn ImageStore,
) -> std::result::Result<DynamicImage, String> {
    let bytes = images
        .load(&field.value)
        .map_err(|e| format!("load failed: {e}"))?;
    image::load_from_memory(&bytes).map_err(|e| format!("decode failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CoordMode, FieldDef, FieldStyle};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io;

    struct MemoryStore(HashMap<String, Vec<u8>>);

    impl ImageStore for MemoryStore {
        fn load(&self, reference: &str) -> io::Result<Vec<u8>> {
            self.0
                .get(reference)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, reference))
        }
    }

    fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let mut bytes = Vec::new();
        let img = image::RgbImage::from_pixel(width, height, image::Rgb(color));
        DynamicImage::ImageRgb8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        bytes
    }

    fn image_field(key: &str, value: &str, x: f64, y: f64) -> ResolvedField {
        ResolvedField {
            def: FieldDef {
                id: format!("id-{key}"),
                key: key.to_string(),
                label: String::new(),
                kind: FieldKind::Image,
                required: false,
                display: true,
                x,
                y,
                coord_mode: CoordMode::Unset,
                style: FieldStyle::default(),
                date_format: None,
                auto_kind: None,
                options: Vec::new(),
                image_max_width: Some(300),
                image_max_height: Some(300),
            },
            value: value.to_string(),
        }
    }

    fn write_background(dir: &Path, width: u32, height: u32) -> PathBuf {
        let path = dir.join("background.png");
        std::fs::write(&path, png_bytes(width, height, [255, 255, 255])).unwrap();
        path
    }

    #[test]
    fn scale_ratio_never_upscales() {
        assert_eq!(scaled_dimensions(600, 300, Some(300), Some(300)), (300, 150));
        assert_eq!(scaled_dimensions(100, 50, Some(300), Some(300)), (100, 50));
        assert_eq!(scaled_dimensions(600, 300, None, None), (600, 300));
        assert_eq!(scaled_dimensions(600, 300, Some(150), None), (150, 75));
        assert_eq!(scaled_dimensions(600, 300, None, Some(150)), (300, 150));
    }

    #[test]
    fn undecodable_background_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();

        let store = MemoryStore(HashMap::new());
        let err = composite(&path, &[], &store).unwrap_err();
        assert!(matches!(err, Error::TemplateImageInvalid(_)));
    }

    #[test]
    fn no_image_fields_reuses_background() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_background(dir.path(), 900, 600);

        let store = MemoryStore(HashMap::new());
        let raster = composite(&path, &[], &store).unwrap();
        assert!(!raster.is_flattened());
        assert_eq!(raster.path(), path);
        assert_eq!(raster.width(), 900);
        assert_eq!(raster.height(), 600);
    }

    #[test]
    fn image_field_is_scaled_and_drawn() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_background(dir.path(), 900, 600);

        let mut store = HashMap::new();
        store.insert("seal.png".to_string(), png_bytes(600, 300, [10, 20, 30]));
        let store = MemoryStore(store);

        let fields = vec![image_field("seal", "seal.png", 100.0, 50.0)];
        let raster = composite(&path, &fields, &store).unwrap();
        assert!(raster.is_flattened());

        let flattened = image::open(raster.path()).unwrap().to_rgb8();
        assert_eq!(flattened.dimensions(), (900, 600));
        // 600x300 capped at 300x300 -> ratio 0.5 -> 300x150 at (100, 50)
        assert_eq!(flattened.get_pixel(100 + 150, 50 + 75), &image::Rgb([10, 20, 30]));
        // outside the overlay the background stays white
        assert_eq!(flattened.get_pixel(450, 500), &image::Rgb([255, 255, 255]));
    }

    #[test]
    fn unresolvable_image_reference_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_background(dir.path(), 400, 300);

        let store = MemoryStore(HashMap::new());
        let fields = vec![image_field("seal", "missing.png", 0.0, 0.0)];
        let raster = composite(&path, &fields, &store).unwrap();
        // still produces a flattened raster; the field was skipped
        assert!(raster.is_flattened());
    }

    #[test]
    fn undecodable_field_image_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_background(dir.path(), 400, 300);

        let mut store = HashMap::new();
        store.insert("bad.png".to_string(), b"garbage".to_vec());
        let store = MemoryStore(store);

        let fields = vec![image_field("seal", "bad.png", 0.0, 0.0)];
        assert!(composite(&path, &fields, &store).is_ok());
    }

    #[test]
    fn hidden_and_empty_image_fields_do_not_composite() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_background(dir.path(), 400, 300);

        let mut hidden = image_field("a", "seal.png", 0.0, 0.0);
        hidden.def.display = false;
        let empty = image_field("b", "", 0.0, 0.0);

        let store = MemoryStore(HashMap::new());
        let raster = composite(&path, &[hidden, empty], &store).unwrap();
        assert!(!raster.is_flattened());
    }

    #[test]
    fn temp_raster_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_background(dir.path(), 200, 100);

        let mut store = HashMap::new();
        store.insert("seal.png".to_string(), png_bytes(10, 10, [0, 0, 0]));
        let store = MemoryStore(store);

        let fields = vec![image_field("seal", "seal.png", 0.0, 0.0)];
        let raster = composite(&path, &fields, &store).unwrap();
        let temp_path = raster.path().to_path_buf();
        assert!(temp_path.exists());
        drop(raster);
        assert!(!temp_path.exists());
    }
}
