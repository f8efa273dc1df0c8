//! PDF document rendering
//!
//! Takes the flattened raster and the resolved fields and produces the
//! final single-page PDF. The page is sized so the background maps 1:1
//! onto it at the configured DPI; text positions are fractions of the
//! page, so the PDF matches the authoring preview pixel for pixel.

use crate::compositor::FlattenedRaster;
use crate::config::{FontProvider, RenderConfig};
use crate::coords;
use crate::schema::{CoordMode, FieldKind, ResolvedField};
use crate::{Error, Result};
use pdf_doc::{FontStyle, FontWeight, PdfDocument, PdfError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Declared page orientation of a template
///
/// Advisory only: the background raster's own geometry decides the page
/// size. A mismatch is logged and the raster wins.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

impl Orientation {
    /// Whether a raster of the given pixel size agrees with this
    /// orientation (square counts as both)
    pub fn matches(self, width: u32, height: u32) -> bool {
        match self {
            Orientation::Landscape => width >= height,
            Orientation::Portrait => height >= width,
        }
    }
}

/// Convert raster pixels to PDF points at the given DPI
pub fn px_to_points(px: f64, dpi: f64) -> f64 {
    px * 72.0 / dpi
}

/// Render the certificate PDF to `output_path`
///
/// Every displayed, non-empty, non-image field is drawn as text. The x
/// coordinate always locates the alignment anchor here; `coord_mode`
/// only matters to the authoring surface, which migrates fields to
/// anchor semantics before they reach rendering.
pub fn render(
    raster: &FlattenedRaster,
    fields: &[ResolvedField],
    orientation: Orientation,
    output_path: &Path,
    config: &RenderConfig,
    fonts: &dyn FontProvider,
) -> Result<()> {
    if !orientation.matches(raster.width(), raster.height()) {
        tracing::debug!(
            ?orientation,
            width = raster.width(),
            height = raster.height(),
            "declared orientation disagrees with background, using background geometry"
        );
    }

    let page_width = px_to_points(f64::from(raster.width()), config.dpi);
    let page_height = px_to_points(f64::from(raster.height()), config.dpi);
    let mut doc = PdfDocument::new(page_width, page_height)?;

    let background = std::fs::read(raster.path()).map_err(|e| {
        Error::TemplateImageInvalid(format!("{}: {e}", raster.path().display()))
    })?;
    doc.draw_background(&background).map_err(|e| match e {
        PdfError::ImageError(msg) => Error::TemplateImageInvalid(msg),
        other => Error::Pdf(other),
    })?;

    let mut registered: HashSet<String> = HashSet::new();
    for field in fields {
        if field.def.kind == FieldKind::Image || !field.def.display || field.value.is_empty() {
            continue;
        }

        let family = resolve_family(&field.def.style.font_family, fonts);
        if registered.insert(family.to_string()) {
            match fonts.family(family) {
                Some(data) => doc.register_font_family(family, data.clone()),
                None => {
                    return Err(Error::FontUnavailable(family.to_string()));
                }
            }
        }

        doc.set_font(family, field.def.style.font_size)?;
        doc.set_font_variant(
            weight_for(field.def.style.bold),
            style_for(field.def.style.italic),
        )?;
        doc.set_text_color(field.def.style.text_color());

        // The shared coordinate model owns the anchor formula; the x
        // here always locates the anchor (see the module docs).
        let text_width = doc.text_width(&field.value)?;
        let x = coords::left_edge(
            field.def.x,
            page_width,
            text_width,
            field.def.style.align,
            CoordMode::PercentAnchor,
        );
        let y = field.def.y * page_height;
        doc.draw_text(&field.value, x, y)?;
    }

    match doc.save(output_path) {
        Ok(()) => {}
        Err(PdfError::SaveError(msg)) => return Err(Error::OutputWriteError(msg)),
        Err(other) => return Err(Error::Pdf(other)),
    }
    tracing::debug!(path = %output_path.display(), "wrote certificate pdf");
    Ok(())
}

/// Family to draw with, falling back to the provider's default when the
/// field names an unmapped family
fn resolve_family<'a>(requested: &'a str, fonts: &'a dyn FontProvider) -> &'a str {
    if fonts.family(requested).is_some() {
        requested
    } else {
        let fallback = fonts.default_family();
        tracing::debug!(requested, fallback, "font family unmapped, using default");
        fallback
    }
}

fn weight_for(bold: bool) -> FontWeight {
    if bold {
        FontWeight::Bold
    } else {
        FontWeight::Regular
    }
}

fn style_for(italic: bool) -> FontStyle {
    if italic {
        FontStyle::Italic
    } else {
        FontStyle::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::composite;
    use crate::config::{FontCatalog, ImageStore};
    use crate::schema::{CoordMode, FieldDef, FieldStyle};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io;
    use std::path::PathBuf;

    struct EmptyStore;

    impl ImageStore for EmptyStore {
        fn load(&self, reference: &str) -> io::Result<Vec<u8>> {
            Err(io::Error::new(io::ErrorKind::NotFound, reference))
        }
    }

    fn write_background(dir: &Path, width: u32, height: u32) -> PathBuf {
        let path = dir.join("background.png");
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([240, 240, 240]));
        img.save(&path).unwrap();
        path
    }

    fn text_field(key: &str, value: &str) -> ResolvedField {
        ResolvedField {
            def: FieldDef {
                id: format!("id-{key}"),
                key: key.to_string(),
                label: String::new(),
                kind: FieldKind::Text,
                required: false,
                display: true,
                x: 0.5,
                y: 0.4,
                coord_mode: CoordMode::PercentAnchor,
                style: FieldStyle::default(),
                date_format: None,
                auto_kind: None,
                options: Vec::new(),
                image_max_width: None,
                image_max_height: None,
            },
            value: value.to_string(),
        }
    }

    #[test]
    fn orientation_agreement() {
        assert!(Orientation::Landscape.matches(900, 600));
        assert!(!Orientation::Landscape.matches(600, 900));
        assert!(Orientation::Portrait.matches(600, 900));
        assert!(!Orientation::Portrait.matches(900, 600));
        // square satisfies both
        assert!(Orientation::Landscape.matches(500, 500));
        assert!(Orientation::Portrait.matches(500, 500));
    }

    #[test]
    fn pixel_to_point_conversion() {
        assert_eq!(px_to_points(900.0, 72.0), 900.0);
        assert_eq!(px_to_points(900.0, 150.0), 432.0);
        assert_eq!(px_to_points(0.0, 96.0), 0.0);
    }

    #[test]
    fn background_only_render_produces_parseable_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let background = write_background(dir.path(), 900, 600);
        let raster = composite(&background, &[], &EmptyStore).unwrap();

        let output = dir.path().join("out.pdf");
        let config = RenderConfig {
            dpi: 150.0,
            ..RenderConfig::default()
        };
        render(
            &raster,
            &[],
            Orientation::Landscape,
            &output,
            &config,
            &FontCatalog::new(),
        )
        .unwrap();

        let parsed = lopdf::Document::load(&output).unwrap();
        let page_id = parsed.get_pages()[&1];
        let page = parsed.get_object(page_id).unwrap().as_dict().unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_float().unwrap(), 432.0);
        assert_eq!(media_box[3].as_float().unwrap(), 288.0);
    }

    #[test]
    fn orientation_mismatch_still_renders() {
        let dir = tempfile::tempdir().unwrap();
        let background = write_background(dir.path(), 600, 900);
        let raster = composite(&background, &[], &EmptyStore).unwrap();

        let output = dir.path().join("out.pdf");
        render(
            &raster,
            &[],
            Orientation::Landscape,
            &output,
            &RenderConfig::default(),
            &FontCatalog::new(),
        )
        .unwrap();

        let parsed = lopdf::Document::load(&output).unwrap();
        let page_id = parsed.get_pages()[&1];
        let page = parsed.get_object(page_id).unwrap().as_dict().unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        // portrait raster wins over the declared landscape orientation
        assert_eq!(media_box[2].as_float().unwrap(), 600.0);
        assert_eq!(media_box[3].as_float().unwrap(), 900.0);
    }

    #[test]
    fn unreadable_raster_is_a_template_error() {
        let dir = tempfile::tempdir().unwrap();
        let background = write_background(dir.path(), 400, 300);
        let raster = composite(&background, &[], &EmptyStore).unwrap();
        // the raster points at the original background; pull it away
        std::fs::remove_file(&background).unwrap();

        let err = render(
            &raster,
            &[],
            Orientation::Landscape,
            &dir.path().join("out.pdf"),
            &RenderConfig::default(),
            &FontCatalog::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::TemplateImageInvalid(_)));
    }

    #[test]
    fn undecodable_raster_is_a_template_error() {
        let dir = tempfile::tempdir().unwrap();
        let background = write_background(dir.path(), 400, 300);
        let raster = composite(&background, &[], &EmptyStore).unwrap();
        std::fs::write(&background, b"no longer a png").unwrap();

        let err = render(
            &raster,
            &[],
            Orientation::Landscape,
            &dir.path().join("out.pdf"),
            &RenderConfig::default(),
            &FontCatalog::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::TemplateImageInvalid(_)));
    }

    #[test]
    fn unwritable_output_path_is_an_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let background = write_background(dir.path(), 400, 300);
        let raster = composite(&background, &[], &EmptyStore).unwrap();

        let err = render(
            &raster,
            &[],
            Orientation::Landscape,
            &dir.path().join("no-such-dir").join("out.pdf"),
            &RenderConfig::default(),
            &FontCatalog::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::OutputWriteError(_)));
    }

    #[test]
    fn text_field_without_any_fonts_fails() {
        let dir = tempfile::tempdir().unwrap();
        let background = write_background(dir.path(), 400, 300);
        let raster = composite(&background, &[], &EmptyStore).unwrap();

        let output = dir.path().join("out.pdf");
        let err = render(
            &raster,
            &[text_field("recipient", "Jane Doe")],
            Orientation::Landscape,
            &output,
            &RenderConfig::default(),
            &FontCatalog::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::FontUnavailable(_)));
    }

    #[test]
    fn hidden_and_empty_fields_skip_font_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let background = write_background(dir.path(), 400, 300);
        let raster = composite(&background, &[], &EmptyStore).unwrap();

        let mut hidden = text_field("a", "value");
        hidden.def.display = false;
        let empty = text_field("b", "");

        let output = dir.path().join("out.pdf");
        // no fonts registered, but nothing drawable means no lookup
        render(
            &raster,
            &[hidden, empty],
            Orientation::Landscape,
            &output,
            &RenderConfig::default(),
            &FontCatalog::new(),
        )
        .unwrap();
        assert!(output.exists());
    }

    struct NoopStore(HashMap<String, Vec<u8>>);

    impl ImageStore for NoopStore {
        fn load(&self, reference: &str) -> io::Result<Vec<u8>> {
            self.0
                .get(reference)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, reference))
        }
    }

    #[test]
    fn image_fields_are_not_drawn_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let background = write_background(dir.path(), 400, 300);
        let raster = composite(&background, &[], &NoopStore(HashMap::new())).unwrap();

        let mut field = text_field("photo", "photo.png");
        field.def.kind = FieldKind::Image;

        let output = dir.path().join("out.pdf");
        // would fail with FontUnavailable if treated as text
        render(
            &raster,
            &[field],
            Orientation::Landscape,
            &output,
            &RenderConfig::default(),
            &FontCatalog::new(),
        )
        .unwrap();
    }
}
