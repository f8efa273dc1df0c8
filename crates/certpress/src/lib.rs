//! Certpress - certificate generation core
//!
//! Renders personalized certificates from a template (a background
//! raster plus positioned field definitions) and a map of input values.
//! Generation runs in three stages:
//!
//! 1. **Resolve** ([`resolve`]): field definitions plus inputs become
//!    final values; auto fields are filled from the generation context
//!    and date fields are reformatted.
//! 2. **Composite** ([`composite`]): image fields are flattened onto
//!    the background raster.
//! 3. **Render** ([`render`]): the flattened raster becomes a
//!    full-bleed single-page PDF with the text fields drawn on top.
//!
//! [`generate`] runs all three. The stages are also usable separately,
//! e.g. to resolve fields for a preview without producing a PDF.
//!
//! # Example
//!
//! ```ignore
//! use certpress::{
//!     generate, CertificateTemplate, DirImageStore, FontCatalog,
//!     GenerationContext, Orientation, RenderConfig,
//! };
//!
//! let template = CertificateTemplate::from_json(&std::fs::read_to_string("template.json")?)?;
//! let ctx = GenerationContext {
//!     certificate_id: "CERT-2026-0042".to_string(),
//!     generated_at: chrono::Local::now().naive_local(),
//! };
//! let generated = generate(
//!     &template,
//!     &inputs,
//!     &ctx,
//!     Orientation::Landscape,
//!     std::path::Path::new("out.pdf"),
//!     &RenderConfig::default(),
//!     &DirImageStore::new("uploads"),
//!     &fonts,
//! )?;
//! ```

pub mod compositor;
pub mod config;
pub mod coords;
pub mod renderer;
pub mod resolver;
pub mod schema;

pub use compositor::{composite, scaled_dimensions, FlattenedRaster};
pub use config::{DirImageStore, FontCatalog, FontProvider, ImageStore, RenderConfig};
pub use coords::{anchor_fraction, anchor_offset, clamp01, left_edge, normalize};
pub use renderer::{px_to_points, render, Orientation};
pub use resolver::{resolve, GenerationContext};
pub use schema::{
    Align, AutoKind, CertificateTemplate, CoordMode, FieldDef, FieldKind, FieldStyle,
    ResolvedField, SelectOption,
};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during certificate generation
#[derive(Debug, Error)]
pub enum Error {
    /// Required non-image fields resolved empty; carries every
    /// offending key, not just the first
    #[error("missing required fields: {}", .0.join(", "))]
    MissingRequiredFields(Vec<String>),

    /// The template violates the unique non-empty key invariant
    #[error("invalid field keys: {}", .0.join(", "))]
    InvalidFieldKeys(Vec<String>),

    #[error("template background is not a decodable image: {0}")]
    TemplateImageInvalid(String),

    #[error("failed to stage flattened background: {0}")]
    TempFileError(String),

    #[error("failed to write output PDF: {0}")]
    OutputWriteError(String),

    /// Neither the requested font family nor the default is registered
    #[error("no usable font family: {0}")]
    FontUnavailable(String),

    #[error("invalid template JSON: {0}")]
    TemplateParse(#[from] serde_json::Error),

    #[error(transparent)]
    Pdf(#[from] pdf_doc::PdfError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for generation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of a successful generation
#[derive(Debug)]
pub struct Generated {
    /// Where the PDF was written
    pub output_path: PathBuf,
    /// The resolved fields the document was drawn from
    pub fields: Vec<ResolvedField>,
}

/// Run the full generation pipeline and write the PDF to `output_path`
///
/// The flattened intermediate raster is removed before this returns, on
/// both success and error paths.
#[allow(clippy::too_many_arguments)]
pub fn generate(
    template: &CertificateTemplate,
    inputs: &HashMap<String, String>,
    ctx: &GenerationContext,
    orientation: Orientation,
    output_path: &Path,
    config: &RenderConfig,
    images: &dyn ImageStore,
    fonts: &dyn FontProvider,
) -> Result<Generated> {
    let bad_keys = template.invalid_keys();
    if !bad_keys.is_empty() {
        return Err(Error::InvalidFieldKeys(bad_keys));
    }

    tracing::info!(
        certificate_id = %ctx.certificate_id,
        fields = template.fields.len(),
        "resolving fields"
    );
    let fields = resolver::resolve(&template.fields, inputs, ctx, config)?;

    tracing::info!(background = %template.background, "compositing background");
    let raster = compositor::composite(Path::new(&template.background), &fields, images)?;

    tracing::info!(output = %output_path.display(), "rendering document");
    renderer::render(&raster, &fields, orientation, output_path, config, fonts)?;

    Ok(Generated {
        output_path: output_path.to_path_buf(),
        fields,
    })
}
