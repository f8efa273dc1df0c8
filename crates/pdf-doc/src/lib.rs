//! PDF Doc - single-page PDF construction
//!
//! This crate provides functionality for:
//! - Creating a one-page document sized in points
//! - Embedding TrueType fonts (CIDFontType2, Identity-H)
//! - Drawing text at specific coordinates with width measurement
//! - Drawing images (JPEG, PNG) including a full-bleed page background
//!
//! # Example
//!
//! ```ignore
//! use pdf_doc::{PdfDocument, FontFamilyBuilder};
//!
//! let mut doc = PdfDocument::new(842.0, 595.0);
//! let family = FontFamilyBuilder::new()
//!     .regular(std::fs::read("fonts/DejaVuSans.ttf")?)
//!     .build("sans")?;
//! doc.register_font_family("sans", family);
//! doc.draw_background(&std::fs::read("flat.png")?)?;
//! doc.set_font("sans", 24.0)?;
//! // centering around x = 421 is the caller's measurement
//! let left = 421.0 - doc.text_width("Jane Doe")? / 2.0;
//! doc.draw_text("Jane Doe", left, 300.0)?;
//! doc.save("out.pdf")?;
//! ```

mod document;
mod font;
mod image;
mod text;

pub use document::PdfDocument;
pub use font::{FontData, FontFamily, FontFamilyBuilder, FontStyle, FontWeight};
pub use image::{detect_format, ImageFormat, ImageXObject};
pub use text::{generate_text_operators, Color, TextRenderContext};

use thiserror::Error;

/// Errors that can occur during PDF construction
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Invalid page geometry: {0} x {1}")]
    InvalidGeometry(f64, f64),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;
