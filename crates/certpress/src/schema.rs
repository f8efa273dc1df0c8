//! Field-definition schema
//!
//! The JSON encoding of these types is the persisted contract shared
//! with the authoring surface and the external template store; both
//! sides parse it independently, so changes here are wire changes.

use serde::{Deserialize, Serialize};

/// Text alignment of a field
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Interpretation rule for a field's stored x coordinate
///
/// `PercentAnchor` is terminal: once a field is migrated to it, the
/// value is never reinterpreted (see [`crate::coords::normalize`]).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum CoordMode {
    /// Legacy rows carry an empty string
    #[default]
    #[serde(rename = "")]
    Unset,
    /// x is the fractional position of the box's left edge
    #[serde(rename = "percent_left")]
    PercentLeft,
    /// x is the fractional position of the alignment-dependent anchor
    #[serde(rename = "percent_anchor")]
    PercentAnchor,
}

/// Field type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Date,
    Select,
    Image,
    Auto,
}

/// Source of an auto-generated field value
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AutoKind {
    CertificateId,
    GenerationDate,
}

/// One choice of a select field (authoring surface concern)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectOption {
    pub label: String,
}

/// Visual style of a drawn field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldStyle {
    #[serde(default = "default_font_family")]
    pub font_family: String,

    /// Font size in points
    #[serde(default = "default_font_size")]
    pub font_size: f64,

    /// Hex color, "#RRGGBB"
    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub align: Align,

    #[serde(default)]
    pub bold: bool,

    #[serde(default)]
    pub italic: bool,
}

fn default_font_family() -> String {
    "sans".to_string()
}

fn default_font_size() -> f64 {
    16.0
}

fn default_color() -> String {
    "#000000".to_string()
}

impl Default for FieldStyle {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
            font_size: default_font_size(),
            color: default_color(),
            align: Align::default(),
            bold: false,
            italic: false,
        }
    }
}

impl FieldStyle {
    /// Parse the hex color, falling back to black on malformed input
    pub fn text_color(&self) -> pdf_doc::Color {
        parse_hex_color(&self.color).unwrap_or_else(pdf_doc::Color::black)
    }
}

/// Parse a "#RRGGBB" (or "RRGGBB") hex color
pub fn parse_hex_color(hex: &str) -> Option<pdf_doc::Color> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(pdf_doc::Color::from_rgb(r, g, b))
}

/// Persisted description of one positioned, styled value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDef {
    /// Stable identifier, unique within a definition set
    pub id: String,

    /// Stable key mapping input values to this field
    pub key: String,

    /// Display name (authoring surface only)
    #[serde(default)]
    pub label: String,

    #[serde(rename = "type")]
    pub kind: FieldKind,

    /// Enforced only for non-image kinds
    #[serde(default)]
    pub required: bool,

    /// Suppressed from output when false
    #[serde(default = "default_true")]
    pub display: bool,

    /// Fractional coordinate in [0, 1] relative to the background
    /// image width. Image fields are the exception: the compositor
    /// treats their x/y as raw pixel offsets (a deliberate dual
    /// system inherited from the authoring surface).
    #[serde(default)]
    pub x: f64,

    /// Fractional coordinate in [0, 1] relative to the background
    /// image height (same image-field exception as `x`)
    #[serde(default)]
    pub y: f64,

    #[serde(default)]
    pub coord_mode: CoordMode,

    #[serde(default)]
    pub style: FieldStyle,

    /// chrono strftime pattern for date and generation-date fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,

    #[serde(
        rename = "auto_type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub auto_kind: Option<AutoKind>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,

    /// Upper bound on composited image width in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_max_width: Option<u32>,

    /// Upper bound on composited image height in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_max_height: Option<u32>,
}

fn default_true() -> bool {
    true
}

/// A field definition plus its generation-specific value
///
/// Ephemeral: produced per generation request and discarded after
/// rendering. For image fields the value is an opaque reference
/// resolved through [`crate::config::ImageStore`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResolvedField {
    #[serde(flatten)]
    pub def: FieldDef,
    pub value: String,
}

/// A certificate template: background raster plus ordered field list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CertificateTemplate {
    /// Path to the background image (authoritative for dimensions)
    pub background: String,

    /// Ordered field definitions
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl CertificateTemplate {
    /// Parse a template from its persisted JSON form
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Keys violating the unique non-empty key invariant
    ///
    /// Empty keys are reported as the owning field's id. A duplicate is
    /// reported once per extra occurrence.
    pub fn invalid_keys(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut bad = Vec::new();
        for field in &self.fields {
            if field.key.is_empty() {
                bad.push(format!("<empty key on field {}>", field.id));
            } else if !seen.insert(field.key.as_str()) {
                bad.push(field.key.clone());
            }
        }
        bad
    }
}
