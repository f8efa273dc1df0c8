//! Text content-stream generation

/// RGB text color, components in 0.0 - 1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: f32::from(r) / 255.0,
            g: f32::from(g) / 255.0,
            b: f32::from(b) / 255.0,
        }
    }

    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}

/// Context for rendering one run of text
pub struct TextRenderContext {
    /// PDF font resource name (e.g. "F1")
    pub font_name: String,
    /// Font size in points
    pub font_size: f64,
    /// Text color
    pub color: Color,
}

/// Generate the PDF operators (BT..ET) for one text run
///
/// `x` is the left edge of the text in PDF coordinates; `y` is the
/// baseline from the page bottom. Callers that align text around an
/// anchor compute the left edge themselves before calling in, so this
/// layer stays a plain operator emitter.
pub fn generate_text_operators(text_hex: &str, x: f64, y: f64, ctx: &TextRenderContext) -> Vec<u8> {
    let mut ops = String::new();
    ops.push_str("BT\n");
    ops.push_str(&format!(
        "{} {} {} rg\n",
        ctx.color.r, ctx.color.g, ctx.color.b
    ));
    ops.push_str(&format!("/{} {} Tf\n", ctx.font_name, ctx.font_size));
    ops.push_str(&format!("{x} {y} Td\n"));
    ops.push_str(&format!("{text_hex} Tj\n"));
    ops.push_str("ET\n");
    ops.into_bytes()
}
