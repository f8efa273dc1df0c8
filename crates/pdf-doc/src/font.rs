//! TrueType font embedding and metrics

use crate::{PdfError, Result};
use lopdf::{Dictionary, Object, Stream};
use std::collections::BTreeSet;

/// Font weight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontWeight {
    #[default]
    Regular,
    Bold,
}

/// Font style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

/// One embeddable TrueType font
///
/// Tracks which characters were drawn with it so the ToUnicode CMap and
/// the CID widths array cover exactly the glyphs the document uses. The
/// full font program is embedded; no subsetting is performed.
#[derive(Debug, Clone)]
pub struct FontData {
    /// Font name as it appears in the PDF (/BaseFont)
    pub name: String,
    /// Raw TTF bytes
    pub ttf_data: Vec<u8>,
    /// Characters drawn with this font
    used_chars: BTreeSet<char>,
    /// Parsed font face
    face: ttf_parser::Face<'static>,
}

impl FontData {
    /// Parse TTF bytes into an embeddable font
    pub fn from_ttf(name: &str, ttf_data: &[u8]) -> Result<Self> {
        let data = ttf_data.to_vec();

        // The face borrows the font bytes for the life of the document;
        // fonts are loaded once per generation, so leaking the backing
        // buffer keeps the borrow checker out of every metrics call.
        let static_data: &'static [u8] = Box::leak(data.clone().into_boxed_slice());
        let face = ttf_parser::Face::parse(static_data, 0)
            .map_err(|e| PdfError::FontParseError(format!("{name}: {e:?}")))?;

        Ok(Self {
            name: name.to_string(),
            ttf_data: data,
            used_chars: BTreeSet::new(),
            face,
        })
    }

    /// Record the characters of `text` as used
    pub fn note_chars(&mut self, text: &str) {
        self.used_chars.extend(text.chars());
    }

    /// Glyph ID for a character (None if the font has no mapping)
    pub fn glyph_id(&self, c: char) -> Option<u16> {
        self.face.glyph_index(c).map(|id| id.0)
    }

    /// Horizontal advance of a character in font units
    pub fn glyph_advance(&self, c: char) -> Option<u16> {
        let id = self.face.glyph_index(c)?;
        self.face.glyph_hor_advance(id)
    }

    pub fn units_per_em(&self) -> u16 {
        self.face.units_per_em()
    }

    pub fn ascender(&self) -> i16 {
        self.face.ascender()
    }

    pub fn descender(&self) -> i16 {
        self.face.descender()
    }

    /// Text width in font units (sum of advances, no kerning)
    pub fn text_width(&self, text: &str) -> u32 {
        text.chars()
            .filter_map(|c| self.glyph_advance(c))
            .map(u32::from)
            .sum()
    }

    /// Text width in points at a given font size
    pub fn text_width_points(&self, text: &str, font_size: f64) -> f64 {
        f64::from(self.text_width(text)) / f64::from(self.units_per_em()) * font_size
    }

    /// Encode text as the hex string placed after the Tj operator
    ///
    /// Identity-H encoding: each character becomes its 16-bit glyph ID.
    pub fn encode_text_hex(&self, text: &str) -> String {
        let mut hex = String::with_capacity(text.len() * 4 + 2);
        hex.push('<');
        for c in text.chars() {
            let gid = self.glyph_id(c).unwrap_or(0);
            hex.push_str(&format!("{gid:04X}"));
        }
        hex.push('>');
        hex
    }

    /// Generate the object graph that embeds this font
    ///
    /// Returns (Type0 font, CIDFontType2, FontDescriptor, font file
    /// stream, ToUnicode stream). Cross-references between them are
    /// placeholders; the document wires them up with real object IDs.
    pub fn to_pdf_objects(&self) -> FontObjects {
        let font_name = Object::Name(self.name.clone().into());

        let tounicode = self.tounicode_cmap();
        let tounicode_stream = Stream::new(
            Dictionary::from_iter(vec![
                ("Type", "CMap".into()),
                ("Length", (tounicode.len() as i32).into()),
            ]),
            tounicode.into_bytes(),
        );

        let font_file_stream = Stream::new(
            Dictionary::from_iter(vec![(
                "Length1",
                (self.ttf_data.len() as i32).into(),
            )]),
            self.ttf_data.clone(),
        );

        let ascender = self.ascender();
        let descender = self.descender();
        let font_bbox = vec![
            0.into(),
            descender.into(),
            i32::from(self.units_per_em()).into(),
            ascender.into(),
        ];

        let font_descriptor = Dictionary::from_iter(vec![
            ("Type", "FontDescriptor".into()),
            ("FontName", font_name.clone()),
            ("Flags", 4.into()), // symbolic
            ("FontBBox", font_bbox.into()),
            ("ItalicAngle", 0.into()),
            ("Ascent", ascender.into()),
            ("Descent", descender.into()),
            ("CapHeight", ascender.into()),
            ("StemV", 80.into()),
            ("FontFile2", Object::Reference((0, 0))),
        ]);

        let cid_system_info = Dictionary::from_iter(vec![
            ("Registry", Object::string_literal("Adobe")),
            ("Ordering", Object::string_literal("Identity")),
            ("Supplement", 0.into()),
        ]);

        let cid_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "CIDFontType2".into()),
            ("BaseFont", font_name.clone()),
            ("CIDSystemInfo", cid_system_info.into()),
            ("FontDescriptor", Object::Reference((0, 0))),
            ("W", self.widths_array().into()),
            ("DW", 1000.into()),
        ]);

        let type0_font = Dictionary::from_iter(vec![
            ("Type", "Font".into()),
            ("Subtype", "Type0".into()),
            ("BaseFont", font_name),
            ("Encoding", "Identity-H".into()),
            ("DescendantFonts", vec![Object::Reference((0, 0))].into()),
            ("ToUnicode", Object::Reference((0, 0))),
        ]);

        FontObjects {
            type0_font,
            cid_font,
            font_descriptor,
            font_file_stream,
            tounicode_stream,
        }
    }

    /// /W array listing the advance of every used glyph
    fn widths_array(&self) -> Vec<Object> {
        let mut gids: Vec<u16> = self
            .used_chars
            .iter()
            .filter_map(|&c| self.glyph_id(c))
            .collect();
        gids.sort_unstable();
        gids.dedup();

        let mut widths = Vec::with_capacity(gids.len() * 2);
        for gid in gids {
            let advance = self
                .face
                .glyph_hor_advance(ttf_parser::GlyphId(gid))
                .unwrap_or(1000);
            widths.push(gid.into());
            widths.push(vec![advance.into()].into());
        }
        widths
    }

    /// ToUnicode CMap mapping used glyph IDs back to codepoints
    fn tounicode_cmap(&self) -> String {
        let mut cmap = String::new();
        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        cmap.push_str("/CMapName /Adobe-Identity-UCS def\n");
        cmap.push_str("/CMapType 2 def\n");
        cmap.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

        let chars: Vec<char> = self.used_chars.iter().copied().collect();
        // bfchar sections are capped at 100 entries by the PDF spec
        for chunk in chars.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for &c in chunk {
                let gid = self.glyph_id(c).unwrap_or(0);
                cmap.push_str(&format!("<{gid:04X}> <{:04X}>\n", c as u32));
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\nend\n");
        cmap
    }
}

/// PDF objects generated for font embedding
pub struct FontObjects {
    pub type0_font: Dictionary,
    pub cid_font: Dictionary,
    pub font_descriptor: Dictionary,
    pub font_file_stream: Stream,
    pub tounicode_stream: Stream,
}

/// Font family with regular/bold/italic variants
#[derive(Debug, Clone, Default)]
pub struct FontFamily {
    pub regular: Option<FontData>,
    pub bold: Option<FontData>,
    pub italic: Option<FontData>,
    pub bold_italic: Option<FontData>,
}

impl FontFamily {
    /// Font data for the requested variant, falling back toward regular
    pub fn variant(&self, weight: FontWeight, style: FontStyle) -> Option<&FontData> {
        match (weight, style) {
            (FontWeight::Bold, FontStyle::Italic) => self
                .bold_italic
                .as_ref()
                .or(self.bold.as_ref())
                .or(self.italic.as_ref())
                .or(self.regular.as_ref()),
            (FontWeight::Bold, FontStyle::Normal) => self.bold.as_ref().or(self.regular.as_ref()),
            (FontWeight::Regular, FontStyle::Italic) => {
                self.italic.as_ref().or(self.regular.as_ref())
            }
            (FontWeight::Regular, FontStyle::Normal) => self.regular.as_ref(),
        }
    }

    /// Mutable access to the variant `variant()` would resolve to
    pub fn variant_mut(&mut self, weight: FontWeight, style: FontStyle) -> Option<&mut FontData> {
        match (weight, style) {
            (FontWeight::Bold, FontStyle::Italic) => {
                if self.bold_italic.is_some() {
                    self.bold_italic.as_mut()
                } else if self.bold.is_some() {
                    self.bold.as_mut()
                } else if self.italic.is_some() {
                    self.italic.as_mut()
                } else {
                    self.regular.as_mut()
                }
            }
            (FontWeight::Bold, FontStyle::Normal) => {
                if self.bold.is_some() {
                    self.bold.as_mut()
                } else {
                    self.regular.as_mut()
                }
            }
            (FontWeight::Regular, FontStyle::Italic) => {
                if self.italic.is_some() {
                    self.italic.as_mut()
                } else {
                    self.regular.as_mut()
                }
            }
            (FontWeight::Regular, FontStyle::Normal) => self.regular.as_mut(),
        }
    }

    /// Iterate over the variants that are present
    pub fn variants(&self) -> impl Iterator<Item = &FontData> {
        [&self.regular, &self.bold, &self.italic, &self.bold_italic]
            .into_iter()
            .flatten()
    }
}

/// Builder assembling a [`FontFamily`] from TTF byte buffers
pub struct FontFamilyBuilder {
    regular: Option<Vec<u8>>,
    bold: Option<Vec<u8>>,
    italic: Option<Vec<u8>>,
    bold_italic: Option<Vec<u8>>,
}

impl FontFamilyBuilder {
    pub fn new() -> Self {
        Self {
            regular: None,
            bold: None,
            italic: None,
            bold_italic: None,
        }
    }

    pub fn regular(mut self, ttf_data: Vec<u8>) -> Self {
        self.regular = Some(ttf_data);
        self
    }

    pub fn bold(mut self, ttf_data: Vec<u8>) -> Self {
        self.bold = Some(ttf_data);
        self
    }

    pub fn italic(mut self, ttf_data: Vec<u8>) -> Self {
        self.italic = Some(ttf_data);
        self
    }

    pub fn bold_italic(mut self, ttf_data: Vec<u8>) -> Self {
        self.bold_italic = Some(ttf_data);
        self
    }

    /// Build the family; a regular variant is mandatory
    pub fn build(self, family_name: &str) -> Result<FontFamily> {
        let Some(regular) = self.regular else {
            return Err(PdfError::FontParseError(format!(
                "font family '{family_name}' has no regular variant"
            )));
        };

        Ok(FontFamily {
            regular: Some(FontData::from_ttf(
                &format!("{family_name}-regular"),
                &regular,
            )?),
            bold: self
                .bold
                .map(|d| FontData::from_ttf(&format!("{family_name}-bold"), &d))
                .transpose()?,
            italic: self
                .italic
                .map(|d| FontData::from_ttf(&format!("{family_name}-italic"), &d))
                .transpose()?,
            bold_italic: self
                .bold_italic
                .map(|d| FontData::from_ttf(&format!("{family_name}-bold-italic"), &d))
                .transpose()?,
        })
    }
}

impl Default for FontFamilyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_regular_variant() {
        let err = FontFamilyBuilder::new().build("sans").unwrap_err();
        assert!(matches!(err, PdfError::FontParseError(_)));
    }

    #[test]
    fn builder_rejects_garbage_ttf() {
        let err = FontFamilyBuilder::new()
            .regular(vec![0u8; 64])
            .build("sans")
            .unwrap_err();
        assert!(matches!(err, PdfError::FontParseError(_)));
    }

    #[test]
    fn empty_family_resolves_no_variant() {
        let family = FontFamily::default();
        assert!(family
            .variant(FontWeight::Regular, FontStyle::Normal)
            .is_none());
        assert!(family.variant(FontWeight::Bold, FontStyle::Italic).is_none());
        assert_eq!(family.variants().count(), 0);
    }
}
