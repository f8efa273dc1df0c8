//! Single-page PDF document assembly

use crate::font::{FontData, FontFamily, FontStyle, FontWeight};
use crate::image::{generate_image_operators, ImageXObject};
use crate::text::{generate_text_operators, Color, TextRenderContext};
use crate::{PdfError, Result};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Current font selection
#[derive(Debug, Clone)]
struct FontSelection {
    family: String,
    weight: FontWeight,
    style: FontStyle,
    size: f64,
}

/// A one-page PDF document built from scratch
///
/// Coordinates given to the draw calls use a top-left origin in points;
/// conversion to PDF's bottom-left origin happens internally. Content is
/// buffered and written as a single stream at save time.
pub struct PdfDocument {
    inner: Document,
    page_id: ObjectId,
    page_width: f64,
    page_height: f64,
    families: HashMap<String, FontFamily>,
    selection: Option<FontSelection>,
    text_color: Color,
    /// variant name -> page resource name ("F1", "F2", ...)
    font_resources: HashMap<String, String>,
    next_font_resource: u32,
    /// image data hash -> (object id, resource name)
    image_resources: HashMap<u64, (ObjectId, String)>,
    next_image_resource: u32,
    content: Vec<u8>,
}

impl PdfDocument {
    /// Create a document with a single page of the given size in points
    pub fn new(page_width: f64, page_height: f64) -> Result<Self> {
        if !(page_width.is_finite() && page_height.is_finite())
            || page_width <= 0.0
            || page_height <= 0.0
        {
            return Err(PdfError::InvalidGeometry(page_width, page_height));
        }

        let mut inner = Document::with_version("1.5");
        let pages_id = inner.new_object_id();

        let page_id = inner.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                page_width.into(),
                page_height.into(),
            ],
        });

        inner.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );

        let catalog_id = inner.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        inner.trailer.set("Root", catalog_id);

        Ok(Self {
            inner,
            page_id,
            page_width,
            page_height,
            families: HashMap::new(),
            selection: None,
            text_color: Color::default(),
            font_resources: HashMap::new(),
            next_font_resource: 1,
            image_resources: HashMap::new(),
            next_image_resource: 1,
            content: Vec::new(),
        })
    }

    pub fn page_width(&self) -> f64 {
        self.page_width
    }

    pub fn page_height(&self) -> f64 {
        self.page_height
    }

    /// Register a font family under a name usable with [`set_font`]
    ///
    /// [`set_font`]: PdfDocument::set_font
    pub fn register_font_family(&mut self, name: &str, family: FontFamily) {
        self.families.insert(name.to_string(), family);
    }

    /// Select the family and size for subsequent text draws
    pub fn set_font(&mut self, family: &str, size: f64) -> Result<()> {
        if !self.families.contains_key(family) {
            return Err(PdfError::FontNotFound(family.to_string()));
        }
        let (weight, style) = match &self.selection {
            Some(sel) => (sel.weight, sel.style),
            None => (FontWeight::default(), FontStyle::default()),
        };
        self.selection = Some(FontSelection {
            family: family.to_string(),
            weight,
            style,
            size,
        });
        Ok(())
    }

    /// Select the weight/style variant for subsequent text draws
    pub fn set_font_variant(&mut self, weight: FontWeight, style: FontStyle) -> Result<()> {
        let sel = self
            .selection
            .as_mut()
            .ok_or_else(|| PdfError::FontNotFound("no font selected".to_string()))?;
        sel.weight = weight;
        sel.style = style;
        Ok(())
    }

    pub fn set_text_color(&mut self, color: Color) {
        self.text_color = color;
    }

    fn selected_font(&self) -> Result<(&FontSelection, &FontData)> {
        let sel = self
            .selection
            .as_ref()
            .ok_or_else(|| PdfError::FontNotFound("no font selected".to_string()))?;
        let family = self
            .families
            .get(&sel.family)
            .ok_or_else(|| PdfError::FontNotFound(sel.family.clone()))?;
        let data = family
            .variant(sel.weight, sel.style)
            .ok_or_else(|| PdfError::FontNotFound(sel.family.clone()))?;
        Ok((sel, data))
    }

    /// Width of `text` in points with the current font selection
    pub fn text_width(&self, text: &str) -> Result<f64> {
        let (sel, data) = self.selected_font()?;
        Ok(data.text_width_points(text, sel.size))
    }

    /// Draw text with its left edge at `(x, y)`
    ///
    /// `y` is the baseline measured from the page top. Callers aligning
    /// text around an anchor compute the left edge first, using
    /// [`text_width`] for the measurement.
    ///
    /// [`text_width`]: PdfDocument::text_width
    pub fn draw_text(&mut self, text: &str, x: f64, y: f64) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }

        let (text_hex, font_size, variant_name) = {
            let (sel, data) = self.selected_font()?;
            (data.encode_text_hex(text), sel.size, data.name.clone())
        };

        // Track used characters for the ToUnicode CMap and widths array
        if let Some(sel) = self.selection.clone() {
            if let Some(family) = self.families.get_mut(&sel.family) {
                if let Some(data) = family.variant_mut(sel.weight, sel.style) {
                    data.note_chars(text);
                }
            }
        }

        let resource_name = self.font_resource_name(&variant_name);

        let ctx = TextRenderContext {
            font_name: resource_name,
            font_size,
            color: self.text_color,
        };
        let pdf_y = self.page_height - y;
        let ops = generate_text_operators(&text_hex, x, pdf_y, &ctx);
        self.content.extend_from_slice(&ops);
        Ok(())
    }

    fn font_resource_name(&mut self, variant_name: &str) -> String {
        if let Some(existing) = self.font_resources.get(variant_name) {
            return existing.clone();
        }
        let name = format!("F{}", self.next_font_resource);
        self.next_font_resource += 1;
        self.font_resources
            .insert(variant_name.to_string(), name.clone());
        name
    }

    /// Draw an image with its top-left corner at `(x, y)` in points
    pub fn draw_image(&mut self, data: &[u8], x: f64, y: f64, width: f64, height: f64) -> Result<()> {
        let resource_name = self.image_resource_name(data)?;
        let pdf_y = self.page_height - y - height;
        let ops = generate_image_operators(&resource_name, x, pdf_y, width, height);
        self.content.extend_from_slice(&ops);
        Ok(())
    }

    /// Draw an image covering the whole page
    pub fn draw_background(&mut self, data: &[u8]) -> Result<()> {
        self.draw_image(data, 0.0, 0.0, self.page_width, self.page_height)
    }

    fn image_resource_name(&mut self, data: &[u8]) -> Result<String> {
        let mut hasher = DefaultHasher::new();
        data.hash(&mut hasher);
        let key = hasher.finish();

        if let Some((_, name)) = self.image_resources.get(&key) {
            return Ok(name.clone());
        }

        let xobject = ImageXObject::from_bytes(data)?;
        let object_id = self.inner.add_object(xobject.to_pdf_stream());
        let name = format!("Im{}", self.next_image_resource);
        self.next_image_resource += 1;
        self.image_resources.insert(key, (object_id, name.clone()));
        Ok(name)
    }

    /// Embed one font variant, returning its Type0 font object id
    fn embed_font(&mut self, variant_name: &str) -> Result<ObjectId> {
        let data = self
            .families
            .values()
            .flat_map(|f| f.variants())
            .find(|d| d.name == variant_name)
            .ok_or_else(|| PdfError::FontNotFound(variant_name.to_string()))?;

        let objects = data.to_pdf_objects();

        let font_file_id = self.inner.add_object(objects.font_file_stream);

        let mut descriptor = objects.font_descriptor;
        descriptor.set("FontFile2", Object::Reference(font_file_id));
        let descriptor_id = self.inner.add_object(descriptor);

        let mut cid_font = objects.cid_font;
        cid_font.set("FontDescriptor", Object::Reference(descriptor_id));
        let cid_font_id = self.inner.add_object(cid_font);

        let tounicode_id = self.inner.add_object(objects.tounicode_stream);

        let mut type0 = objects.type0_font;
        type0.set(
            "DescendantFonts",
            Object::Array(vec![Object::Reference(cid_font_id)]),
        );
        type0.set("ToUnicode", Object::Reference(tounicode_id));

        Ok(self.inner.add_object(type0))
    }

    /// Flush buffered content and resources into the page object
    fn finalize(&mut self) -> Result<()> {
        let content = std::mem::take(&mut self.content);
        let content_id = self
            .inner
            .add_object(Stream::new(dictionary! {}, content));

        let mut font_dict = lopdf::Dictionary::new();
        let variant_names: Vec<(String, String)> = self
            .font_resources
            .iter()
            .map(|(variant, resource)| (variant.clone(), resource.clone()))
            .collect();
        for (variant, resource) in variant_names {
            let font_id = self.embed_font(&variant)?;
            font_dict.set(resource.as_bytes().to_vec(), Object::Reference(font_id));
        }

        let mut xobject_dict = lopdf::Dictionary::new();
        for (object_id, resource) in self.image_resources.values() {
            xobject_dict.set(resource.as_bytes().to_vec(), Object::Reference(*object_id));
        }

        let mut resources = lopdf::Dictionary::new();
        if !font_dict.is_empty() {
            resources.set("Font", font_dict);
        }
        if !xobject_dict.is_empty() {
            resources.set("XObject", xobject_dict);
        }

        let page = self
            .inner
            .get_object_mut(self.page_id)?
            .as_dict_mut()
            .map_err(|_| PdfError::SaveError("page object is not a dictionary".to_string()))?;
        page.set("Contents", Object::Reference(content_id));
        page.set("Resources", resources);
        Ok(())
    }

    /// Finalize and write the document to a file
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.finalize()?;
        self.inner
            .save(path)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(())
    }

    /// Finalize and return the document bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        self.finalize()?;
        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(buffer)
    }
}
