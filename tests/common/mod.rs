//! Shared fixtures: an in-memory backend driven by content operations.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};

use pdf2epub::error::{Error, Result};
use pdf2epub::model::{ImageContent, ImageEncoding, Metadata};
use pdf2epub::parser::{
    BackendFontInfo, ContentOp, GlyphWidths, ObjectRef, PageId, PdfBackend, PdfValue,
    ResourceScope, XObject,
};

/// Byte marking text the mock fonts cannot decode.
pub const UNDECODABLE: u8 = 0xFF;

/// A backend serving hand-written content streams.
#[derive(Default)]
pub struct MockBackend {
    pages: BTreeMap<u32, [f32; 4]>,
    streams: HashMap<Vec<u8>, Vec<ContentOp>>,
    xobjects: HashMap<Vec<u8>, XObject>,
    widths: HashMap<Vec<u8>, GlyphWidths>,
    metadata: Metadata,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a US Letter page.
    pub fn page(self, ops: Vec<ContentOp>) -> Self {
        self.page_sized(612.0, 792.0, ops)
    }

    /// Append a page of the given size.
    pub fn page_sized(mut self, width: f32, height: f32, ops: Vec<ContentOp>) -> Self {
        let number = self.pages.len() as u32 + 1;
        self.pages.insert(number, [0.0, 0.0, width, height]);
        self.streams.insert(page_key(number), ops);
        self
    }

    /// Register an image XObject.
    pub fn image(mut self, name: &str, image: ImageContent) -> Self {
        self.xobjects
            .insert(name.as_bytes().to_vec(), XObject::Image(image));
        self
    }

    /// Register a form XObject.
    pub fn form(mut self, name: &str, id: ObjectRef, ops: Vec<ContentOp>) -> Self {
        let key = format!("form {} {}", id.0, id.1).into_bytes();
        self.streams.insert(key.clone(), ops);
        self.xobjects.insert(
            name.as_bytes().to_vec(),
            XObject::Form {
                id,
                content: key,
                matrix: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            },
        );
        self
    }

    /// Give a font explicit glyph widths.
    pub fn font_widths(mut self, font: &str, widths: GlyphWidths) -> Self {
        self.widths.insert(font.as_bytes().to_vec(), widths);
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.metadata.title = Some(title.to_string());
        self
    }
}

fn page_key(number: u32) -> Vec<u8> {
    format!("page {}", number).into_bytes()
}

impl PdfBackend for MockBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.pages.keys().map(|&n| (n, (n, 0))).collect()
    }

    fn media_box(&self, page: PageId) -> [f32; 4] {
        self.pages
            .get(&page.0)
            .copied()
            .unwrap_or([0.0, 0.0, 612.0, 792.0])
    }

    fn fonts(&self, _scope: &ResourceScope) -> Result<Vec<BackendFontInfo>> {
        Ok([
            ("F1", "Helvetica"),
            ("F2", "Helvetica-Bold"),
            ("F3", "Helvetica-Oblique"),
        ]
        .iter()
        .map(|(name, base)| BackendFontInfo {
            name: name.as_bytes().to_vec(),
            base_font: base.to_string(),
        })
        .collect())
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>> {
        Ok(page_key(page.0))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        self.streams
            .get(data)
            .cloned()
            .ok_or_else(|| Error::UnreadableSource("unknown stream".to_string()))
    }

    fn decode_text(&self, _scope: &ResourceScope, _font: &[u8], bytes: &[u8]) -> Option<String> {
        if bytes.contains(&UNDECODABLE) {
            return None;
        }
        String::from_utf8(bytes.to_vec()).ok()
    }

    fn glyph_widths(&self, _scope: &ResourceScope, font: &[u8]) -> Option<GlyphWidths> {
        self.widths.get(font).cloned()
    }

    fn xobject(&self, _scope: &ResourceScope, name: &[u8]) -> Option<XObject> {
        self.xobjects.get(name).cloned()
    }

    fn metadata(&self) -> Metadata {
        let mut metadata = self.metadata.clone();
        metadata.page_count = self.pages.len() as u32;
        metadata
    }
}

fn num(v: f32) -> PdfValue {
    PdfValue::Real(v)
}

fn name(n: &str) -> PdfValue {
    PdfValue::Name(n.as_bytes().to_vec())
}

/// One text run at user-space `(x, y)`: `BT /font size Tf x y Td (text) Tj ET`.
pub fn text(font: &str, size: f32, x: f32, y: f32, s: &str) -> Vec<ContentOp> {
    raw_text(font, size, x, y, s.as_bytes())
}

pub fn raw_text(font: &str, size: f32, x: f32, y: f32, bytes: &[u8]) -> Vec<ContentOp> {
    vec![
        ContentOp::new("BT", vec![]),
        ContentOp::new("Tf", vec![name(font), num(size)]),
        ContentOp::new("Td", vec![num(x), num(y)]),
        ContentOp::new("Tj", vec![PdfValue::Str(bytes.to_vec())]),
        ContentOp::new("ET", vec![]),
    ]
}

/// Draw a named XObject into the rectangle at `(x, y)`.
pub fn draw(name_: &str, x: f32, y: f32, width: f32, height: f32) -> Vec<ContentOp> {
    vec![
        ContentOp::new("q", vec![]),
        ContentOp::new(
            "cm",
            vec![num(width), num(0.0), num(0.0), num(height), num(x), num(y)],
        ),
        ContentOp::new("Do", vec![name(name_)]),
        ContentOp::new("Q", vec![]),
    ]
}

/// Concatenate operation lists.
pub fn ops(parts: Vec<Vec<ContentOp>>) -> Vec<ContentOp> {
    parts.into_iter().flatten().collect()
}

/// A small decodable RGB image, distinct per `shade`.
pub fn rgb_image(shade: u8) -> ImageContent {
    let mut image = ImageContent::new(vec![shade; 2 * 2 * 3], ImageEncoding::Raw { components: 3 }, 2, 2);
    image.color_space = Some("DeviceRGB".to_string());
    image
}

/// An image claiming to be PNG whose bytes are not.
pub fn broken_png() -> ImageContent {
    ImageContent::new(b"definitely not a png".to_vec(), ImageEncoding::Png, 10, 10)
}

/// Body lines of 12pt text starting at `top_y`, 15pt apart.
pub fn body_lines(top_y: f32, lines: &[&str]) -> Vec<ContentOp> {
    ops(lines
        .iter()
        .enumerate()
        .map(|(i, line)| text("F1", 12.0, 72.0, top_y - 15.0 * i as f32, line))
        .collect())
}
