//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for PDF operations, isolating
//! the concrete PDF library (lopdf) from extraction and layout analysis.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::model::{ImageContent, ImageEncoding, Metadata};

/// Object identifier: (object number, generation number).
pub type ObjectRef = (u32, u16);

/// Page identifier.
pub type PageId = ObjectRef;

/// Where resource names (fonts, XObjects) are looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceScope {
    /// The page being extracted
    pub page: PageId,
    /// The form XObject currently being drawn, if any
    pub form: Option<ObjectRef>,
}

impl ResourceScope {
    /// Scope of a page's own content stream.
    pub fn page(page: PageId) -> Self {
        Self { page, form: None }
    }

    /// Scope inside a form XObject drawn on `self.page`.
    pub fn form(&self, form: ObjectRef) -> Self {
        Self {
            page: self.page,
            form: Some(form),
        }
    }
}

/// Font information returned by the backend.
#[derive(Debug, Clone)]
pub struct BackendFontInfo {
    /// Font resource name (key in the font dictionary).
    pub name: Vec<u8>,
    /// Base font name (e.g., "Helvetica-Bold").
    pub base_font: String,
}

/// Glyph advances of one font, in thousandths of text space units.
///
/// Simple fonts index `/Widths` by one-byte codes from `/FirstChar`; composite
/// (Type0) fonts use two-byte codes looked up in the descendant's `/W` array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlyphWidths {
    widths: HashMap<u32, f32>,
    /// Width of codes with no entry (`/MissingWidth` or `/DW`)
    default_width: Option<f32>,
    /// Bytes per character code
    code_len: usize,
}

impl GlyphWidths {
    /// Widths of a simple font: `widths[i]` belongs to code `first_char + i`.
    pub fn simple(first_char: u32, widths: &[f32], missing_width: Option<f32>) -> Self {
        Self {
            widths: widths
                .iter()
                .enumerate()
                .map(|(i, w)| (first_char + i as u32, *w))
                .collect(),
            default_width: missing_width,
            code_len: 1,
        }
    }

    /// Widths of a composite font with two-byte codes.
    pub fn composite(widths: HashMap<u32, f32>, default_width: f32) -> Self {
        Self {
            widths,
            default_width: Some(default_width),
            code_len: 2,
        }
    }

    /// Width of one character code.
    pub fn width(&self, code: u32) -> Option<f32> {
        self.widths.get(&code).copied().or(self.default_width)
    }

    /// Split a shown string into character codes.
    pub fn codes<'b>(&self, bytes: &'b [u8]) -> impl Iterator<Item = u32> + 'b {
        bytes
            .chunks(self.code_len.max(1))
            .map(|chunk| chunk.iter().fold(0u32, |code, b| (code << 8) | *b as u32))
    }

    /// Bytes per character code.
    pub fn code_len(&self) -> usize {
        self.code_len
    }

    /// Total advance of a shown string; codes without a width count as `fallback`.
    pub fn measure(&self, bytes: &[u8], fallback: f32) -> f32 {
        self.codes(bytes)
            .map(|code| self.width(code).unwrap_or(fallback))
            .sum()
    }
}

/// Parse a CIDFont `/W` array: `c [w1 w2 ...]` and `c_first c_last w` entries.
pub fn parse_cid_widths(array: &[PdfValue]) -> HashMap<u32, f32> {
    // Wider ranges are malformed
    const MAX_RANGE: u32 = 0xFFFF;

    let mut widths = HashMap::new();
    let mut i = 0;
    while i < array.len() {
        let Some(first) = get_number_from_value(&array[i]).filter(|v| *v >= 0.0) else {
            break;
        };
        let first = first as u32;
        match array.get(i + 1) {
            Some(PdfValue::Array(list)) => {
                for (offset, w) in list.iter().enumerate() {
                    if let Some(w) = get_number_from_value(w) {
                        widths.insert(first + offset as u32, w);
                    }
                }
                i += 2;
            }
            Some(last) => {
                let (Some(last), Some(w)) = (
                    get_number_from_value(last),
                    array.get(i + 2).and_then(get_number_from_value),
                ) else {
                    break;
                };
                let last = last.max(0.0) as u32;
                if last < first || last - first > MAX_RANGE {
                    break;
                }
                for cid in first..=last {
                    widths.insert(cid, w);
                }
                i += 3;
            }
            None => break,
        }
    }
    widths
}

/// A value from a PDF content stream operand.
#[derive(Debug, Clone)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    /// Create an operation.
    pub fn new(operator: impl Into<String>, operands: Vec<PdfValue>) -> Self {
        Self {
            operator: operator.into(),
            operands,
        }
    }
}

/// An external object referenced by the `Do` operator.
#[derive(Debug, Clone)]
pub enum XObject {
    /// Image XObject, drawn into the unit square of the current CTM.
    Image(ImageContent),
    /// Form XObject with its own content stream.
    Form {
        id: ObjectRef,
        content: Vec<u8>,
        matrix: [f32; 6],
    },
}

/// Abstract interface for PDF document access.
///
/// Implementations provide page enumeration, font info, content stream
/// decoding, text decoding and XObject lookup without exposing any
/// concrete PDF library types.
pub trait PdfBackend {
    /// Return all pages as (page_number → PageId).
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Page media box as `[llx, lly, urx, ury]` in default user space.
    fn media_box(&self, page: PageId) -> [f32; 4];

    /// Return font info for a resource scope.
    fn fonts(&self, scope: &ResourceScope) -> Result<Vec<BackendFontInfo>>;

    /// Return the raw (decompressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>>;

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// Decode a text byte sequence using the font's encoding.
    ///
    /// Returns `None` when the bytes cannot be decoded with that encoding.
    fn decode_text(&self, scope: &ResourceScope, font_name: &[u8], bytes: &[u8])
        -> Option<String>;

    /// Glyph widths of a font, `None` when the font carries none.
    fn glyph_widths(&self, _scope: &ResourceScope, _font_name: &[u8]) -> Option<GlyphWidths> {
        None
    }

    /// Look up a named XObject.
    fn xobject(&self, scope: &ResourceScope, name: &[u8]) -> Option<XObject>;

    /// Document metadata from the Info dictionary and catalog.
    fn metadata(&self) -> Metadata;
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // UTF-16BE with BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter_map(|c| {
                if c.len() == 2 {
                    Some(u16::from_be_bytes([c[0], c[1]]))
                } else {
                    None
                }
            })
            .collect();
        return String::from_utf16(&utf16).unwrap_or_default();
    }

    if let Ok(s) = String::from_utf8(bytes.to_vec()) {
        return s;
    }

    // Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

/// Whether decoded text carries no usable characters.
pub fn is_garbage_text(text: &str) -> bool {
    let mut visible = text.chars().filter(|c| !c.is_whitespace()).peekable();
    visible.peek().is_some() && visible.all(|c| c == '\u{FFFD}' || c.is_control())
}

// ---------------------------------------------------------------------------
// LopdfBackend: concrete implementation backed by lopdf
// ---------------------------------------------------------------------------

use lopdf::{Dictionary, Document as LopdfDocument, Object};

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let doc = LopdfDocument::load(path)?;
        Self::from_document(doc)
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)?;
        Self::from_document(doc)
    }

    /// Load from a reader.
    pub fn load_reader<R: std::io::Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::load_bytes(&data)
    }

    /// Wrap an already parsed document.
    pub fn from_document(doc: LopdfDocument) -> Result<Self> {
        if doc.get_pages().is_empty() && doc.catalog().is_err() {
            return Err(Error::UnreadableSource(
                "document has no catalog".to_string(),
            ));
        }
        Ok(Self { doc })
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }

    /// Get PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn deref<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(r) => self.doc.get_object(*r).ok(),
            other => Some(other),
        }
    }

    fn deref_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match self.deref(obj)? {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Resources dictionary of a scope, following page tree inheritance.
    fn resources(&self, scope: &ResourceScope) -> Option<&Dictionary> {
        if let Some(form) = scope.form {
            if let Ok(Object::Stream(stream)) = self.doc.get_object(form) {
                if let Some(res) = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|o| self.deref_dict(o))
                {
                    return Some(res);
                }
            }
        }

        let mut node = self.doc.get_dictionary(scope.page).ok();
        let mut hops = 0;
        while let Some(dict) = node {
            if let Some(res) = dict.get(b"Resources").ok().and_then(|o| self.deref_dict(o)) {
                return Some(res);
            }
            hops += 1;
            if hops > 32 {
                break;
            }
            node = dict.get(b"Parent").ok().and_then(|o| self.deref_dict(o));
        }
        None
    }

    fn font_dict(&self, scope: &ResourceScope, font_name: &[u8]) -> Option<&Dictionary> {
        let fonts = self.resources(scope)?.get(b"Font").ok()?;
        let fonts = self.deref_dict(fonts)?;
        self.deref_dict(fonts.get(font_name).ok()?)
    }

    /// Inherited page attribute (MediaBox, Rotate, ...).
    fn inherited(&self, page: PageId, key: &[u8]) -> Option<&Object> {
        let mut node = self.doc.get_dictionary(page).ok();
        let mut hops = 0;
        while let Some(dict) = node {
            if let Ok(value) = dict.get(key) {
                return self.deref(value);
            }
            hops += 1;
            if hops > 32 {
                break;
            }
            node = dict.get(b"Parent").ok().and_then(|o| self.deref_dict(o));
        }
        None
    }

    fn image_content(&self, stream: &lopdf::Stream) -> ImageContent {
        let dict = &stream.dict;
        let width = dict
            .get(b"Width")
            .ok()
            .and_then(|w| w.as_i64().ok())
            .unwrap_or(0)
            .max(0) as u32;
        let height = dict
            .get(b"Height")
            .ok()
            .and_then(|h| h.as_i64().ok())
            .unwrap_or(0)
            .max(0) as u32;
        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|b| b.as_i64().ok())
            .unwrap_or(8) as u8;

        let filters: Vec<Vec<u8>> = match dict.get(b"Filter").ok().and_then(|f| self.deref(f)) {
            Some(Object::Name(name)) => vec![name.clone()],
            Some(Object::Array(arr)) => arr
                .iter()
                .filter_map(|o| o.as_name().ok().map(|n| n.to_vec()))
                .collect(),
            _ => Vec::new(),
        };

        let color_space = dict.get(b"ColorSpace").ok().and_then(|o| self.deref(o));
        let color_space_name = color_space.and_then(|cs| match cs {
            Object::Name(n) => Some(String::from_utf8_lossy(n).to_string()),
            Object::Array(arr) => arr
                .first()
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).to_string()),
            _ => None,
        });

        let (encoding, data) = match filters.last().map(|f| f.as_slice()) {
            Some(b"DCTDecode") | Some(b"DCT") => (ImageEncoding::Jpeg, self.encoded_payload(stream, &filters)),
            Some(b"JPXDecode") => (ImageEncoding::Jpeg2000, stream.content.clone()),
            Some(b"CCITTFaxDecode") | Some(b"CCF") => (ImageEncoding::Ccitt, stream.content.clone()),
            Some(b"JBIG2Decode") => (ImageEncoding::Jbig2, stream.content.clone()),
            _ => {
                let samples = if filters.is_empty() {
                    Ok(stream.content.clone())
                } else {
                    stream.decompressed_content()
                };
                match samples {
                    Ok(samples) => self.raw_samples(samples, color_space, bits, width, height),
                    Err(e) => {
                        log::debug!("image samples could not be decompressed: {}", e);
                        (ImageEncoding::Unknown, stream.content.clone())
                    }
                }
            }
        };

        let mut image = ImageContent::new(data, encoding, width, height);
        image.bits_per_component = bits;
        image.color_space = color_space_name;
        image
    }

    /// JPEG payload with any leading general-purpose filters removed.
    fn encoded_payload(&self, stream: &lopdf::Stream, filters: &[Vec<u8>]) -> Vec<u8> {
        if filters.len() > 1 {
            let mut plain = stream.clone();
            plain.dict.set("Filter", Object::Name(filters[0].clone()));
            if let Ok(data) = plain.decompressed_content() {
                return data;
            }
        }
        stream.content.clone()
    }

    fn raw_samples(
        &self,
        samples: Vec<u8>,
        color_space: Option<&Object>,
        bits: u8,
        width: u32,
        height: u32,
    ) -> (ImageEncoding, Vec<u8>) {
        match color_space {
            Some(Object::Array(arr))
                if arr.first().and_then(|o| o.as_name().ok()) == Some(b"Indexed".as_slice()) =>
            {
                self.expand_indexed(arr, &samples, bits, width, height)
                    .unwrap_or((ImageEncoding::Unknown, samples))
            }
            Some(cs) => match self.components(cs) {
                Some(components) => (ImageEncoding::Raw { components }, samples),
                None => (ImageEncoding::Unknown, samples),
            },
            // Image masks and stencils carry no colour space
            None => (ImageEncoding::Raw { components: 1 }, samples),
        }
    }

    /// Colour components per pixel of a (non-indexed) colour space.
    fn components(&self, cs: &Object) -> Option<u8> {
        match cs {
            Object::Name(name) => match name.as_slice() {
                b"DeviceGray" | b"G" | b"CalGray" => Some(1),
                b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(3),
                b"DeviceCMYK" | b"CMYK" => Some(4),
                _ => None,
            },
            Object::Array(arr) => match arr.first().and_then(|o| o.as_name().ok())? {
                b"ICCBased" => {
                    let profile = arr.get(1).and_then(|o| self.deref_dict(o))?;
                    profile
                        .get(b"N")
                        .ok()
                        .and_then(|n| n.as_i64().ok())
                        .map(|n| n as u8)
                        .or(Some(3))
                }
                b"CalGray" => Some(1),
                b"CalRGB" | b"Lab" => Some(3),
                _ => None,
            },
            Object::Reference(_) => self.deref(cs).and_then(|o| self.components(o)),
            _ => None,
        }
    }

    /// Expand 8-bit palette indices into base colour samples.
    fn expand_indexed(
        &self,
        cs: &[Object],
        samples: &[u8],
        bits: u8,
        width: u32,
        height: u32,
    ) -> Option<(ImageEncoding, Vec<u8>)> {
        if bits != 8 {
            return None;
        }
        let base = self.deref(cs.get(1)?)?;
        let components = self.components(base)?;
        let lookup = match self.deref(cs.get(3)?)? {
            Object::String(bytes, _) => bytes.clone(),
            Object::Stream(s) => s.decompressed_content().unwrap_or_else(|_| s.content.clone()),
            _ => return None,
        };

        let pixels = (width as usize) * (height as usize);
        let n = components as usize;
        let mut out = Vec::with_capacity(pixels * n);
        for &index in samples.iter().take(pixels) {
            let start = index as usize * n;
            let entry = lookup.get(start..start + n)?;
            out.extend_from_slice(entry);
        }
        Some((ImageEncoding::Raw { components }, out))
    }
}

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn media_box(&self, page: PageId) -> [f32; 4] {
        let letter = [0.0, 0.0, 612.0, 792.0];
        let Some(Object::Array(array)) = self.inherited(page, b"MediaBox") else {
            return letter;
        };
        if array.len() < 4 {
            return letter;
        }
        let mut out = letter;
        for (slot, obj) in out.iter_mut().zip(array.iter()) {
            if let Some(v) = self.deref(obj).and_then(|o| o.as_float().ok()) {
                *slot = v;
            }
        }
        out
    }

    fn fonts(&self, scope: &ResourceScope) -> Result<Vec<BackendFontInfo>> {
        let Some(fonts) = self
            .resources(scope)
            .and_then(|r| r.get(b"Font").ok())
            .and_then(|f| self.deref_dict(f))
        else {
            return Ok(Vec::new());
        };

        let mut result = Vec::new();
        for (name, obj) in fonts.iter() {
            let base_font = self
                .deref_dict(obj)
                .and_then(|d| d.get(b"BaseFont").ok())
                .and_then(|o| o.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            result.push(BackendFontInfo {
                name: name.clone(),
                base_font,
            });
        }
        Ok(result)
    }

    fn page_content(&self, page_id: PageId) -> Result<Vec<u8>> {
        let page_dict = self.doc.get_dictionary(page_id)?;

        let Ok(contents) = page_dict.get(b"Contents") else {
            // A page without content is blank, not broken
            return Ok(Vec::new());
        };

        match self.deref(contents) {
            Some(Object::Stream(s)) => s.decompressed_content().map_err(Error::from),
            Some(Object::Array(arr)) => {
                let mut content = Vec::new();
                for obj in arr {
                    if let Some(Object::Stream(s)) = self.deref(obj) {
                        if let Ok(data) = s.decompressed_content() {
                            content.extend_from_slice(&data);
                            content.push(b' ');
                        }
                    }
                }
                Ok(content)
            }
            _ => Err(Error::UnreadableSource(format!(
                "invalid content stream on object {} {}",
                page_id.0, page_id.1
            ))),
        }
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        let content = lopdf::content::Content::decode(data)?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn decode_text(
        &self,
        scope: &ResourceScope,
        font_name: &[u8],
        bytes: &[u8],
    ) -> Option<String> {
        let Some(font_dict) = self.font_dict(scope, font_name) else {
            return Some(decode_text_simple(bytes));
        };
        let text = match font_dict.get_font_encoding(&self.doc) {
            Ok(enc) => LopdfDocument::decode_text(&enc, bytes).ok()?,
            Err(_) => decode_text_simple(bytes),
        };
        if is_garbage_text(&text) {
            None
        } else {
            Some(text)
        }
    }

    fn glyph_widths(&self, scope: &ResourceScope, font_name: &[u8]) -> Option<GlyphWidths> {
        let font = self.font_dict(scope, font_name)?;
        let number = |dict: &Dictionary, key: &[u8]| {
            dict.get(key)
                .ok()
                .and_then(|o| self.deref(o))
                .and_then(|o| o.as_float().ok())
        };

        if font.get(b"Subtype").ok().and_then(|o| o.as_name().ok()) == Some(b"Type0".as_slice()) {
            // Codes are taken as CIDs, which holds for the Identity encodings
            let descendants = font.get(b"DescendantFonts").ok().and_then(|o| self.deref(o))?;
            let cid_font = self.deref_dict(descendants.as_array().ok()?.first()?)?;
            let widths = match cid_font.get(b"W").ok().and_then(|o| self.deref(o)) {
                Some(Object::Array(w)) => {
                    let values: Vec<PdfValue> = w
                        .iter()
                        .map(|o| self.deref(o).map(convert_object).unwrap_or(PdfValue::Other))
                        .collect();
                    parse_cid_widths(&values)
                }
                _ => HashMap::new(),
            };
            let default_width = number(cid_font, b"DW").unwrap_or(1000.0);
            return Some(GlyphWidths::composite(widths, default_width));
        }

        let Some(Object::Array(widths)) = font.get(b"Widths").ok().and_then(|o| self.deref(o)) else {
            return None;
        };
        let widths: Vec<f32> = widths
            .iter()
            .map(|o| self.deref(o).and_then(|o| o.as_float().ok()).unwrap_or(0.0))
            .collect();
        let first_char = number(font, b"FirstChar").unwrap_or(0.0).max(0.0) as u32;
        let missing_width = font
            .get(b"FontDescriptor")
            .ok()
            .and_then(|o| self.deref_dict(o))
            .and_then(|d| number(d, b"MissingWidth"));
        Some(GlyphWidths::simple(first_char, &widths, missing_width))
    }

    fn xobject(&self, scope: &ResourceScope, name: &[u8]) -> Option<XObject> {
        let xobjects = self.resources(scope)?.get(b"XObject").ok()?;
        let entry = self.deref_dict(xobjects)?.get(name).ok()?;
        let id = entry.as_reference().ok();
        let Some(Object::Stream(stream)) = self.deref(entry) else {
            return None;
        };

        match stream.dict.get(b"Subtype").ok().and_then(|o| o.as_name().ok()) {
            Some(b"Image") => Some(XObject::Image(self.image_content(stream))),
            Some(b"Form") => {
                let content = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                let mut matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
                if let Ok(Object::Array(m)) = stream.dict.get(b"Matrix") {
                    for (slot, obj) in matrix.iter_mut().zip(m.iter()) {
                        if let Ok(v) = obj.as_float() {
                            *slot = v;
                        }
                    }
                }
                Some(XObject::Form {
                    id: id?,
                    content,
                    matrix,
                })
            }
            _ => None,
        }
    }

    fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::with_version(self.version());
        metadata.page_count = self.doc.get_pages().len() as u32;

        if let Some(info) = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|o| self.deref_dict(o))
        {
            metadata.title = get_string_from_dict(info, b"Title");
            metadata.author = get_string_from_dict(info, b"Author");
            metadata.subject = get_string_from_dict(info, b"Subject");
            metadata.keywords = get_string_from_dict(info, b"Keywords");
            metadata.creator = get_string_from_dict(info, b"Creator");
            metadata.producer = get_string_from_dict(info, b"Producer");

            if let Some(date_str) = get_string_from_dict(info, b"CreationDate") {
                metadata.created = parse_pdf_date(&date_str);
            }
            if let Some(date_str) = get_string_from_dict(info, b"ModDate") {
                metadata.modified = parse_pdf_date(&date_str);
            }
        }

        if let Ok(catalog) = self.doc.catalog() {
            metadata.language = get_string_from_dict(catalog, b"Lang");
        }

        if let Ok(Object::Array(ids)) = self.doc.trailer.get(b"ID") {
            if let Some(Object::String(bytes, _)) = ids.first() {
                if !bytes.is_empty() {
                    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
                    metadata.identifier = Some(format!("urn:pdf:{}", hex));
                }
            }
        }

        metadata
    }
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        _ => PdfValue::Other,
    }
}

/// Helper: extract a number from a [`PdfValue`].
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(r) => Some(*r),
        _ => None,
    }
}

/// Helper to get a string from a PDF dictionary.
fn get_string_from_dict(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let value = match dict.get(key).ok()? {
        Object::String(bytes, _) => decode_text_simple(bytes),
        Object::Name(bytes) => String::from_utf8(bytes.clone()).ok()?,
        _ => return None,
    };
    let value = value.trim().to_string();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Parse a PDF date string (D:YYYYMMDDHHmmSSOHH'mm').
pub fn parse_pdf_date(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let s = s.strip_prefix("D:").unwrap_or(s);

    // At minimum we need YYYY
    if s.len() < 4 {
        return None;
    }

    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month: u32 = s.get(4..6).and_then(|m| m.parse().ok()).unwrap_or(1);
    let day: u32 = s.get(6..8).and_then(|d| d.parse().ok()).unwrap_or(1);
    let hour: u32 = s.get(8..10).and_then(|h| h.parse().ok()).unwrap_or(0);
    let minute: u32 = s.get(10..12).and_then(|m| m.parse().ok()).unwrap_or(0);
    let second: u32 = s.get(12..14).and_then(|s| s.parse().ok()).unwrap_or(0);

    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .map(|dt| chrono::DateTime::from_naive_utc_and_offset(dt, chrono::Utc))
}
