//! Content extraction: walks page content streams and yields positioned fragments.
//!
//! Text positions are tracked through the graphics state (CTM, `q`/`Q`/`cm`)
//! and the text matrix (`BT`/`Td`/`TD`/`Tm`/`T*`). Runs advance by the font's
//! `/Widths` (or `/W` for composite fonts) together with character spacing,
//! word spacing and horizontal scaling. Fonts without widths fall back to an
//! estimate of half an em per glyph, a full em for CJK.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::Result;
use crate::layout::heuristics::is_spaceless_script_char;
use crate::model::{BoundingBox, Fragment, FragmentId, ImageContent, PageStream, TextContent};

use super::backend::{
    get_number_from_value, ContentOp, GlyphWidths, ObjectRef, PageId, PdfBackend, PdfValue,
    ResourceScope, XObject,
};
use super::normalize::normalize_text;
use super::options::ParseOptions;

/// Estimated glyph advance as a fraction of the font size, for fonts without widths.
const GLYPH_ADVANCE: f32 = 0.5;

/// Estimated advance of full-width (CJK) glyphs.
const WIDE_GLYPH_ADVANCE: f32 = 1.0;

/// TJ adjustment (thousandths of an em) treated as a word space.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Ascender and descender as fractions of the font size.
const ASCENT: f32 = 0.8;
const DESCENT: f32 = 0.2;

/// Affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    pub(crate) const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub(crate) fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    fn from_array(m: [f32; 6]) -> Self {
        Self::new(m[0], m[1], m[2], m[3], m[4], m[5])
    }

    fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`: apply `self` first, then `other`.
    pub(crate) fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub(crate) fn transform(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Length of the transformed unit y vector.
    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// Graphics state saved and restored by `q`/`Q`.
#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font_key: Vec<u8>,
    font_name: String,
    font_size: f32,
    /// Widths of the current font, if it has any
    widths: Option<Rc<GlyphWidths>>,
    leading: f32,
    char_spacing: f32,
    word_spacing: f32,
    /// `Tz` as a fraction
    horizontal_scale: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            font_key: Vec::new(),
            font_name: String::new(),
            font_size: 12.0,
            widths: None,
            leading: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
        }
    }
}

impl GraphicsState {
    /// Advance of a shown string in text space, before the text matrix.
    fn string_advance(&self, bytes: &[u8], decoded: Option<&str>) -> f32 {
        let size = self.font_size;
        let (glyphs, count, spaces) = match (self.widths.as_deref(), decoded) {
            (Some(widths), _) => {
                let count = widths.codes(bytes).count();
                // Word spacing applies to the single-byte code 32 only
                let spaces = if widths.code_len() == 1 {
                    bytes.iter().filter(|b| **b == b' ').count()
                } else {
                    0
                };
                let fallback = GLYPH_ADVANCE * 1000.0;
                (widths.measure(bytes, fallback) / 1000.0 * size, count, spaces)
            }
            (None, Some(text)) => (
                text.chars().map(estimated_advance).sum::<f32>() * size,
                text.chars().count(),
                text.chars().filter(|c| *c == ' ').count(),
            ),
            (None, None) => (bytes.len() as f32 * GLYPH_ADVANCE * size, bytes.len(), 0),
        };
        (glyphs + count as f32 * self.char_spacing + spaces as f32 * self.word_spacing)
            * self.horizontal_scale
    }
}

/// Estimated advance of one glyph in ems.
fn estimated_advance(c: char) -> f32 {
    if is_spaceless_script_char(c) {
        WIDE_GLYPH_ADVANCE
    } else {
        GLYPH_ADVANCE
    }
}

/// Page frame used to convert user space into top-left page coordinates.
#[derive(Debug, Clone, Copy)]
struct PageFrame {
    left: f32,
    top: f32,
}

impl PageFrame {
    /// Convert user-space extremes into a top-left-origin box.
    fn to_bbox(&self, min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> BoundingBox {
        BoundingBox::new(min_x - self.left, self.top - max_y, max_x - min_x, max_y - min_y)
    }
}

/// Reads fragments out of pages through a [`PdfBackend`].
pub struct Extractor<'a, B: PdfBackend + ?Sized> {
    backend: &'a B,
    options: &'a ParseOptions,
}

impl<'a, B: PdfBackend + ?Sized> Extractor<'a, B> {
    /// Create an extractor.
    pub fn new(backend: &'a B, options: &'a ParseOptions) -> Self {
        Self { backend, options }
    }

    /// Extract every selected page in page order.
    pub fn extract_all(&self) -> Result<Vec<PageStream>> {
        let pages = self.backend.pages();
        let mut out = Vec::with_capacity(pages.len());
        for (number, page_id) in pages {
            if !self.options.pages.includes(number) {
                continue;
            }
            out.push(self.extract_page(number, page_id)?);
        }
        Ok(out)
    }

    /// Extract the unordered fragments of one page.
    ///
    /// A page whose content stream cannot be read yields an empty stream.
    pub fn extract_page(&self, number: u32, page_id: PageId) -> Result<PageStream> {
        let [llx, lly, urx, ury] = self.backend.media_box(page_id);
        let mut page = PageStream::new(number, urx - llx, ury - lly);

        let ops = match self
            .backend
            .page_content(page_id)
            .and_then(|content| self.backend.decode_content(&content))
        {
            Ok(ops) => ops,
            Err(e) => {
                log::warn!("page {}: content stream unreadable ({}), page left empty", number, e);
                return Ok(page);
            }
        };

        let mut walk = PageWalk {
            backend: self.backend,
            options: self.options,
            number,
            frame: PageFrame { left: llx, top: ury },
            fragments: Vec::new(),
            seq: 0,
            forms: Vec::new(),
            fonts: HashMap::new(),
            widths: HashMap::new(),
        };
        walk.run(&ops, ResourceScope::page(page_id), GraphicsState::default());

        log::debug!(
            "page {}: extracted {} fragments",
            number,
            walk.fragments.len()
        );
        page.fragments = walk.fragments;
        Ok(page)
    }
}

struct PageWalk<'a, B: PdfBackend + ?Sized> {
    backend: &'a B,
    options: &'a ParseOptions,
    number: u32,
    frame: PageFrame,
    fragments: Vec<Fragment>,
    seq: u32,
    /// Forms currently being drawn, innermost last
    forms: Vec<ObjectRef>,
    /// Base font names per scope
    fonts: HashMap<Option<ObjectRef>, HashMap<Vec<u8>, String>>,
    /// Glyph widths per scope and font key
    widths: HashMap<(Option<ObjectRef>, Vec<u8>), Option<Rc<GlyphWidths>>>,
}

impl<B: PdfBackend + ?Sized> PageWalk<'_, B> {
    fn next_id(&mut self) -> FragmentId {
        let id = FragmentId::new(self.number, self.seq);
        self.seq += 1;
        id
    }

    fn base_font(&mut self, scope: &ResourceScope, key: &[u8]) -> String {
        let backend = self.backend;
        let fonts = self.fonts.entry(scope.form).or_insert_with(|| {
            backend
                .fonts(scope)
                .unwrap_or_default()
                .into_iter()
                .map(|f| (f.name, f.base_font))
                .collect()
        });
        fonts
            .get(key)
            .cloned()
            .unwrap_or_else(|| String::from_utf8_lossy(key).to_string())
    }

    fn glyph_widths(&mut self, scope: &ResourceScope, key: &[u8]) -> Option<Rc<GlyphWidths>> {
        let backend = self.backend;
        self.widths
            .entry((scope.form, key.to_vec()))
            .or_insert_with(|| backend.glyph_widths(scope, key).map(Rc::new))
            .clone()
    }

    fn run(&mut self, ops: &[ContentOp], scope: ResourceScope, initial: GraphicsState) {
        let mut gs = initial;
        let mut saved: Vec<GraphicsState> = Vec::new();
        let mut tm = Matrix::IDENTITY;
        let mut tlm = Matrix::IDENTITY;
        let mut in_text = false;

        for op in ops {
            let nums: Vec<f32> = op.operands.iter().filter_map(get_number_from_value).collect();
            match op.operator.as_str() {
                "q" => saved.push(gs.clone()),
                "Q" => {
                    if let Some(state) = saved.pop() {
                        gs = state;
                    }
                }
                "cm" => {
                    if nums.len() >= 6 {
                        let m = Matrix::new(nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]);
                        gs.ctm = m.multiply(&gs.ctm);
                    }
                }
                "BT" => {
                    in_text = true;
                    tm = Matrix::IDENTITY;
                    tlm = Matrix::IDENTITY;
                }
                "ET" => in_text = false,
                "Tf" => {
                    if let Some(PdfValue::Name(key)) = op.operands.first() {
                        gs.font_name = self.base_font(&scope, key);
                        gs.widths = self.glyph_widths(&scope, key);
                        gs.font_key = key.clone();
                    }
                    if let Some(size) = op.operands.get(1).and_then(get_number_from_value) {
                        gs.font_size = size;
                    }
                }
                "TL" => {
                    if let Some(&leading) = nums.first() {
                        gs.leading = leading;
                    }
                }
                "Tc" => {
                    if let Some(&spacing) = nums.first() {
                        gs.char_spacing = spacing;
                    }
                }
                "Tw" => {
                    if let Some(&spacing) = nums.first() {
                        gs.word_spacing = spacing;
                    }
                }
                "Tz" => {
                    if let Some(&scale) = nums.first() {
                        gs.horizontal_scale = scale / 100.0;
                    }
                }
                "Td" | "TD" => {
                    if nums.len() >= 2 {
                        if op.operator == "TD" {
                            gs.leading = -nums[1];
                        }
                        tlm = Matrix::translation(nums[0], nums[1]).multiply(&tlm);
                        tm = tlm;
                    }
                }
                "Tm" => {
                    if nums.len() >= 6 {
                        tlm = Matrix::new(nums[0], nums[1], nums[2], nums[3], nums[4], nums[5]);
                        tm = tlm;
                    }
                }
                "T*" => {
                    tlm = next_line(&gs, &tlm);
                    tm = tlm;
                }
                "Tj" | "TJ" => {
                    if in_text {
                        let items = match op.operands.first() {
                            Some(PdfValue::Array(items)) => items.as_slice(),
                            Some(single) => std::slice::from_ref(single),
                            None => &[],
                        };
                        self.show_text(&scope, &gs, &mut tm, items);
                    }
                }
                "'" | "\"" => {
                    if op.operator == "\"" && nums.len() >= 2 {
                        gs.word_spacing = nums[0];
                        gs.char_spacing = nums[1];
                    }
                    tlm = next_line(&gs, &tlm);
                    tm = tlm;
                    if in_text {
                        let idx = if op.operator == "\"" { 2 } else { 0 };
                        if let Some(item) = op.operands.get(idx) {
                            self.show_text(&scope, &gs, &mut tm, std::slice::from_ref(item));
                        }
                    }
                }
                "Do" => {
                    if let Some(PdfValue::Name(name)) = op.operands.first() {
                        self.draw_xobject(&scope, &gs, name);
                    }
                }
                _ => {}
            }
        }
    }

    fn show_text(
        &mut self,
        scope: &ResourceScope,
        gs: &GraphicsState,
        tm: &mut Matrix,
        items: &[PdfValue],
    ) {
        let size = gs.font_size;
        let start = *tm;
        let mut text = String::new();
        let mut undecodable = false;
        let mut advance = 0.0f32;

        for item in items {
            match item {
                PdfValue::Str(bytes) => {
                    let decoded = self.backend.decode_text(scope, &gs.font_key, bytes);
                    advance += gs.string_advance(bytes, decoded.as_deref());
                    match decoded {
                        Some(decoded) => text.push_str(&decoded),
                        None => undecodable = true,
                    }
                }
                other => {
                    if let Some(adjust) = get_number_from_value(other) {
                        // Negative values move the next glyph to the right
                        advance -= adjust / 1000.0 * size * gs.horizontal_scale;
                        if -adjust > TJ_SPACE_THRESHOLD
                            && !text.is_empty()
                            && !text.ends_with(' ')
                            && !text.ends_with('\u{00A0}')
                            && !text.chars().last().is_some_and(is_spaceless_script_char)
                        {
                            text.push(' ');
                        }
                    }
                }
            }
        }

        *tm = Matrix::translation(advance, 0.0).multiply(tm);

        let normalized = normalize_text(&text);
        let normalized = normalized.trim();
        if normalized.is_empty() {
            if text.trim().is_empty() && !undecodable {
                return;
            }
            undecodable = true;
        }

        let trm = start.multiply(&gs.ctm);
        let corners = [
            trm.transform(0.0, -DESCENT * size),
            trm.transform(advance, -DESCENT * size),
            trm.transform(0.0, ASCENT * size),
            trm.transform(advance, ASCENT * size),
        ];
        let bbox = self.bounds(&corners);
        let effective_size = size * trm.vertical_scale();

        let mut content = TextContent::new(
            if undecodable { "" } else { normalized },
            gs.font_name.clone(),
            effective_size,
        );
        content.undecodable = undecodable;

        let id = self.next_id();
        self.fragments.push(Fragment::text(id, bbox, content));
    }

    fn draw_xobject(&mut self, scope: &ResourceScope, gs: &GraphicsState, name: &[u8]) {
        match self.backend.xobject(scope, name) {
            Some(XObject::Image(image)) => {
                if self.options.extract_images {
                    self.place_image(gs, image);
                }
            }
            Some(XObject::Form {
                id,
                content,
                matrix,
            }) => {
                if self.forms.contains(&id) {
                    log::warn!("page {}: form XObject {:?} draws itself, skipped", self.number, id);
                    return;
                }
                if self.forms.len() >= self.options.max_form_depth as usize {
                    log::warn!(
                        "page {}: form XObject nesting deeper than {}, skipped",
                        self.number,
                        self.options.max_form_depth
                    );
                    return;
                }
                let ops = match self.backend.decode_content(&content) {
                    Ok(ops) => ops,
                    Err(e) => {
                        log::warn!("page {}: form XObject unreadable: {}", self.number, e);
                        return;
                    }
                };
                let mut inner = gs.clone();
                inner.ctm = Matrix::from_array(matrix).multiply(&gs.ctm);
                self.forms.push(id);
                self.run(&ops, scope.form(id), inner);
                self.forms.pop();
            }
            None => {
                log::debug!(
                    "page {}: XObject /{} not found",
                    self.number,
                    String::from_utf8_lossy(name)
                );
            }
        }
    }

    fn place_image(&mut self, gs: &GraphicsState, image: ImageContent) {
        let m = gs.ctm;
        let corners = [
            m.transform(0.0, 0.0),
            m.transform(1.0, 0.0),
            m.transform(0.0, 1.0),
            m.transform(1.0, 1.0),
        ];
        let bbox = self.bounds(&corners);
        let id = self.next_id();
        self.fragments.push(Fragment::image(id, bbox, image));
    }

    fn bounds(&self, corners: &[(f32, f32)]) -> BoundingBox {
        let min_x = corners.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
        let max_x = corners.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
        let min_y = corners.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
        let max_y = corners.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
        self.frame.to_bbox(min_x, min_y, max_x, max_y)
    }
}

/// Move to the start of the next line (`T*`).
fn next_line(gs: &GraphicsState, tlm: &Matrix) -> Matrix {
    let leading = if gs.leading != 0.0 {
        gs.leading
    } else {
        gs.font_size * 1.2
    };
    Matrix::translation(0.0, -leading).multiply(tlm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_multiply_translation() {
        let scale = Matrix::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let shift = Matrix::translation(10.0, 20.0);
        // scale then shift
        let m = scale.multiply(&shift);
        assert_eq!(m.transform(1.0, 1.0), (12.0, 22.0));
        // shift then scale
        let m = shift.multiply(&scale);
        assert_eq!(m.transform(1.0, 1.0), (22.0, 42.0));
    }

    #[test]
    fn test_vertical_scale() {
        let m = Matrix::new(3.0, 0.0, 0.0, 1.5, 0.0, 0.0);
        assert!((m.vertical_scale() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_page_frame_flips_y() {
        let frame = PageFrame {
            left: 0.0,
            top: 792.0,
        };
        let bbox = frame.to_bbox(72.0, 700.0, 172.0, 712.0);
        assert_eq!(bbox, BoundingBox::new(72.0, 80.0, 100.0, 12.0));
    }

    #[test]
    fn test_string_advance_uses_widths() {
        let mut gs = GraphicsState::default();
        gs.font_size = 10.0;
        gs.widths = Some(Rc::new(GlyphWidths::simple(32, &[250.0, 0.0, 0.0, 0.0], None)));
        // Two spaces of 250 plus one code without a width
        assert!((gs.string_advance(b"  A", None) - 10.0).abs() < 1e-4);

        gs.char_spacing = 1.0;
        gs.word_spacing = 2.0;
        assert!((gs.string_advance(b"  A", None) - 17.0).abs() < 1e-4);

        gs.horizontal_scale = 0.5;
        assert!((gs.string_advance(b"  A", None) - 8.5).abs() < 1e-4);
    }

    #[test]
    fn test_estimated_advance_without_widths() {
        let gs = GraphicsState::default();
        assert!((gs.string_advance(b"", Some("ab")) - 12.0).abs() < 1e-4);
        assert!((gs.string_advance(b"", Some("日本")) - 24.0).abs() < 1e-4);
        assert!((gs.string_advance(b"xyz", None) - 18.0).abs() < 1e-4);
    }

    #[test]
    fn test_next_line_uses_leading() {
        let mut gs = GraphicsState::default();
        gs.leading = 14.0;
        let tlm = Matrix::translation(72.0, 700.0);
        assert_eq!(next_line(&gs, &tlm).transform(0.0, 0.0), (72.0, 686.0));

        gs.leading = 0.0;
        gs.font_size = 10.0;
        assert_eq!(next_line(&gs, &tlm).transform(0.0, 0.0), (72.0, 688.0));
    }
}
