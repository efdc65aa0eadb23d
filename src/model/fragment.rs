//! Positioned content fragments extracted from PDF pages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a fragment: its page and its position in extraction order.
///
/// Ordering by `FragmentId` is the stable extraction order used to break
/// ties in reading-order analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FragmentId {
    /// Page number (1-indexed)
    pub page: u32,
    /// Extraction sequence within the page
    pub seq: u32,
}

impl FragmentId {
    /// Create a fragment id.
    pub fn new(page: u32, seq: u32) -> Self {
        Self { page, seq }
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}#{}", self.page, self.seq)
    }
}

/// Axis-aligned box in page units, top-left origin, y growing downward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Vertical centre.
    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    /// Whether every coordinate is finite and the extents are non-negative.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width >= 0.0
            && self.height >= 0.0
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        BoundingBox::new(left, top, right - left, bottom - top)
    }
}

/// Font weight of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

/// Font style of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

/// A text run with its styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    /// Decoded text
    pub text: String,
    /// Base font name (e.g., "Helvetica-Bold")
    pub font_name: String,
    /// Effective font size in points
    pub font_size: f32,
    pub weight: FontWeight,
    pub style: FontStyle,
    /// Set when the bytes could not be decoded with the font encoding
    pub undecodable: bool,
}

impl TextContent {
    /// Create a text run, deriving weight and style from the font name.
    pub fn new(text: impl Into<String>, font_name: impl Into<String>, font_size: f32) -> Self {
        let font_name = font_name.into();
        let lower = font_name.to_lowercase();
        let weight = if ["bold", "black", "heavy", "semibold", "demi"]
            .iter()
            .any(|w| lower.contains(w))
        {
            FontWeight::Bold
        } else {
            FontWeight::Normal
        };
        let style = if lower.contains("italic") || lower.contains("oblique") {
            FontStyle::Italic
        } else {
            FontStyle::Normal
        };

        Self {
            text: text.into(),
            font_name,
            font_size,
            weight,
            style,
            undecodable: false,
        }
    }

    pub fn is_bold(&self) -> bool {
        self.weight == FontWeight::Bold
    }

    pub fn is_italic(&self) -> bool {
        self.style == FontStyle::Italic
    }
}

/// How the image samples of an image fragment are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageEncoding {
    /// DCTDecode stream, a complete JPEG file
    Jpeg,
    /// A complete PNG file
    Png,
    /// A complete GIF file
    Gif,
    /// JPXDecode stream (JPEG 2000)
    Jpeg2000,
    /// CCITT fax encoded bi-level samples
    Ccitt,
    /// JBIG2 encoded bi-level samples
    Jbig2,
    /// Decoded raw samples, `components` per pixel
    Raw { components: u8 },
    /// Samples in a colour space or filter chain that is not decoded
    Unknown,
}

impl ImageEncoding {
    /// MIME type the bytes can be embedded as without transcoding, if any.
    pub fn passthrough_mime(&self) -> Option<&'static str> {
        match self {
            ImageEncoding::Jpeg => Some("image/jpeg"),
            ImageEncoding::Png => Some("image/png"),
            ImageEncoding::Gif => Some("image/gif"),
            _ => None,
        }
    }
}

/// An embedded raster image and its sample description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    /// Image bytes as stored in (or decoded from) the source
    #[serde(skip_serializing, default)]
    pub data: Vec<u8>,
    pub encoding: ImageEncoding,
    /// Width in pixels
    pub pixel_width: u32,
    /// Height in pixels
    pub pixel_height: u32,
    /// Bits per colour component
    pub bits_per_component: u8,
    /// Source colour space name (e.g., "DeviceRGB")
    pub color_space: Option<String>,
}

impl ImageContent {
    /// Create an image with the given encoding and pixel dimensions.
    pub fn new(data: Vec<u8>, encoding: ImageEncoding, pixel_width: u32, pixel_height: u32) -> Self {
        Self {
            data,
            encoding,
            pixel_width,
            pixel_height,
            bits_per_component: 8,
            color_space: None,
        }
    }
}

/// Payload of a fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FragmentKind {
    Text(TextContent),
    Image(ImageContent),
}

/// One positioned atomic content unit of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: FragmentId,
    pub bbox: BoundingBox,
    pub kind: FragmentKind,
}

impl Fragment {
    /// Create a text fragment.
    pub fn text(id: FragmentId, bbox: BoundingBox, content: TextContent) -> Self {
        Self {
            id,
            bbox,
            kind: FragmentKind::Text(content),
        }
    }

    /// Create an image fragment.
    pub fn image(id: FragmentId, bbox: BoundingBox, content: ImageContent) -> Self {
        Self {
            id,
            bbox,
            kind: FragmentKind::Image(content),
        }
    }

    /// Page number (1-indexed).
    pub fn page(&self) -> u32 {
        self.id.page
    }

    pub fn as_text(&self) -> Option<&TextContent> {
        match &self.kind {
            FragmentKind::Text(t) => Some(t),
            FragmentKind::Image(_) => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageContent> {
        match &self.kind {
            FragmentKind::Image(i) => Some(i),
            FragmentKind::Text(_) => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self.kind, FragmentKind::Image(_))
    }

    /// Text of a text fragment, empty for images.
    pub fn text_str(&self) -> &str {
        self.as_text().map(|t| t.text.as_str()).unwrap_or("")
    }

    /// Font size of a text fragment.
    pub fn font_size(&self) -> Option<f32> {
        self.as_text().map(|t| t.font_size)
    }

    pub fn is_undecodable(&self) -> bool {
        self.as_text().map(|t| t.undecodable).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_style_from_font_name() {
        let bold = TextContent::new("Title", "Helvetica-Bold", 18.0);
        assert!(bold.is_bold());
        assert!(!bold.is_italic());

        let italic = TextContent::new("aside", "Times-Oblique", 10.0);
        assert!(!italic.is_bold());
        assert!(italic.is_italic());

        let semibold = TextContent::new("x", "MinionPro-Semibold", 10.0);
        assert!(semibold.is_bold());
    }

    #[test]
    fn test_bbox_edges_and_union() {
        let a = BoundingBox::new(10.0, 20.0, 30.0, 10.0);
        let b = BoundingBox::new(50.0, 15.0, 10.0, 10.0);
        assert_eq!(a.right(), 40.0);
        assert_eq!(a.bottom(), 30.0);
        let u = a.union(&b);
        assert_eq!(u, BoundingBox::new(10.0, 15.0, 50.0, 15.0));
    }

    #[test]
    fn test_bbox_finite() {
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_finite());
        assert!(!BoundingBox::new(f32::NAN, 0.0, 1.0, 1.0).is_finite());
        assert!(!BoundingBox::new(0.0, 0.0, -1.0, 1.0).is_finite());
    }

    #[test]
    fn test_fragment_id_order() {
        assert!(FragmentId::new(1, 9) < FragmentId::new(2, 0));
        assert!(FragmentId::new(2, 1) < FragmentId::new(2, 3));
        assert_eq!(FragmentId::new(3, 7).to_string(), "p3#7");
    }

    #[test]
    fn test_passthrough_mime() {
        assert_eq!(ImageEncoding::Jpeg.passthrough_mime(), Some("image/jpeg"));
        assert_eq!(ImageEncoding::Raw { components: 3 }.passthrough_mime(), None);
        assert_eq!(ImageEncoding::Jpeg2000.passthrough_mime(), None);
    }
}
