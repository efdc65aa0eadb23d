//! Page-level types.

use super::Fragment;
use serde::{Deserialize, Serialize};

/// The fragments of a single page together with its geometry.
///
/// Produced unordered by the extractor; after reading-order resolution the
/// fragments are in reading order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageStream {
    /// Page number (1-indexed)
    pub number: u32,

    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Fragments on the page
    pub fragments: Vec<Fragment>,
}

impl PageStream {
    /// Create an empty page with the given dimensions.
    pub fn new(number: u32, width: f32, height: f32) -> Self {
        Self {
            number,
            width,
            height,
            fragments: Vec::new(),
        }
    }

    /// Create a new page with standard Letter size (8.5 x 11 inches).
    pub fn letter(number: u32) -> Self {
        Self::new(number, 612.0, 792.0)
    }

    /// Create a new page with standard A4 size (210 x 297 mm).
    pub fn a4(number: u32) -> Self {
        Self::new(number, 595.0, 842.0)
    }

    /// Add a fragment.
    pub fn push(&mut self, fragment: Fragment) {
        self.fragments.push(fragment);
    }

    /// Whether the page geometry and every fragment box are finite.
    pub fn has_finite_geometry(&self) -> bool {
        self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
            && self.fragments.iter().all(|f| f.bbox.is_finite())
    }

    /// Whether the page has no fragments.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Number of text fragments.
    pub fn text_count(&self) -> usize {
        self.fragments.iter().filter(|f| f.as_text().is_some()).count()
    }

    /// Number of image fragments.
    pub fn image_count(&self) -> usize {
        self.fragments.iter().filter(|f| f.is_image()).count()
    }

    /// Plain text of the page in current fragment order.
    pub fn plain_text(&self) -> String {
        self.fragments
            .iter()
            .filter_map(|f| f.as_text().map(|t| t.text.as_str()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundingBox, FragmentId, TextContent};

    #[test]
    fn test_page_new() {
        let page = PageStream::letter(1);
        assert_eq!(page.number, 1);
        assert_eq!(page.width, 612.0);
        assert_eq!(page.height, 792.0);
        assert!(page.is_empty());
    }

    #[test]
    fn test_geometry_check() {
        let mut page = PageStream::a4(2);
        page.push(Fragment::text(
            FragmentId::new(2, 0),
            BoundingBox::new(72.0, 72.0, 100.0, 12.0),
            TextContent::new("Hello", "Helvetica", 12.0),
        ));
        assert!(page.has_finite_geometry());
        assert_eq!(page.text_count(), 1);
        assert_eq!(page.plain_text(), "Hello");

        page.push(Fragment::text(
            FragmentId::new(2, 1),
            BoundingBox::new(f32::INFINITY, 0.0, 1.0, 1.0),
            TextContent::new("x", "Helvetica", 12.0),
        ));
        assert!(!page.has_finite_geometry());
    }
}
