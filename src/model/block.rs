//! Structural blocks produced by segmentation.

use super::Fragment;
use serde::{Deserialize, Serialize};

/// A structural unit of the reflowable document.
///
/// Text blocks own their fragments in reading order; an image block owns
/// exactly one image fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Body text
    Paragraph { fragments: Vec<Fragment> },

    /// Heading with level 1 (most prominent) and up
    Heading {
        level: u8,
        fragments: Vec<Fragment>,
        /// Anchor id inside the chapter, assigned by the chapter builder
        anchor: Option<String>,
    },

    /// A placed raster image
    Image { fragment: Fragment },

    /// One list item
    ListItem {
        ordered: bool,
        fragments: Vec<Fragment>,
    },
}

impl Block {
    /// Create a paragraph.
    pub fn paragraph(fragments: Vec<Fragment>) -> Self {
        Block::Paragraph { fragments }
    }

    /// Create a heading without an anchor.
    pub fn heading(level: u8, fragments: Vec<Fragment>) -> Self {
        Block::Heading {
            level,
            fragments,
            anchor: None,
        }
    }

    /// Create an image block.
    pub fn image(fragment: Fragment) -> Self {
        Block::Image { fragment }
    }

    /// Create a list item.
    pub fn list_item(ordered: bool, fragments: Vec<Fragment>) -> Self {
        Block::ListItem { ordered, fragments }
    }

    /// Fragments owned by this block, in order.
    pub fn fragments(&self) -> &[Fragment] {
        match self {
            Block::Paragraph { fragments }
            | Block::Heading { fragments, .. }
            | Block::ListItem { fragments, .. } => fragments,
            Block::Image { fragment } => std::slice::from_ref(fragment),
        }
    }

    /// Heading level, if this is a heading.
    pub fn heading_level(&self) -> Option<u8> {
        match self {
            Block::Heading { level, .. } => Some(*level),
            _ => None,
        }
    }

    pub fn is_heading(&self) -> bool {
        matches!(self, Block::Heading { .. })
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Block::Image { .. })
    }

    /// Page of the first fragment.
    pub fn first_page(&self) -> Option<u32> {
        self.fragments().first().map(|f| f.page())
    }

    /// Page of the last fragment.
    pub fn last_page(&self) -> Option<u32> {
        self.fragments().last().map(|f| f.page())
    }

    /// Joined text of the block's fragments, whitespace-collapsed.
    pub fn plain_text(&self) -> String {
        let joined = self
            .fragments()
            .iter()
            .map(|f| f.text_str())
            .collect::<Vec<_>>()
            .join(" ");
        joined.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Short name used in logs and statistics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Block::Paragraph { .. } => "paragraph",
            Block::Heading { .. } => "heading",
            Block::Image { .. } => "image",
            Block::ListItem { .. } => "list_item",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundingBox, FragmentId, ImageContent, ImageEncoding, TextContent};

    fn text(seq: u32, s: &str) -> Fragment {
        Fragment::text(
            FragmentId::new(1, seq),
            BoundingBox::new(0.0, seq as f32 * 14.0, 100.0, 12.0),
            TextContent::new(s, "Times-Roman", 12.0),
        )
    }

    #[test]
    fn test_block_fragments() {
        let block = Block::paragraph(vec![text(0, "Hello"), text(1, "  world ")]);
        assert_eq!(block.fragments().len(), 2);
        assert_eq!(block.plain_text(), "Hello world");
        assert_eq!(block.first_page(), Some(1));
        assert_eq!(block.last_page(), Some(1));
        assert_eq!(block.heading_level(), None);
    }

    #[test]
    fn test_image_block_owns_one_fragment() {
        let image = Fragment::image(
            FragmentId::new(3, 0),
            BoundingBox::new(0.0, 0.0, 200.0, 100.0),
            ImageContent::new(vec![1, 2, 3], ImageEncoding::Jpeg, 20, 10),
        );
        let block = Block::image(image);
        assert_eq!(block.fragments().len(), 1);
        assert!(block.is_image());
        assert_eq!(block.kind_name(), "image");
    }

    #[test]
    fn test_heading_level() {
        let block = Block::heading(2, vec![text(0, "Methods")]);
        assert!(block.is_heading());
        assert_eq!(block.heading_level(), Some(2));
    }
}
