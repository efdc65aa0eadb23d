//! Chapter types.

use super::Block;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chapter identifier, 1-based in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChapterId(pub u32);

impl ChapterId {
    /// File name of the chapter document inside the package.
    pub fn file_name(&self) -> String {
        format!("chapter_{:03}.xhtml", self.0)
    }
}

impl fmt::Display for ChapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A contiguous run of blocks that becomes one content document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: ChapterId,

    /// Leading heading text, or "Chapter N"
    pub title: String,

    pub blocks: Vec<Block>,

    /// Whether the chapter precedes the first chapter-level heading
    pub front_matter: bool,
}

impl Chapter {
    /// Create an empty chapter.
    pub fn new(id: ChapterId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            blocks: Vec::new(),
            front_matter: false,
        }
    }

    /// Number of fragments across all blocks.
    pub fn fragment_count(&self) -> usize {
        self.blocks.iter().map(|b| b.fragments().len()).sum()
    }

    /// Whether the chapter consists of a single image block.
    pub fn is_single_image(&self) -> bool {
        self.blocks.len() == 1 && self.blocks[0].is_image()
    }

    /// Pages covered by the chapter, first and last.
    pub fn page_range(&self) -> Option<(u32, u32)> {
        let mut pages = self
            .blocks
            .iter()
            .flat_map(|b| b.fragments().iter().map(|f| f.page()));
        let first = pages.next()?;
        let (min, max) = pages.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p)));
        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chapter_id_display_and_file_name() {
        assert_eq!(ChapterId(7).to_string(), "7");
        assert_eq!(ChapterId(7).file_name(), "chapter_007.xhtml");
        assert!(ChapterId(1) < ChapterId(2));
    }

    #[test]
    fn test_empty_chapter() {
        let chapter = Chapter::new(ChapterId(1), "Chapter 1");
        assert_eq!(chapter.fragment_count(), 0);
        assert!(!chapter.is_single_image());
        assert_eq!(chapter.page_range(), None);
    }
}
