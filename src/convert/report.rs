//! Conversion report with statistics and recovered warnings.

use serde::Serialize;

use crate::error::{Result, Warning};
use crate::model::{Block, Chapter, ChapterId, Document, PageStream, TocEntry};

/// Summary of a finished conversion.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionReport {
    /// Title written to the package
    pub title: Option<String>,

    /// Conversion statistics
    pub stats: ConversionStats,

    /// Packaged chapters in spine order
    pub chapters: Vec<ChapterSummary>,

    /// Recovered conditions, in pipeline order
    pub warnings: Vec<Warning>,
}

impl ConversionReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether anything was dropped, degraded or skipped.
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Number of chapters skipped during assembly.
    pub fn skipped_chapters(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, Warning::ChapterSerializationFailure { .. }))
            .count()
    }

    /// Serialize the report as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One packaged chapter.
#[derive(Debug, Clone, Serialize)]
pub struct ChapterSummary {
    pub id: ChapterId,
    pub title: String,
    pub file: String,
    pub blocks: usize,
    /// First and last source page
    pub pages: Option<(u32, u32)>,
    pub front_matter: bool,
}

impl From<&Chapter> for ChapterSummary {
    fn from(chapter: &Chapter) -> Self {
        Self {
            id: chapter.id,
            title: chapter.title.clone(),
            file: chapter.id.file_name(),
            blocks: chapter.blocks.len(),
            pages: chapter.page_range(),
            front_matter: chapter.front_matter,
        }
    }
}

/// Statistics collected along the pipeline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionStats {
    /// Pages extracted
    pub page_count: u32,

    /// Text fragments extracted
    pub text_fragments: u32,

    /// Image fragments extracted
    pub image_fragments: u32,

    /// Undecodable text fragments dropped
    pub dropped_fragments: u32,

    /// Pages kept as a single paragraph
    pub degraded_pages: u32,

    /// Dominant body font size in points
    pub body_font_size: f32,

    /// Number of paragraphs
    pub paragraph_count: u32,

    /// Number of headings
    pub heading_count: u32,

    /// Number of list items
    pub list_item_count: u32,

    /// Number of image blocks
    pub image_count: u32,

    /// Chapters written to the package
    pub chapter_count: u32,

    /// Entries in the table of contents
    pub toc_entries: u32,

    /// Entries read from a printed contents page
    pub printed_toc_entries: u32,

    /// Distinct image resources
    pub resource_count: u32,

    /// Approximate word count (whitespace-separated tokens)
    pub word_count: u32,

    /// Package size before compression
    pub package_bytes: u64,
}

impl ConversionStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count extracted pages and fragments.
    pub fn count_pages(&mut self, pages: &[PageStream]) {
        self.page_count += pages.len() as u32;
        for page in pages {
            self.text_fragments += page.text_count() as u32;
            self.image_fragments += page.image_count() as u32;
        }
    }

    /// Count one segmented block.
    pub fn add_block(&mut self, block: &Block) {
        match block {
            Block::Paragraph { .. } => self.paragraph_count += 1,
            Block::Heading { .. } => self.heading_count += 1,
            Block::ListItem { .. } => self.list_item_count += 1,
            Block::Image { .. } => self.image_count += 1,
        }
        for fragment in block.fragments() {
            if let Some(text) = fragment.as_text() {
                self.word_count += text.text.split_whitespace().count() as u32;
            }
        }
    }

    /// Count the packaged document.
    pub fn count_document(&mut self, document: &Document) {
        self.chapter_count = document.chapters.len() as u32;
        self.toc_entries = TocEntry::count(&document.toc) as u32;
        self.resource_count = document.resources.len() as u32;
    }
}
