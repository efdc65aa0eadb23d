//! Document-level types.

use super::{Chapter, ChapterId, ResourceTable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The structured e-book document assembled in one conversion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Document metadata (title, author, etc.)
    pub metadata: Metadata,

    /// Chapters in document order
    pub chapters: Vec<Chapter>,

    /// Hierarchical table of contents
    pub toc: Vec<TocEntry>,

    /// Embedded resources, appended by the assembler
    pub resources: ResourceTable,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chapters.
    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    /// Get a chapter by id.
    pub fn chapter(&self, id: ChapterId) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }

    /// Whether the document has no chapters.
    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// Total number of TOC entries, nested ones included.
    pub fn toc_len(&self) -> usize {
        TocEntry::count(&self.toc)
    }
}

/// Document metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title
    pub title: Option<String>,

    /// Document author
    pub author: Option<String>,

    /// BCP 47 language tag
    pub language: Option<String>,

    /// Document subject
    pub subject: Option<String>,

    /// Keywords
    pub keywords: Option<String>,

    /// Creator application
    pub creator: Option<String>,

    /// PDF producer
    pub producer: Option<String>,

    /// Creation date
    pub created: Option<DateTime<Utc>>,

    /// Last modification date
    pub modified: Option<DateTime<Utc>>,

    /// Unique book identifier (dc:identifier)
    pub identifier: Option<String>,

    /// PDF version (e.g., "1.7")
    pub pdf_version: String,

    /// Total number of pages in the source
    pub page_count: u32,
}

impl Metadata {
    /// Create new metadata with PDF version.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            pdf_version: version.into(),
            ..Default::default()
        }
    }

    /// Fill fields that are unset from `other`.
    pub fn merge_missing(&mut self, other: Metadata) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }
        fill(&mut self.title, other.title);
        fill(&mut self.author, other.author);
        fill(&mut self.language, other.language);
        fill(&mut self.subject, other.subject);
        fill(&mut self.keywords, other.keywords);
        fill(&mut self.creator, other.creator);
        fill(&mut self.producer, other.producer);
        fill(&mut self.created, other.created);
        fill(&mut self.modified, other.modified);
        fill(&mut self.identifier, other.identifier);
        if self.pdf_version.is_empty() {
            self.pdf_version = other.pdf_version;
        }
        if self.page_count == 0 {
            self.page_count = other.page_count;
        }
    }
}

/// One entry of the table of contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Entry title
    pub title: String,

    /// Chapter the entry points into
    pub target: ChapterId,

    /// Heading anchor inside the chapter, `None` for the chapter start
    pub anchor: Option<String>,

    /// Nested entries
    pub children: Vec<TocEntry>,
}

impl TocEntry {
    /// Create a new entry.
    pub fn new(title: impl Into<String>, target: ChapterId, anchor: Option<String>) -> Self {
        Self {
            title: title.into(),
            target,
            anchor,
            children: Vec::new(),
        }
    }

    /// Add a child entry.
    pub fn add_child(&mut self, child: TocEntry) {
        self.children.push(child);
    }

    /// Link target relative to the package content directory.
    pub fn href(&self) -> String {
        match &self.anchor {
            Some(anchor) => format!("{}#{}", self.target.file_name(), anchor),
            None => self.target.file_name(),
        }
    }

    /// Count entries including nested ones.
    pub fn count(entries: &[TocEntry]) -> usize {
        entries.iter().map(|e| 1 + Self::count(&e.children)).sum()
    }

    /// Depth of the deepest branch (1 for a flat list, 0 when empty).
    pub fn depth(entries: &[TocEntry]) -> usize {
        entries
            .iter()
            .map(|e| 1 + Self::depth(&e.children))
            .max()
            .unwrap_or(0)
    }

    /// Visit entries in document (pre-)order.
    pub fn walk<'a>(entries: &'a [TocEntry], visit: &mut dyn FnMut(&'a TocEntry)) {
        for entry in entries {
            visit(entry);
            Self::walk(&entry.children, visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_new() {
        let doc = Document::new();
        assert!(doc.is_empty());
        assert_eq!(doc.chapter_count(), 0);
        assert_eq!(doc.toc_len(), 0);
    }

    #[test]
    fn test_metadata_merge() {
        let mut metadata = Metadata::default();
        metadata.title = Some("Override".to_string());

        let mut source = Metadata::with_version("1.7");
        source.title = Some("From Info".to_string());
        source.author = Some("Jane Roe".to_string());
        source.page_count = 10;

        metadata.merge_missing(source);
        assert_eq!(metadata.title.as_deref(), Some("Override"));
        assert_eq!(metadata.author.as_deref(), Some("Jane Roe"));
        assert_eq!(metadata.pdf_version, "1.7");
        assert_eq!(metadata.page_count, 10);
    }

    #[test]
    fn test_toc_tree() {
        let mut chapter1 = TocEntry::new("Chapter 1", ChapterId(1), Some("h1-1".into()));
        chapter1.add_child(TocEntry::new("Section 1.1", ChapterId(1), Some("h1-2".into())));
        chapter1.add_child(TocEntry::new("Section 1.2", ChapterId(1), Some("h1-3".into())));
        let toc = vec![chapter1, TocEntry::new("Chapter 2", ChapterId(2), None)];

        assert_eq!(TocEntry::count(&toc), 4);
        assert_eq!(TocEntry::depth(&toc), 2);
        assert_eq!(toc[0].children[0].href(), "chapter_001.xhtml#h1-2");
        assert_eq!(toc[1].href(), "chapter_002.xhtml");

        let mut titles = Vec::new();
        TocEntry::walk(&toc, &mut |e| titles.push(e.title.as_str()));
        assert_eq!(titles, ["Chapter 1", "Section 1.1", "Section 1.2", "Chapter 2"]);
    }
}
