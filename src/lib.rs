//! # pdf2epub
//!
//! Reconstructs the logical structure of a PDF (reading order, paragraphs,
//! headings, lists and chapters) and packages it as a reflowable EPUB.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf2epub::{convert_file, ConvertOptions};
//!
//! fn main() -> pdf2epub::Result<()> {
//!     let report = convert_file("book.pdf", "book.epub", &ConvertOptions::default())?;
//!     println!("{} chapters", report.stats.chapter_count);
//!     for warning in &report.warnings {
//!         eprintln!("warning: {}", warning);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! - **Extraction**: positioned text and image fragments per page ([`parser`])
//! - **Reading order**: recursive XY-cut column and band detection ([`layout`])
//! - **Segmentation**: font statistics drive paragraph, heading and list detection
//! - **Chapters**: heading-level partition and a nested table of contents
//! - **Packaging**: XHTML content documents, OPF, nav, NCX and ZIP framing ([`epub`])

pub mod convert;
pub mod detect;
pub mod epub;
pub mod error;
pub mod layout;
pub mod model;
pub mod parser;

// Re-export commonly used types
pub use convert::{
    AbortHandle, ChapterSummary, Conversion, ConversionReport, ConversionStats, ConvertOptions,
    Converter, Stage,
};
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_pdf, PdfFormat};
pub use epub::{ContainerWriter, MemoryContainerWriter, Package, ZipContainerWriter};
pub use error::{Error, Result, Warning};
pub use layout::LayoutConfig;
pub use model::{Block, Chapter, ChapterId, Document, Fragment, Metadata, PageStream, TocEntry};
pub use parser::{LopdfBackend, PageSelection, ParseOptions, PdfBackend};

use std::path::Path;

/// Convert a PDF file into an EPUB file.
///
/// Nothing is left at `output` when the conversion fails.
///
/// # Example
///
/// ```no_run
/// use pdf2epub::{convert_file, ConvertOptions};
///
/// let options = ConvertOptions::new().with_title("Field Notes");
/// convert_file("notes.pdf", "notes.epub", &options).unwrap();
/// ```
pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    options: &ConvertOptions,
) -> Result<ConversionReport> {
    let converter = Converter::new(options.clone())?;
    let mut writer = ZipContainerWriter::new(output.as_ref());
    converter.convert_file(input, &mut writer)
}

/// Convert PDF bytes into EPUB bytes.
pub fn convert_bytes(data: &[u8], options: &ConvertOptions) -> Result<(Vec<u8>, ConversionReport)> {
    let converter = Converter::new(options.clone())?;
    let mut writer = MemoryContainerWriter::new();
    let report = converter.convert_bytes(data, &mut writer)?;
    Ok((writer.into_inner(), report))
}

/// Read a PDF's metadata and page count without converting it.
pub fn inspect_file<P: AsRef<Path>>(path: P) -> Result<(PdfFormat, Metadata)> {
    let format = detect_format_from_path(path.as_ref())?;
    let backend = LopdfBackend::load_file(path.as_ref())?;
    let mut metadata = backend.metadata();
    if metadata.pdf_version.is_empty() {
        metadata.pdf_version = format.version.clone();
    }
    Ok((format, metadata))
}

/// Builder for a conversion.
///
/// # Example
///
/// ```no_run
/// use pdf2epub::Pdf2Epub;
///
/// let report = Pdf2Epub::new()
///     .with_title("Annual Report")
///     .with_language("en-GB")
///     .with_page_markers()
///     .sequential()
///     .convert("report.pdf", "report.epub")?;
/// # Ok::<(), pdf2epub::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pdf2Epub {
    options: ConvertOptions,
}

impl Pdf2Epub {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing options.
    pub fn with_options(options: ConvertOptions) -> Self {
        Self { options }
    }

    /// Set layout thresholds.
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.options.layout = layout;
        self
    }

    /// Override the book title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.options = self.options.with_title(title);
        self
    }

    /// Override the book author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.options = self.options.with_author(author);
        self
    }

    /// Override the language tag.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.options = self.options.with_language(language);
        self
    }

    /// Use a custom stylesheet.
    pub fn with_stylesheet(mut self, css: impl Into<String>) -> Self {
        self.options = self.options.with_stylesheet(css);
        self
    }

    /// Emit page-break markers.
    pub fn with_page_markers(mut self) -> Self {
        self.options.page_markers = true;
        self
    }

    /// Take chapters from a printed contents page.
    pub fn with_toc_page(mut self, page: u32) -> Self {
        self.options = self.options.with_toc_page(page);
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.options = self.options.with_pages(pages);
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.options.parse = self.options.parse.clone().sequential();
        self
    }

    /// Options built so far.
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert `input` and write the EPUB to `output`.
    pub fn convert<P: AsRef<Path>, Q: AsRef<Path>>(
        self,
        input: P,
        output: Q,
    ) -> Result<ConversionReport> {
        convert_file(input, output, &self.options)
    }

    /// Convert PDF bytes into EPUB bytes.
    pub fn convert_bytes(self, data: &[u8]) -> Result<(Vec<u8>, ConversionReport)> {
        convert_bytes(data, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_options() {
        let builder = Pdf2Epub::new()
            .with_title("T")
            .with_page_markers()
            .sequential();

        assert_eq!(builder.options().title.as_deref(), Some("T"));
        assert!(builder.options().page_markers);
        assert!(!builder.options().parse.parallel);
    }

    #[test]
    fn test_convert_bytes_empty_data() {
        let result = convert_bytes(&[], &ConvertOptions::default());
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_convert_bytes_truncated_pdf() {
        let result = convert_bytes(b"%PDF-1.7\n1 0 obj\n<<", &ConvertOptions::default());
        assert!(matches!(result, Err(Error::UnreadableSource(_))));
    }

    #[test]
    fn test_convert_file_missing_input_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.epub");
        let result = convert_file(dir.path().join("missing.pdf"), &output, &ConvertOptions::default());
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(!output.exists());
    }
}
