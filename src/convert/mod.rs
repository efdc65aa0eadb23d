//! The conversion pipeline.
//!
//! Stages run strictly forward: extraction, reading order, segmentation,
//! chapter building, package assembly and container writing. The run can be
//! aborted between stages through an [`AbortHandle`]; nothing is written
//! before the last stage.
//!
//! # Example
//!
//! ```no_run
//! use pdf2epub::convert::{ConvertOptions, Converter};
//! use pdf2epub::epub::ZipContainerWriter;
//!
//! fn main() -> pdf2epub::Result<()> {
//!     let converter = Converter::new(ConvertOptions::default())?;
//!     let mut writer = ZipContainerWriter::new("book.epub");
//!     let report = converter.convert_file("book.pdf", &mut writer)?;
//!     println!("{} chapters", report.stats.chapter_count);
//!     Ok(())
//! }
//! ```

mod options;
mod report;

pub use options::ConvertOptions;
pub use report::{ChapterSummary, ConversionReport, ConversionStats};

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::detect::{detect_format_from_bytes, detect_format_from_path};
use crate::epub::{Assembler, ContainerWriter, Package, PackageOptions};
use crate::error::{Error, Result};
use crate::layout::{
    build_chapters, build_chapters_from_toc, parse_toc_page, resolve_page, FontStatistics,
    PrintedTocEntry, Segmenter,
};
use crate::model::{Document, PageStream};
use crate::parser::{Extractor, LopdfBackend, PdfBackend};

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Extract,
    ReadingOrder,
    Segment,
    Chapters,
    Assemble,
    Write,
}

impl Stage {
    /// All stages in run order.
    pub const ALL: [Stage; 6] = [
        Stage::Extract,
        Stage::ReadingOrder,
        Stage::Segment,
        Stage::Chapters,
        Stage::Assemble,
        Stage::Write,
    ];

    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Extract => "extraction",
            Stage::ReadingOrder => "reading order",
            Stage::Segment => "segmentation",
            Stage::Chapters => "chapter building",
            Stage::Assemble => "assembly",
            Stage::Write => "writing",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Cancels a running conversion at the next stage boundary.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the conversion to stop.
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// An assembled, not yet written, conversion.
#[derive(Debug)]
pub struct Conversion {
    pub document: Document,
    pub package: Package,
    pub report: ConversionReport,
}

type StageCallback = Box<dyn Fn(Stage) + Send + Sync>;

/// Converts PDF documents to EPUB packages.
pub struct Converter {
    options: ConvertOptions,
    abort: AbortHandle,
    on_stage: Option<StageCallback>,
}

impl Converter {
    /// Create a converter; fails on out-of-range options.
    pub fn new(options: ConvertOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            abort: AbortHandle::new(),
            on_stage: None,
        })
    }

    /// Options in use.
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Handle that aborts this converter's runs.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Call `callback` as each stage starts.
    pub fn on_stage(mut self, callback: impl Fn(Stage) + Send + Sync + 'static) -> Self {
        self.on_stage = Some(Box::new(callback));
        self
    }

    /// Convert a PDF file and write the package.
    pub fn convert_file<P: AsRef<Path>>(
        &self,
        path: P,
        writer: &mut dyn ContainerWriter,
    ) -> Result<ConversionReport> {
        let path = path.as_ref();
        let format = detect_format_from_path(path)?;
        log::debug!("{}: {}", path.display(), format);

        let backend = LopdfBackend::load_file(path)?;
        let fallback_title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
        let conversion = self.run(&backend, fallback_title)?;
        self.write(conversion, writer)
    }

    /// Convert PDF bytes and write the package.
    pub fn convert_bytes(
        &self,
        data: &[u8],
        writer: &mut dyn ContainerWriter,
    ) -> Result<ConversionReport> {
        detect_format_from_bytes(data)?;
        let backend = LopdfBackend::load_bytes(data)?;
        let conversion = self.run(&backend, None)?;
        self.write(conversion, writer)
    }

    /// Convert through any backend and write the package.
    pub fn convert<B: PdfBackend + ?Sized>(
        &self,
        backend: &B,
        writer: &mut dyn ContainerWriter,
    ) -> Result<ConversionReport> {
        let conversion = self.run(backend, None)?;
        self.write(conversion, writer)
    }

    /// Run every stage up to assembly without writing anything.
    pub fn assemble<B: PdfBackend + ?Sized>(&self, backend: &B) -> Result<Conversion> {
        self.run(backend, None)
    }

    fn enter(&self, stage: Stage) -> Result<()> {
        if self.abort.is_aborted() {
            log::info!("conversion aborted before {}", stage);
            return Err(Error::Aborted(stage.name()));
        }
        if let Some(ref callback) = self.on_stage {
            callback(stage);
        }
        Ok(())
    }

    fn run<B: PdfBackend + ?Sized>(
        &self,
        backend: &B,
        fallback_title: Option<String>,
    ) -> Result<Conversion> {
        let mut report = ConversionReport::new();
        let layout = &self.options.layout;

        self.enter(Stage::Extract)?;
        let pages = Extractor::new(backend, &self.options.parse).extract_all()?;
        report.stats.count_pages(&pages);
        log::info!(
            "extracted {} pages ({} text, {} image fragments)",
            pages.len(),
            report.stats.text_fragments,
            report.stats.image_fragments
        );

        self.enter(Stage::ReadingOrder)?;
        let pages: Vec<PageStream> = if self.options.parse.parallel {
            pages
                .into_par_iter()
                .map(|page| resolve_page(page, layout))
                .collect()
        } else {
            pages
                .into_iter()
                .map(|page| resolve_page(page, layout))
                .collect()
        };

        let (pages, printed_toc) = self.take_toc_page(pages);
        if let Some(ref entries) = printed_toc {
            report.stats.printed_toc_entries = entries.len() as u32;
        }

        self.enter(Stage::Segment)?;
        // Every page must be in before the body size is known
        let stats = FontStatistics::from_pages(&pages);
        report.stats.body_font_size = stats.body_size();
        log::debug!(
            "body font size {:.1}pt over {} distinct sizes",
            stats.body_size(),
            stats.distinct_sizes()
        );
        let segmentation = Segmenter::new(layout, &stats).segment(pages);
        report.stats.dropped_fragments = segmentation.dropped_fragments as u32;
        report.stats.degraded_pages = segmentation.degraded_pages as u32;
        report.warnings.extend(segmentation.warnings);
        for block in &segmentation.blocks {
            report.stats.add_block(block);
        }
        log::info!("segmented {} blocks", segmentation.blocks.len());

        self.enter(Stage::Chapters)?;
        let build = match printed_toc {
            Some(entries) => build_chapters_from_toc(segmentation.blocks, &entries, layout),
            None => build_chapters(segmentation.blocks, layout),
        };
        log::info!(
            "built {} chapters, {} TOC entries",
            build.chapters.len(),
            crate::model::TocEntry::count(&build.toc)
        );

        let mut document = Document::new();
        document.metadata = backend.metadata();
        self.apply_metadata(&mut document, fallback_title);
        document.chapters = build.chapters;
        document.toc = build.toc;

        self.enter(Stage::Assemble)?;
        let package_options = PackageOptions {
            css: self.options.stylesheet.clone(),
            page_markers: self.options.page_markers,
            modified: None,
        };
        let assembly = Assembler::new(&package_options).assemble(&mut document)?;
        report.warnings.extend(assembly.warnings);
        report.stats.count_document(&document);
        report.stats.package_bytes = assembly.package.total_size() as u64;
        report.title = document.metadata.title.clone();
        report.chapters = document.chapters.iter().map(Into::into).collect();

        Ok(Conversion {
            document,
            package: assembly.package,
            report,
        })
    }

    /// Remove the printed contents page, if one is configured, and read its entries.
    fn take_toc_page(
        &self,
        pages: Vec<PageStream>,
    ) -> (Vec<PageStream>, Option<Vec<PrintedTocEntry>>) {
        let Some(number) = self.options.toc_page else {
            return (pages, None);
        };
        let (toc, pages): (Vec<PageStream>, Vec<PageStream>) =
            pages.into_iter().partition(|p| p.number == number);
        let Some(toc) = toc.first() else {
            log::warn!("contents page {} was not extracted, chapters follow headings", number);
            return (pages, None);
        };

        let mut entries = parse_toc_page(toc, self.options.layout.line_tolerance);
        entries.retain(|e| e.page != number);
        if entries.is_empty() {
            log::warn!("no entries found on contents page {}, chapters follow headings", number);
        } else {
            log::info!("read {} entries from contents page {}", entries.len(), number);
        }
        (pages, Some(entries))
    }

    fn apply_metadata(&self, document: &mut Document, fallback_title: Option<String>) {
        let metadata = &mut document.metadata;
        if let Some(ref title) = self.options.title {
            metadata.title = Some(title.clone());
        }
        if let Some(ref author) = self.options.author {
            metadata.author = Some(author.clone());
        }
        if let Some(ref language) = self.options.language {
            metadata.language = Some(language.clone());
        }
        if metadata.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
            metadata.title = fallback_title;
        }
    }

    fn write(
        &self,
        conversion: Conversion,
        writer: &mut dyn ContainerWriter,
    ) -> Result<ConversionReport> {
        self.enter(Stage::Write)?;
        writer.write(&conversion.package)?;
        let report = conversion.report;
        if report.is_partial() {
            log::warn!("conversion finished with {} warnings", report.warnings.len());
        }
        Ok(report)
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("options", &self.options)
            .field("aborted", &self.abort.is_aborted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::MemoryContainerWriter;
    use crate::layout::LayoutConfig;

    #[test]
    fn test_invalid_options_rejected() {
        let options = ConvertOptions::new().with_layout(LayoutConfig::new().with_max_toc_depth(0));
        assert!(matches!(Converter::new(options), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_abort_handle_shared() {
        let handle = AbortHandle::new();
        let clone = handle.clone();
        clone.abort();
        assert!(handle.is_aborted());
    }

    #[test]
    fn test_stage_order() {
        assert!(Stage::Extract < Stage::Write);
        assert_eq!(Stage::ALL.len(), 6);
        assert_eq!(Stage::Segment.to_string(), "segmentation");
    }

    #[test]
    fn test_unknown_bytes_fail_before_output() {
        let converter = Converter::new(ConvertOptions::default()).unwrap();
        let mut writer = MemoryContainerWriter::new();
        let result = converter.convert_bytes(b"this is not a pdf at all", &mut writer);
        assert!(matches!(result, Err(Error::UnknownFormat)));
        assert!(writer.bytes().is_empty());
    }
}
