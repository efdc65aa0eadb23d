//! Layout analysis: reading order, structure segmentation and chapters.

mod config;
pub mod heuristics;
mod chapters;
mod printed_toc;
mod reading_order;
mod segmenter;

pub use chapters::{build_chapters, build_chapters_from_toc, ChapterBuild};
pub use config::LayoutConfig;
pub use printed_toc::{parse_toc_line, parse_toc_page, PrintedTocEntry};
pub use reading_order::{order_fragments, resolve_page};
pub use segmenter::{FontStatistics, Segmentation, Segmenter};
