//! Document model types.
//!
//! This module defines the intermediate representation that flows through
//! the conversion pipeline: positioned fragments, per-page streams, blocks,
//! chapters, the table of contents and the package resource table.

mod block;
mod chapter;
mod document;
mod fragment;
mod page;
mod resource;

pub use block::Block;
pub use chapter::{Chapter, ChapterId};
pub use document::{Document, Metadata, TocEntry};
pub use fragment::{
    BoundingBox, FontStyle, FontWeight, Fragment, FragmentId, FragmentKind, ImageContent,
    ImageEncoding, TextContent,
};
pub use page::PageStream;
pub use resource::{Resource, ResourceTable};
