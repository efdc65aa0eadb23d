//! PDF parsing module.
//!
//! The [`PdfBackend`] trait is the seam to the PDF object layer; the
//! [`Extractor`] walks page content through it and yields positioned
//! fragments per page.

mod backend;
mod extractor;
mod normalize;
mod options;

pub use backend::{
    decode_text_simple, is_garbage_text, parse_cid_widths, parse_pdf_date, BackendFontInfo,
    ContentOp, GlyphWidths, LopdfBackend, ObjectRef, PageId, PdfBackend, PdfValue, ResourceScope,
    XObject,
};
pub use extractor::Extractor;
pub use normalize::normalize_text;
pub use options::{PageSelection, ParseOptions};
