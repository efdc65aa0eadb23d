//! EPUB package assembly.
//!
//! Chapters are serialized to XHTML content documents, images become package
//! resources, and the OPF package document, `nav.xhtml` and `toc.ncx` are
//! generated from the chapter list and TOC. The resulting [`Package`] is
//! handed to a [`ContainerWriter`] for ZIP framing.

mod assembler;
mod css;
mod nav;
mod opf;
mod writer;
mod xhtml;

pub use assembler::{prepare_image, prune_toc, Assembler, Assembly, PackageOptions};
pub use css::DEFAULT_CSS;
pub use nav::{nav_xhtml, toc_ncx};
pub use opf::{content_opf, PackageMetadata};
pub use writer::{
    write_container, ContainerWriter, ManifestItem, MemoryContainerWriter, Package, PackageFile,
    ZipContainerWriter, CONTENT_DIR,
};
pub use xhtml::{escape_xml, join_fragments, XhtmlOptions, XhtmlWriter};

/// Package document path inside the content directory.
pub const OPF_HREF: &str = "content.opf";
/// EPUB 3 navigation document.
pub const NAV_HREF: &str = "nav.xhtml";
/// EPUB 2 table of contents.
pub const NCX_HREF: &str = "toc.ncx";
pub const STYLESHEET_HREF: &str = "style.css";
pub const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";
