//! PDF format detection and validation.
//!
//! Runs before the PDF object layer is involved so that non-PDF input and
//! unknown header versions fail fast with a precise error.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// PDF format information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfFormat {
    /// PDF version (e.g., "1.7", "2.0")
    pub version: String,
    /// Whether the file appears to be linearized (fast web view)
    pub linearized: bool,
    /// Byte offset of the `%PDF-` header
    pub header_offset: usize,
}

impl std::fmt::Display for PdfFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)?;
        if self.linearized {
            write!(f, " (linearized)")?;
        }
        Ok(())
    }
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const VERSION_LEN: usize = 3; // e.g., "1.7"

/// Readers accept a header anywhere in the first kilobyte.
const HEADER_WINDOW: usize = 1024;

/// Detect PDF format from a file path.
///
/// # Example
/// ```no_run
/// use pdf2epub::detect::detect_format_from_path;
///
/// let format = detect_format_from_path("document.pdf").unwrap();
/// println!("PDF version: {}", format.version);
/// ```
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<PdfFormat> {
    let file = File::open(path)?;
    let mut header = Vec::with_capacity(HEADER_WINDOW);
    file.take(HEADER_WINDOW as u64).read_to_end(&mut header)?;
    detect_format_from_bytes(&header)
}

/// Detect PDF format from the leading bytes of a file.
///
/// Returns `Error::UnknownFormat` when no `%PDF-` header is found and
/// `Error::UnsupportedVersion` for a header version other than 1.x or 2.x.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<PdfFormat> {
    let window = &data[..data.len().min(HEADER_WINDOW)];
    let header_offset = window
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)
        .ok_or(Error::UnknownFormat)?;

    let start = header_offset + PDF_MAGIC.len();
    let version_bytes = data
        .get(start..start + VERSION_LEN)
        .ok_or(Error::UnknownFormat)?;
    let version = String::from_utf8_lossy(version_bytes).to_string();

    if !is_valid_version(&version) {
        return Err(Error::UnknownFormat);
    }
    if !is_supported_version(&version) {
        return Err(Error::UnsupportedVersion(version));
    }

    let linearized = window
        .windows(b"/Linearized".len())
        .any(|w| w == b"/Linearized");

    Ok(PdfFormat {
        version,
        linearized,
        header_offset,
    })
}

/// Check if a version string has the `d.d` form.
fn is_valid_version(version: &str) -> bool {
    let bytes = version.as_bytes();
    bytes.len() == 3 && bytes[0].is_ascii_digit() && bytes[1] == b'.' && bytes[2].is_ascii_digit()
}

fn is_supported_version(version: &str) -> bool {
    matches!(version.as_bytes()[0], b'1' | b'2')
}

/// Check if a file is a readable PDF.
pub fn is_pdf<P: AsRef<Path>>(path: P) -> bool {
    detect_format_from_path(path).is_ok()
}

/// Check if bytes start like a readable PDF.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    detect_format_from_bytes(data).is_ok()
}
