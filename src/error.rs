//! Error types for pdf2epub.
//!
//! Fatal conditions are [`Error`] values and abort the run before anything is
//! written. Recoverable conditions are [`Warning`] values: the affected content
//! is dropped, degraded or skipped and the run continues.

use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::model::{ChapterId, FragmentId};

/// Result type alias for pdf2epub operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors. Any of these aborts the conversion with no output written.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading the source or writing the package.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF header carries a version we do not understand.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// The document is encrypted and cannot be read.
    #[error("Document is encrypted")]
    Encrypted,

    /// The source cannot be opened or parsed at all.
    #[error("Unreadable source: {0}")]
    UnreadableSource(String),

    /// A configuration value is out of range or the config file is malformed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Every chapter failed to serialize.
    #[error("No chapter could be packaged ({0} skipped)")]
    NothingToPackage(usize),

    /// The container writer failed.
    #[error("Container error: {0}")]
    Container(String),

    /// The run was aborted between stages.
    #[error("Conversion aborted before {0}")]
    Aborted(&'static str),
}

impl Error {
    /// Whether the error means the source itself could not be read.
    pub fn is_unreadable_source(&self) -> bool {
        matches!(
            self,
            Error::UnreadableSource(_)
                | Error::Encrypted
                | Error::UnknownFormat
                | Error::UnsupportedVersion(_)
        )
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::UnreadableSource(err.to_string()),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Container(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidConfig(err.to_string())
    }
}

/// Recovered conditions, reported next to a successfully produced package.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Text whose bytes could not be decoded with the font encoding. Dropped.
    #[error("page {page}: dropped undecodable text fragment {fragment}")]
    UndecodableFragment {
        /// Page number (1-indexed).
        page: u32,
        /// The dropped fragment.
        fragment: FragmentId,
    },

    /// A page whose layout could not be analysed. Kept as one paragraph.
    #[error("page {page}: layout could not be segmented ({reason}), kept as a single paragraph")]
    UnsegmentablePage {
        /// Page number (1-indexed).
        page: u32,
        /// Why segmentation was not possible.
        reason: String,
    },

    /// A chapter that failed to serialize. Left out of the package.
    #[error("skipped chapter {chapter} \"{title}\": {reason}")]
    ChapterSerializationFailure {
        /// The skipped chapter.
        chapter: ChapterId,
        /// Its title.
        title: String,
        /// Why serialization failed.
        reason: String,
    },
}
