//! Package contents and container writers.

use std::fs;
use std::io::{Cursor, Seek, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{Error, Result};

/// Directory holding the package content inside the container.
pub const CONTENT_DIR: &str = "OEBPS";

const MIMETYPE: &[u8] = b"application/epub+zip";

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// One manifest item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    /// Path relative to the content directory
    pub href: String,
    pub media_type: String,
    /// Space-separated manifest properties (`nav`, `cover-image`)
    pub properties: Option<String>,
}

impl ManifestItem {
    pub fn new(id: impl Into<String>, href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
            properties: None,
        }
    }

    pub fn with_properties(mut self, properties: impl Into<String>) -> Self {
        self.properties = Some(properties.into());
        self
    }
}

/// A file inside the content directory.
#[derive(Debug, Clone)]
pub struct PackageFile {
    /// Path relative to the content directory
    pub path: String,
    pub data: Vec<u8>,
}

/// A fully assembled package, ready for container framing.
#[derive(Debug, Clone, Default)]
pub struct Package {
    /// Every content document and resource
    pub manifest: Vec<ManifestItem>,
    /// Manifest ids in reading order
    pub spine: Vec<String>,
    /// File contents, including the package document and navigation
    pub files: Vec<PackageFile>,
}

impl Package {
    /// Add a file.
    pub fn add_file(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files.push(PackageFile {
            path: path.into(),
            data: data.into(),
        });
    }

    /// Look up a file by its content-relative path.
    pub fn file(&self, path: &str) -> Option<&PackageFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Total size of all file contents.
    pub fn total_size(&self) -> usize {
        self.files.iter().map(|f| f.data.len()).sum()
    }
}

/// Frames a [`Package`] into an EPUB container.
pub trait ContainerWriter {
    /// Write the package. Nothing is left behind on failure.
    fn write(&mut self, package: &Package) -> Result<()>;
}

/// Write the container to any seekable sink.
///
/// The `mimetype` entry is stored uncompressed and first; everything else is
/// deflated.
pub fn write_container<W: Write + Seek>(package: &Package, writer: W) -> Result<W> {
    let mut zip = ZipWriter::new(writer);

    let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let deflated =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("mimetype", stored)?;
    zip.write_all(MIMETYPE)?;

    zip.start_file("META-INF/container.xml", deflated)?;
    zip.write_all(CONTAINER_XML.as_bytes())?;

    for file in &package.files {
        zip.start_file(format!("{}/{}", CONTENT_DIR, file.path), deflated)?;
        zip.write_all(&file.data)?;
    }

    Ok(zip.finish()?)
}

/// Writes the container to a file path.
///
/// The container is written to a temporary sibling and renamed into place,
/// so an existing file is only replaced by a complete package.
#[derive(Debug, Clone)]
pub struct ZipContainerWriter {
    path: PathBuf,
}

impl ZipContainerWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn partial_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".partial");
        self.path.with_file_name(name)
    }
}

impl ContainerWriter for ZipContainerWriter {
    fn write(&mut self, package: &Package) -> Result<()> {
        let partial = self.partial_path();
        let result = fs::File::create(&partial)
            .map_err(Error::from)
            .and_then(|file| write_container(package, std::io::BufWriter::new(file)))
            .and_then(|mut buffered| buffered.flush().map_err(Error::from))
            .and_then(|_| fs::rename(&partial, &self.path).map_err(Error::from));

        if let Err(err) = result {
            let _ = fs::remove_file(&partial);
            return Err(err);
        }
        log::info!("wrote {}", self.path.display());
        Ok(())
    }
}

/// Keeps the container in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainerWriter {
    bytes: Vec<u8>,
}

impl MemoryContainerWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Container bytes of the last write.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.bytes
    }
}

impl ContainerWriter for MemoryContainerWriter {
    fn write(&mut self, package: &Package) -> Result<()> {
        let cursor = write_container(package, Cursor::new(Vec::new()))?;
        self.bytes = cursor.into_inner();
        Ok(())
    }
}
