//! Embedded resources (images) and the package resource table.

use serde::{Deserialize, Serialize};

/// An embedded resource in the package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Manifest id (e.g., "img_0001")
    pub id: String,

    /// Raw binary data as written into the package
    #[serde(skip_serializing, default)]
    pub data: Vec<u8>,

    /// MIME type (e.g., "image/jpeg")
    pub mime_type: String,

    /// Width in pixels
    pub width: Option<u32>,

    /// Height in pixels
    pub height: Option<u32>,

    /// Marked as the package cover image
    pub cover: bool,
}

impl Resource {
    /// Create a new resource.
    pub fn new(id: impl Into<String>, data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data,
            mime_type: mime_type.into(),
            width: None,
            height: None,
            cover: false,
        }
    }

    /// Set image dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Get the size of the resource data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Path relative to the package content directory.
    pub fn href(&self) -> String {
        format!("images/{}.{}", self.id, self.extension())
    }

    /// Get the file extension based on MIME type.
    pub fn extension(&self) -> &str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/svg+xml" => "svg",
            "image/webp" => "webp",
            _ => "bin",
        }
    }

    /// Detect MIME type from data magic bytes.
    pub fn detect_mime_type(data: &[u8]) -> Option<&'static str> {
        if data.len() < 8 {
            return None;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some("image/jpeg");
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some("image/png");
        }

        // GIF: GIF87a or GIF89a
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some("image/gif");
        }

        // WEBP: RIFF....WEBP
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some("image/webp");
        }

        // JPEG 2000: 00 00 00 0C 6A 50 20 20
        if data.starts_with(&[0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20]) {
            return Some("image/jp2");
        }

        None
    }
}

/// Flat, insertion-ordered table of package resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceTable {
    entries: Vec<Resource>,
}

impl ResourceTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resource. Ids are unique; a duplicate id is ignored.
    pub fn insert(&mut self, resource: Resource) -> bool {
        if self.get(&resource.id).is_some() {
            return false;
        }
        self.entries.push(resource);
        true
    }

    /// Get a resource by id.
    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.entries.iter().find(|r| r.id == id)
    }

    /// Get a resource by id, mutably.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Resource> {
        self.entries.iter_mut().find(|r| r.id == id)
    }

    /// Resources in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total payload size in bytes.
    pub fn total_size(&self) -> usize {
        self.entries.iter().map(Resource::size).sum()
    }
}
