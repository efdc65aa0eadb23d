//! Package assembly: chapters, resources and navigation into a [`Package`].

use std::collections::HashMap;
use std::io::Cursor;

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};

use crate::error::{Error, Result, Warning};
use crate::model::{
    Block, ChapterId, Document, FragmentId, ImageContent, ImageEncoding, Resource, ResourceTable,
    TocEntry,
};

use super::css::DEFAULT_CSS;
use super::nav::{nav_xhtml, toc_ncx};
use super::opf::{content_opf, PackageMetadata};
use super::writer::{ManifestItem, Package};
use super::xhtml::{XhtmlOptions, XhtmlWriter};
use super::{NAV_HREF, NCX_HREF, OPF_HREF, STYLESHEET_HREF, XHTML_MEDIA_TYPE};

/// Options for package assembly.
#[derive(Debug, Clone, Default)]
pub struct PackageOptions {
    /// Stylesheet replacing the default one
    pub css: Option<String>,
    /// Emit page-break markers at source page starts
    pub page_markers: bool,
    /// `dcterms:modified` timestamp; the current time when unset
    pub modified: Option<DateTime<Utc>>,
}

/// Result of assembly.
#[derive(Debug)]
pub struct Assembly {
    pub package: Package,
    pub warnings: Vec<Warning>,
    /// Chapters left out of the package
    pub skipped: Vec<ChapterId>,
}

/// A chapter's images, held back until the chapter serializes.
#[derive(Default)]
struct Staging {
    resources: Vec<(Vec<u8>, Resource)>,
    hrefs: HashMap<FragmentId, String>,
}

/// Builds a package from a chaptered document.
pub struct Assembler<'a> {
    options: &'a PackageOptions,
}

impl<'a> Assembler<'a> {
    pub fn new(options: &'a PackageOptions) -> Self {
        Self { options }
    }

    /// Serialize every chapter and assemble the package.
    ///
    /// Chapters that fail are removed from `document` with a warning and
    /// their TOC entries are pruned. Resources are appended to
    /// `document.resources` in chapter order.
    pub fn assemble(&self, document: &mut Document) -> Result<Assembly> {
        let language = document
            .metadata
            .language
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| "en".to_string());
        let xhtml_options = XhtmlOptions {
            language: language.clone(),
            page_markers: self.options.page_markers,
        };
        let mut xhtml = XhtmlWriter::new(&xhtml_options);

        let mut digests: HashMap<Vec<u8>, String> = HashMap::new();
        let mut warnings = Vec::new();
        let mut skipped = Vec::new();
        let mut documents: Vec<(ChapterId, String)> = Vec::new();

        let chapters = std::mem::take(&mut document.chapters);
        let total = chapters.len();
        for chapter in chapters {
            let staged = self.stage_images(&chapter.blocks, &digests, &document.resources);
            let rendered = staged.and_then(|staging| {
                xhtml
                    .render(&chapter, &staging.hrefs)
                    .map(|content| (staging, content))
            });

            match rendered {
                Ok((staging, content)) => {
                    for (digest, resource) in staging.resources {
                        digests.insert(digest, resource.id.clone());
                        document.resources.insert(resource);
                    }
                    documents.push((chapter.id, content));
                    document.chapters.push(chapter);
                }
                Err(reason) => {
                    log::warn!("skipping chapter {} \"{}\": {}", chapter.id, chapter.title, reason);
                    warnings.push(Warning::ChapterSerializationFailure {
                        chapter: chapter.id,
                        title: chapter.title.clone(),
                        reason,
                    });
                    skipped.push(chapter.id);
                }
            }
        }

        if documents.is_empty() {
            return Err(Error::NothingToPackage(total));
        }

        document.toc = prune_toc(std::mem::take(&mut document.toc), &skipped);
        self.mark_cover(document, &digests);

        let package = self.build_package(document, &language, documents);
        log::info!(
            "assembled {} chapters, {} resources ({} skipped)",
            document.chapters.len(),
            document.resources.len(),
            skipped.len()
        );
        Ok(Assembly {
            package,
            warnings,
            skipped,
        })
    }

    /// Prepare the images of one chapter against the already committed ones.
    fn stage_images(
        &self,
        blocks: &[Block],
        committed: &HashMap<Vec<u8>, String>,
        resources: &ResourceTable,
    ) -> std::result::Result<Staging, String> {
        let mut staging = Staging::default();
        let mut local: HashMap<Vec<u8>, String> = HashMap::new();

        for block in blocks {
            let Block::Image { fragment } = block else {
                continue;
            };
            let Some(image) = fragment.as_image() else {
                return Err(format!("image block {} holds no image", fragment.id));
            };
            let digest = md5_digest(&image.data);

            let href = if let Some(id) = committed.get(&digest) {
                resources
                    .get(id)
                    .map(Resource::href)
                    .ok_or_else(|| format!("image {} lost its resource", fragment.id))?
            } else if let Some(href) = local.get(&digest) {
                href.clone()
            } else {
                let (data, mime) = prepare_image(image)?;
                let number = resources.len() + staging.resources.len() + 1;
                let resource = Resource::new(format!("img_{:04}", number), data, mime)
                    .with_dimensions(image.pixel_width, image.pixel_height);
                let href = resource.href();
                local.insert(digest.clone(), href.clone());
                staging.resources.push((digest, resource));
                href
            };
            staging.hrefs.insert(fragment.id, href);
        }
        Ok(staging)
    }

    /// A front-matter chapter holding only one image provides the cover.
    fn mark_cover(&self, document: &mut Document, digests: &HashMap<Vec<u8>, String>) {
        let Some(first) = document.chapters.first() else {
            return;
        };
        if !(first.front_matter && first.is_single_image()) {
            return;
        }
        let Some(image) = first.blocks.first().and_then(|b| match b {
            Block::Image { fragment } => fragment.as_image(),
            _ => None,
        }) else {
            return;
        };
        let Some(id) = digests.get(&md5_digest(&image.data)) else {
            return;
        };
        if let Some(resource) = document.resources.get_mut(id) {
            log::debug!("using {} as cover image", id);
            resource.cover = true;
        }
    }

    fn build_package(
        &self,
        document: &Document,
        language: &str,
        documents: Vec<(ChapterId, String)>,
    ) -> Package {
        let mut package = Package::default();
        let metadata = &document.metadata;
        let title = metadata
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| "Untitled".to_string());
        let identifier = metadata
            .identifier
            .clone()
            .unwrap_or_else(|| content_identifier(&documents));

        package
            .manifest
            .push(ManifestItem::new("nav", NAV_HREF, XHTML_MEDIA_TYPE).with_properties("nav"));
        package
            .manifest
            .push(ManifestItem::new("ncx", NCX_HREF, "application/x-dtbncx+xml"));
        package
            .manifest
            .push(ManifestItem::new("css", STYLESHEET_HREF, "text/css"));

        let css = self.options.css.as_deref().unwrap_or(DEFAULT_CSS);
        package.add_file(STYLESHEET_HREF, css);

        for (id, content) in documents {
            let href = id.file_name();
            let item_id = href.trim_end_matches(".xhtml").to_string();
            package
                .manifest
                .push(ManifestItem::new(item_id.clone(), href.clone(), XHTML_MEDIA_TYPE));
            package.spine.push(item_id);
            package.add_file(href, content);
        }

        for resource in document.resources.iter() {
            let mut item = ManifestItem::new(resource.id.clone(), resource.href(), resource.mime_type.clone());
            if resource.cover {
                item = item.with_properties("cover-image");
            }
            package.manifest.push(item);
            package.add_file(resource.href(), resource.data.clone());
        }

        package.add_file(NAV_HREF, nav_xhtml(&title, language, &document.toc));
        package.add_file(NCX_HREF, toc_ncx(&title, &identifier, &document.toc));

        let package_metadata = PackageMetadata {
            title,
            authors: metadata.author.iter().cloned().collect(),
            language: language.to_string(),
            identifier,
            subject: metadata.subject.clone(),
            keywords: metadata.keywords.clone(),
            created: metadata.created,
            modified: self.options.modified.unwrap_or_else(Utc::now),
        };
        let opf = content_opf(&package_metadata, &package.manifest, &package.spine);
        package.add_file(OPF_HREF, opf);
        package
    }
}

fn md5_digest(data: &[u8]) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Stable identifier derived from the chapter contents.
fn content_identifier(documents: &[(ChapterId, String)]) -> String {
    let mut hasher = Md5::new();
    for (_, content) in documents {
        hasher.update(content.as_bytes());
    }
    let hex: String = hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    format!("urn:md5:{}", hex)
}

/// Remove entries pointing at skipped chapters, lifting their children.
pub fn prune_toc(entries: Vec<TocEntry>, skipped: &[ChapterId]) -> Vec<TocEntry> {
    let mut out = Vec::with_capacity(entries.len());
    for mut entry in entries {
        let children = prune_toc(std::mem::take(&mut entry.children), skipped);
        if skipped.contains(&entry.target) {
            out.extend(children);
        } else {
            entry.children = children;
            out.push(entry);
        }
    }
    out
}

/// Bytes and MIME type to embed for an image.
///
/// EPUB-native encodings are copied unchanged after a signature check; raw
/// 8-bit gray, RGB and CMYK samples are transcoded to PNG.
pub fn prepare_image(image: &ImageContent) -> std::result::Result<(Vec<u8>, &'static str), String> {
    if let Some(mime) = image.encoding.passthrough_mime() {
        return match Resource::detect_mime_type(&image.data) {
            Some(detected) if detected == mime => Ok((image.data.clone(), mime)),
            _ => Err(format!(
                "image data does not match its {:?} encoding",
                image.encoding
            )),
        };
    }

    match image.encoding {
        ImageEncoding::Raw { components } => {
            let png = encode_png(image, components)?;
            Ok((png, "image/png"))
        }
        other => Err(format!("{:?} images cannot be embedded", other)),
    }
}

fn encode_png(image: &ImageContent, components: u8) -> std::result::Result<Vec<u8>, String> {
    let (width, height) = (image.pixel_width, image.pixel_height);
    if width == 0 || height == 0 {
        return Err("image has no pixels".to_string());
    }
    let pixels = width as usize * height as usize;

    let dynamic = match (components, image.bits_per_component) {
        (1, 8) => {
            let data = take_samples(&image.data, pixels)?;
            image::GrayImage::from_raw(width, height, data).map(image::DynamicImage::ImageLuma8)
        }
        (1, 1) => {
            let data = expand_bilevel(&image.data, width as usize, height as usize)?;
            image::GrayImage::from_raw(width, height, data).map(image::DynamicImage::ImageLuma8)
        }
        (3, 8) => {
            let data = take_samples(&image.data, pixels * 3)?;
            image::RgbImage::from_raw(width, height, data).map(image::DynamicImage::ImageRgb8)
        }
        (4, 8) => {
            let cmyk = take_samples(&image.data, pixels * 4)?;
            let rgb = cmyk
                .chunks_exact(4)
                .flat_map(|px| cmyk_to_rgb(px[0], px[1], px[2], px[3]))
                .collect();
            image::RgbImage::from_raw(width, height, rgb).map(image::DynamicImage::ImageRgb8)
        }
        (c, bpc) => {
            return Err(format!(
                "{} component image at {} bits per component cannot be transcoded",
                c, bpc
            ))
        }
    }
    .ok_or_else(|| "failed to create image buffer".to_string())?;

    let mut output = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut output, image::ImageFormat::Png)
        .map_err(|e| format!("PNG encoding failed: {}", e))?;
    Ok(output.into_inner())
}

fn take_samples(data: &[u8], len: usize) -> std::result::Result<Vec<u8>, String> {
    if data.len() < len {
        return Err(format!(
            "image data truncated ({} of {} bytes)",
            data.len(),
            len
        ));
    }
    Ok(data[..len].to_vec())
}

/// Expand 1-bit rows (byte aligned) to 8-bit gray.
fn expand_bilevel(data: &[u8], width: usize, height: usize) -> std::result::Result<Vec<u8>, String> {
    let row_bytes = width.div_ceil(8);
    let packed = take_samples(data, row_bytes * height)?;
    let mut out = Vec::with_capacity(width * height);
    for row in packed.chunks_exact(row_bytes) {
        for x in 0..width {
            let bit = (row[x / 8] >> (7 - (x % 8))) & 1;
            out.push(if bit == 1 { 255 } else { 0 });
        }
    }
    Ok(out)
}

/// Convert CMYK to RGB.
fn cmyk_to_rgb(c: u8, m: u8, y: u8, k: u8) -> [u8; 3] {
    let k = 255 - k as u16;
    let channel = |v: u8| ((255 - v as u16) * k / 255) as u8;
    [channel(c), channel(m), channel(y)]
}
