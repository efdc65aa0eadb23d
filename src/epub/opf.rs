//! The OPF package document.

use chrono::{DateTime, Utc};

use super::writer::ManifestItem;
use super::xhtml::escape_xml;

/// Package-level metadata written to `content.opf`.
#[derive(Debug, Clone)]
pub struct PackageMetadata {
    pub title: String,
    pub authors: Vec<String>,
    pub language: String,
    pub identifier: String,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: DateTime<Utc>,
}

/// Generate the EPUB 3 package document.
pub fn content_opf(
    metadata: &PackageMetadata,
    manifest: &[ManifestItem],
    spine: &[String],
) -> String {
    let mut opf = String::new();

    opf.push_str(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
"#,
    );

    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape_xml(&metadata.identifier)
    ));
    opf.push_str(&format!(
        "    <dc:title>{}</dc:title>\n",
        escape_xml(&metadata.title)
    ));
    opf.push_str(&format!(
        "    <dc:language>{}</dc:language>\n",
        escape_xml(&metadata.language)
    ));
    for author in &metadata.authors {
        opf.push_str(&format!(
            "    <dc:creator>{}</dc:creator>\n",
            escape_xml(author)
        ));
    }
    if let Some(ref subject) = metadata.subject {
        opf.push_str(&format!(
            "    <dc:subject>{}</dc:subject>\n",
            escape_xml(subject)
        ));
    }
    if let Some(ref keywords) = metadata.keywords {
        for keyword in keywords.split([',', ';']).map(str::trim).filter(|k| !k.is_empty()) {
            opf.push_str(&format!(
                "    <dc:subject>{}</dc:subject>\n",
                escape_xml(keyword)
            ));
        }
    }
    if let Some(created) = metadata.created {
        opf.push_str(&format!(
            "    <dc:date>{}</dc:date>\n",
            created.format("%Y-%m-%d")
        ));
    }
    opf.push_str(&format!(
        "    <meta property=\"dcterms:modified\">{}</meta>\n",
        metadata.modified.format("%Y-%m-%dT%H:%M:%SZ")
    ));

    // EPUB 2 readers find the cover through this meta
    if let Some(cover) = manifest
        .iter()
        .find(|item| item.properties.as_deref() == Some("cover-image"))
    {
        opf.push_str(&format!(
            "    <meta name=\"cover\" content=\"{}\"/>\n",
            escape_xml(&cover.id)
        ));
    }

    opf.push_str("  </metadata>\n  <manifest>\n");
    for item in manifest {
        let properties = item
            .properties
            .as_ref()
            .map(|p| format!(" properties=\"{}\"", escape_xml(p)))
            .unwrap_or_default();
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"{}\"{}/>\n",
            escape_xml(&item.id),
            escape_xml(&item.href),
            escape_xml(&item.media_type),
            properties
        ));
    }

    opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");
    for idref in spine {
        opf.push_str(&format!("    <itemref idref=\"{}\"/>\n", escape_xml(idref)));
    }
    opf.push_str("  </spine>\n</package>\n");
    opf
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_content_opf() {
        let metadata = PackageMetadata {
            title: "A & B".to_string(),
            authors: vec!["Jane Roe".to_string()],
            language: "en".to_string(),
            identifier: "urn:pdf:abc".to_string(),
            subject: None,
            keywords: Some("one, two".to_string()),
            created: None,
            modified: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        };
        let manifest = vec![
            ManifestItem::new("nav", "nav.xhtml", "application/xhtml+xml").with_properties("nav"),
            ManifestItem::new("chapter_001", "chapter_001.xhtml", "application/xhtml+xml"),
            ManifestItem::new("img_0001", "images/img_0001.png", "image/png")
                .with_properties("cover-image"),
        ];
        let opf = content_opf(&metadata, &manifest, &["chapter_001".to_string()]);

        assert!(opf.contains("<dc:title>A &amp; B</dc:title>"));
        assert!(opf.contains("<dc:creator>Jane Roe</dc:creator>"));
        assert!(opf.contains("<meta property=\"dcterms:modified\">2024-05-01T12:00:00Z</meta>"));
        assert!(opf.contains("properties=\"nav\""));
        assert!(opf.contains("<meta name=\"cover\" content=\"img_0001\"/>"));
        assert!(opf.contains("<itemref idref=\"chapter_001\"/>"));
        assert_eq!(opf.matches("<dc:subject>").count(), 2);
    }
}
