//! Navigation documents: EPUB 3 `nav.xhtml` and EPUB 2 `toc.ncx`.

use crate::model::TocEntry;

use super::xhtml::escape_xml;

/// Generate the EPUB 3 navigation document.
pub fn nav_xhtml(title: &str, language: &str, toc: &[TocEntry]) -> String {
    let mut nav = String::new();
    let lang = escape_xml(language);
    nav.push_str(&format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{0}" lang="{0}">
<head>
  <meta charset="UTF-8"/>
  <title>{1}</title>
</head>
<body>
  <nav epub:type="toc" id="toc">
    <h1>{1}</h1>
"#,
        lang,
        escape_xml(title)
    ));
    write_nav_list(&mut nav, toc, 2);
    nav.push_str("  </nav>\n</body>\n</html>\n");
    nav
}

fn write_nav_list(nav: &mut String, entries: &[TocEntry], indent: usize) {
    if entries.is_empty() {
        return;
    }
    let indent_str = "  ".repeat(indent);
    nav.push_str(&format!("{}<ol>\n", indent_str));
    for entry in entries {
        nav.push_str(&format!(
            "{}  <li><a href=\"{}\">{}</a>",
            indent_str,
            escape_xml(&entry.href()),
            escape_xml(&entry.title)
        ));
        if entry.children.is_empty() {
            nav.push_str("</li>\n");
        } else {
            nav.push('\n');
            write_nav_list(nav, &entry.children, indent + 2);
            nav.push_str(&format!("{}  </li>\n", indent_str));
        }
    }
    nav.push_str(&format!("{}</ol>\n", indent_str));
}

/// Generate the NCX table of contents.
pub fn toc_ncx(title: &str, identifier: &str, toc: &[TocEntry]) -> String {
    let mut ncx = String::new();
    ncx.push_str(&format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE ncx PUBLIC "-//NISO//DTD ncx 2005-1//EN" "http://www.daisy.org/z3986/2005/ncx-2005-1.dtd">
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{}"/>
    <meta name="dtb:depth" content="{}"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>{}</text>
  </docTitle>
  <navMap>
"#,
        escape_xml(identifier),
        TocEntry::depth(toc).max(1),
        escape_xml(title)
    ));

    let mut play_order = 1;
    write_nav_points(&mut ncx, toc, &mut play_order, 2);

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

fn write_nav_points(ncx: &mut String, entries: &[TocEntry], play_order: &mut usize, indent: usize) {
    let indent_str = "  ".repeat(indent);
    for entry in entries {
        ncx.push_str(&format!(
            "{}<navPoint id=\"navPoint-{}\" playOrder=\"{}\">\n",
            indent_str, play_order, play_order
        ));
        ncx.push_str(&format!(
            "{}  <navLabel><text>{}</text></navLabel>\n",
            indent_str,
            escape_xml(&entry.title)
        ));
        ncx.push_str(&format!(
            "{}  <content src=\"{}\"/>\n",
            indent_str,
            escape_xml(&entry.href())
        ));
        *play_order += 1;

        write_nav_points(ncx, &entry.children, play_order, indent + 1);

        ncx.push_str(&format!("{}</navPoint>\n", indent_str));
    }
}
