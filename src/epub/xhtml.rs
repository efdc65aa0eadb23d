//! XHTML content documents for chapters.

use std::collections::HashMap;

use crate::layout::heuristics::{
    ends_with_word_hyphen, is_spaceless_script_char, strip_list_marker,
};
use crate::model::{Block, Chapter, Fragment, FragmentId};

use super::STYLESHEET_HREF;

/// How two adjacent text pieces are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Join {
    Space,
    Direct,
    /// Drop the trailing hyphen of the previous piece and join directly
    Dehyphenate,
}

fn join_kind(prev: &str, next: &str) -> Join {
    let Some(last) = prev.chars().last() else {
        return Join::Direct;
    };
    let Some(first) = next.chars().next() else {
        return Join::Direct;
    };
    if ends_with_word_hyphen(prev) {
        if first.is_lowercase() {
            Join::Dehyphenate
        } else {
            Join::Direct
        }
    } else if last.is_whitespace() || first.is_whitespace() {
        Join::Direct
    } else if is_spaceless_script_char(last) && is_spaceless_script_char(first) {
        Join::Direct
    } else {
        Join::Space
    }
}

/// Consecutive text sharing one emphasis.
#[derive(Debug, Clone, PartialEq)]
struct Run {
    /// Separator written before the run, outside any emphasis
    lead: &'static str,
    /// Source page starting at this run, when page breaks are marked
    page_break: Option<u32>,
    text: String,
    bold: bool,
    italic: bool,
}

/// Join fragment texts into emphasis runs.
///
/// Line-end hyphenation is undone and spaceless-script text is joined
/// without inserted spaces. With `page_breaks`, a fragment on a later page
/// than its predecessor starts a run carrying that page.
fn inline_runs(fragments: &[Fragment], emphasis: bool, page_breaks: bool) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    let mut page = fragments.first().map(Fragment::page);
    for fragment in fragments {
        let Some(text) = fragment.as_text() else {
            continue;
        };
        let piece = text.text.trim();
        if piece.is_empty() {
            continue;
        }
        let page_break = if page_breaks && page != Some(fragment.page()) && !runs.is_empty() {
            Some(fragment.page())
        } else {
            None
        };
        page = Some(fragment.page());
        let (bold, italic) = if emphasis {
            (text.is_bold(), text.is_italic())
        } else {
            (false, false)
        };

        let lead = match runs.last_mut() {
            None => "",
            Some(last) => match join_kind(&last.text, piece) {
                Join::Space => " ",
                Join::Direct => "",
                Join::Dehyphenate => {
                    last.text.pop();
                    ""
                }
            },
        };

        match runs.last_mut() {
            Some(last) if last.bold == bold && last.italic == italic && page_break.is_none() => {
                last.text.push_str(lead);
                last.text.push_str(piece);
            }
            _ => runs.push(Run {
                lead,
                page_break,
                text: piece.to_string(),
                bold,
                italic,
            }),
        }
    }
    runs
}

/// Plain joined text of a fragment sequence.
pub fn join_fragments(fragments: &[Fragment]) -> String {
    let mut out = String::new();
    for run in inline_runs(fragments, false, false) {
        out.push_str(run.lead);
        out.push_str(&run.text);
    }
    out
}

fn write_runs(out: &mut String, runs: &[Run]) {
    for run in runs {
        out.push_str(run.lead);
        if let Some(page) = run.page_break {
            out.push_str(&page_break_span(page));
        }
        let text = escape_xml(&run.text);
        match (run.bold, run.italic) {
            (true, true) => out.push_str(&format!("<strong><em>{}</em></strong>", text)),
            (true, false) => out.push_str(&format!("<strong>{}</strong>", text)),
            (false, true) => out.push_str(&format!("<em>{}</em>", text)),
            (false, false) => out.push_str(&text),
        }
    }
}

fn page_break_span(page: u32) -> String {
    format!(
        "<span epub:type=\"pagebreak\" id=\"page-{0}\" title=\"{0}\"></span>",
        page
    )
}

/// Options for chapter serialization.
#[derive(Debug, Clone)]
pub struct XhtmlOptions {
    /// Document language (`xml:lang`)
    pub language: String,
    /// Emit `epub:type="pagebreak"` markers where source pages start,
    /// inside a paragraph or list item that runs onto a new page
    pub page_markers: bool,
}

impl Default for XhtmlOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            page_markers: false,
        }
    }
}

/// Serializes chapters to XHTML, one content document each.
pub struct XhtmlWriter<'a> {
    options: &'a XhtmlOptions,
    last_page: Option<u32>,
}

impl<'a> XhtmlWriter<'a> {
    pub fn new(options: &'a XhtmlOptions) -> Self {
        Self {
            options,
            last_page: None,
        }
    }

    /// Render a chapter; `images` maps image fragments to their package hrefs.
    ///
    /// Fails when an image block has no href.
    pub fn render(
        &mut self,
        chapter: &Chapter,
        images: &HashMap<FragmentId, String>,
    ) -> std::result::Result<String, String> {
        let saved = self.last_page;
        match self.render_body(chapter, images) {
            Ok(body) => Ok(self.document(chapter, &body)),
            Err(reason) => {
                self.last_page = saved;
                Err(reason)
            }
        }
    }

    fn render_body(
        &mut self,
        chapter: &Chapter,
        images: &HashMap<FragmentId, String>,
    ) -> std::result::Result<String, String> {
        let mut body = String::new();
        let mut open_list: Option<bool> = None;

        for block in &chapter.blocks {
            let ordered = match block {
                Block::ListItem { ordered, .. } => Some(*ordered),
                _ => None,
            };
            if open_list.is_some() && open_list != ordered {
                close_list(&mut body, open_list.take());
            }

            let marker = self.page_marker(block);
            match block {
                Block::Paragraph { fragments } => {
                    body.push_str(&marker);
                    let runs = inline_runs(fragments, true, self.options.page_markers);
                    if !runs.is_empty() {
                        body.push_str("<p>");
                        write_runs(&mut body, &runs);
                        body.push_str("</p>\n");
                    }
                }
                Block::Heading {
                    level,
                    fragments,
                    anchor,
                } => {
                    body.push_str(&marker);
                    let level = (*level).clamp(1, 6);
                    let text = escape_xml(&join_fragments(fragments));
                    match anchor {
                        Some(id) => body.push_str(&format!(
                            "<h{0} id=\"{1}\">{2}</h{0}>\n",
                            level,
                            escape_xml(id),
                            text
                        )),
                        None => body.push_str(&format!("<h{0}>{1}</h{0}>\n", level, text)),
                    }
                }
                Block::Image { fragment } => {
                    body.push_str(&marker);
                    let href = images.get(&fragment.id).ok_or_else(|| {
                        format!("image {} has no packaged resource", fragment.id)
                    })?;
                    body.push_str(&format!(
                        "<figure><img src=\"{}\" alt=\"\"/></figure>\n",
                        escape_xml(href)
                    ));
                }
                Block::ListItem { ordered, fragments } => {
                    // Inside an open list the marker moves into the item
                    let mut item_marker = marker.as_str();
                    if open_list.is_none() {
                        body.push_str(&marker);
                        body.push_str(if *ordered { "<ol>\n" } else { "<ul>\n" });
                        open_list = Some(*ordered);
                        item_marker = "";
                    }
                    let mut runs = inline_runs(fragments, true, self.options.page_markers);
                    strip_marker(&mut runs);
                    body.push_str("<li>");
                    body.push_str(item_marker);
                    write_runs(&mut body, &runs);
                    body.push_str("</li>\n");
                }
            }
            if let Some(page) = block.last_page() {
                self.last_page = Some(page);
            }
        }
        close_list(&mut body, open_list);
        Ok(body)
    }

    /// Page-break marker for a block that starts a new source page.
    fn page_marker(&mut self, block: &Block) -> String {
        let Some(page) = block.first_page() else {
            return String::new();
        };
        if self.last_page == Some(page) {
            return String::new();
        }
        self.last_page = Some(page);
        if self.options.page_markers {
            page_break_span(page) + "\n"
        } else {
            String::new()
        }
    }

    fn document(&self, chapter: &Chapter, body: &str) -> String {
        let lang = escape_xml(&self.options.language);
        let section_type = if chapter.front_matter {
            "frontmatter"
        } else {
            "chapter"
        };
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{lang}" lang="{lang}">
<head>
  <meta charset="UTF-8"/>
  <title>{title}</title>
  <link rel="stylesheet" type="text/css" href="{css}"/>
</head>
<body>
<section epub:type="{section_type}" id="chapter-{id}">
{body}</section>
</body>
</html>
"#,
            lang = lang,
            title = escape_xml(&chapter.title),
            css = STYLESHEET_HREF,
            section_type = section_type,
            id = chapter.id,
            body = body,
        )
    }
}

fn close_list(body: &mut String, open: Option<bool>) {
    match open {
        Some(true) => body.push_str("</ol>\n"),
        Some(false) => body.push_str("</ul>\n"),
        None => {}
    }
}

/// Remove the list marker from the start of the first run.
fn strip_marker(runs: &mut Vec<Run>) {
    let Some(first) = runs.first_mut() else {
        return;
    };
    let stripped = strip_list_marker(&first.text).trim_start().to_string();
    if stripped.is_empty() {
        runs.remove(0);
        if let Some(next) = runs.first_mut() {
            next.lead = "";
        }
    } else {
        first.text = stripped;
    }
}

/// Escape XML special characters.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // Not allowed anywhere in an XML 1.0 document
            '\u{FFFE}' | '\u{FFFF}' => {}
            c if c.is_control() && !matches!(c, '\t' | '\n' | '\r') => {}
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundingBox, ChapterId, ImageContent, ImageEncoding, TextContent};

    fn frag(page: u32, seq: u32, font: &str, text: &str) -> Fragment {
        Fragment::text(
            FragmentId::new(page, seq),
            BoundingBox::new(72.0, 100.0 + seq as f32 * 12.0, 200.0, 10.0),
            TextContent::new(text, font, 10.0),
        )
    }

    fn chapter(blocks: Vec<Block>) -> Chapter {
        let mut chapter = Chapter::new(ChapterId(1), "One & Two");
        chapter.blocks = blocks;
        chapter
    }

    fn render(blocks: Vec<Block>, images: &HashMap<FragmentId, String>) -> String {
        let options = XhtmlOptions::default();
        XhtmlWriter::new(&options)
            .render(&chapter(blocks), images)
            .unwrap()
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
        assert_eq!(escape_xml("T\u{FFFE}it\u{0001}le\u{FFFF}\n"), "Title\n");
    }

    #[test]
    fn test_join_dehyphenates_and_spaces() {
        let frags = vec![
            frag(1, 0, "Times", "infor-"),
            frag(1, 1, "Times", "mation is"),
            frag(1, 2, "Times", "here"),
        ];
        assert_eq!(join_fragments(&frags), "information is here");
    }

    #[test]
    fn test_join_keeps_compound_hyphen_before_capital() {
        let frags = vec![frag(1, 0, "Times", "Anglo-"), frag(1, 1, "Times", "Saxon")];
        assert_eq!(join_fragments(&frags), "Anglo-Saxon");
    }

    #[test]
    fn test_join_cjk_without_spaces() {
        let frags = vec![frag(1, 0, "Mincho", "日本語の"), frag(1, 1, "Mincho", "文章")];
        assert_eq!(join_fragments(&frags), "日本語の文章");
    }

    #[test]
    fn test_paragraph_with_emphasis() {
        let blocks = vec![Block::paragraph(vec![
            frag(1, 0, "Times-Roman", "plain"),
            frag(1, 1, "Times-Bold", "bold"),
            frag(1, 2, "Times-Italic", "italic"),
        ])];
        let xhtml = render(blocks, &HashMap::new());
        assert!(xhtml.contains("<p>plain <strong>bold</strong> <em>italic</em></p>"));
        assert!(xhtml.contains("<title>One &amp; Two</title>"));
    }

    #[test]
    fn test_heading_with_anchor() {
        let mut heading = Block::heading(8, vec![frag(1, 0, "Helvetica", "Deep")]);
        if let Block::Heading { anchor, .. } = &mut heading {
            *anchor = Some("h1-1".to_string());
        }
        let xhtml = render(vec![heading], &HashMap::new());
        assert!(xhtml.contains("<h6 id=\"h1-1\">Deep</h6>"));
    }

    #[test]
    fn test_list_grouping() {
        let blocks = vec![
            Block::list_item(false, vec![frag(1, 0, "Times", "• one")]),
            Block::list_item(false, vec![frag(1, 1, "Times", "• two")]),
            Block::list_item(true, vec![frag(1, 2, "Times", "1. first")]),
            Block::paragraph(vec![frag(1, 3, "Times", "after")]),
        ];
        let xhtml = render(blocks, &HashMap::new());
        assert!(xhtml.contains("<ul>\n<li>one</li>\n<li>two</li>\n</ul>\n<ol>\n<li>first</li>\n</ol>\n<p>after</p>"));
    }

    #[test]
    fn test_image_figure() {
        let image = Fragment::image(
            FragmentId::new(1, 0),
            BoundingBox::new(0.0, 0.0, 100.0, 100.0),
            ImageContent::new(Vec::new(), ImageEncoding::Jpeg, 10, 10),
        );
        let mut images = HashMap::new();
        images.insert(FragmentId::new(1, 0), "images/img_0001.jpg".to_string());
        let xhtml = render(vec![Block::image(image.clone())], &images);
        assert!(xhtml.contains("<figure><img src=\"images/img_0001.jpg\" alt=\"\"/></figure>"));

        let options = XhtmlOptions::default();
        let missing = XhtmlWriter::new(&options).render(&chapter(vec![Block::image(image)]), &HashMap::new());
        assert!(missing.is_err());
    }

    #[test]
    fn test_page_markers() {
        let options = XhtmlOptions {
            page_markers: true,
            ..Default::default()
        };
        let blocks = vec![
            Block::paragraph(vec![frag(1, 0, "Times", "a")]),
            Block::paragraph(vec![frag(1, 1, "Times", "b")]),
            Block::paragraph(vec![frag(2, 0, "Times", "c")]),
        ];
        let xhtml = XhtmlWriter::new(&options)
            .render(&chapter(blocks), &HashMap::new())
            .unwrap();
        assert_eq!(xhtml.matches("epub:type=\"pagebreak\"").count(), 2);
        assert!(xhtml.contains("id=\"page-2\""));
    }

    #[test]
    fn test_page_marker_inside_paragraph() {
        let options = XhtmlOptions {
            page_markers: true,
            ..Default::default()
        };
        let blocks = vec![
            Block::paragraph(vec![frag(1, 0, "Times", "runs onto"), frag(2, 0, "Times", "the next page")]),
            Block::paragraph(vec![frag(2, 1, "Times", "Same page.")]),
            Block::paragraph(vec![frag(3, 0, "Times", "Third page.")]),
        ];
        let xhtml = XhtmlWriter::new(&options)
            .render(&chapter(blocks), &HashMap::new())
            .unwrap();

        assert!(xhtml.contains(
            "<p>runs onto <span epub:type=\"pagebreak\" id=\"page-2\" title=\"2\"></span>the next page</p>"
        ));
        assert_eq!(xhtml.matches("id=\"page-2\"").count(), 1);
        assert_eq!(xhtml.matches("epub:type=\"pagebreak\"").count(), 3);

        let plain = XhtmlWriter::new(&XhtmlOptions::default())
            .render(&chapter(vec![Block::paragraph(vec![
                frag(1, 0, "Times", "runs onto"),
                frag(2, 0, "Times", "the next page"),
            ])]), &HashMap::new())
            .unwrap();
        assert!(plain.contains("<p>runs onto the next page</p>"));
    }
}
