//! Entries of a printed table of contents page.
//!
//! Lines like `Introduction ........ 7` name a chapter and the page it starts
//! on. Page numbers are source page numbers.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::model::{Fragment, PageStream};

lazy_static! {
    /// Title, then a dot leader, ellipsis or spaced dash, then a page number.
    static ref TOC_LINE: Regex = Regex::new(
        r"^\s*(?P<title>.*?\S)\s*(?:(?:\.\s*){2,}|…+\s*|\s[-–]\s*)(?P<page>\d{1,4})\s*$"
    )
    .unwrap();
}

/// One line of a printed contents page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrintedTocEntry {
    pub title: String,
    /// Page the entry points at
    pub page: u32,
}

impl PrintedTocEntry {
    pub fn new(title: impl Into<String>, page: u32) -> Self {
        Self {
            title: title.into(),
            page,
        }
    }
}

/// Parse one contents line; lines without a leader and page number yield `None`.
pub fn parse_toc_line(line: &str) -> Option<PrintedTocEntry> {
    let caps = TOC_LINE.captures(line)?;
    let title = caps.name("title")?.as_str();
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    let page: u32 = caps.name("page")?.as_str().parse().ok()?;
    if page == 0 || title.chars().all(|c| !c.is_alphanumeric()) {
        return None;
    }
    Some(PrintedTocEntry::new(title, page))
}

/// Read the entries of a reading-ordered contents page, in page order.
pub fn parse_toc_page(page: &PageStream, tolerance: f32) -> Vec<PrintedTocEntry> {
    text_lines(&page.fragments, tolerance)
        .iter()
        .filter_map(|line| parse_toc_line(line))
        .collect()
}

/// Join consecutive co-line text fragments into line strings.
fn text_lines(fragments: &[Fragment], tolerance: f32) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut anchor: Option<&Fragment> = None;
    for fragment in fragments.iter().filter(|f| !f.is_image()) {
        let text = fragment.text_str().trim();
        if text.is_empty() {
            continue;
        }
        let same_line = anchor.is_some_and(|first| {
            let reach = tolerance * first.bbox.height.max(fragment.bbox.height);
            (fragment.bbox.center_y() - first.bbox.center_y()).abs() <= reach
        });
        match lines.last_mut() {
            Some(line) if same_line => {
                line.push(' ');
                line.push_str(text);
            }
            _ => {
                lines.push(text.to_string());
                anchor = Some(fragment);
            }
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundingBox, FragmentId, TextContent};

    #[test]
    fn test_dot_leader_lines() {
        assert_eq!(
            parse_toc_line("Introduction ........ 7"),
            Some(PrintedTocEntry::new("Introduction", 7))
        );
        assert_eq!(
            parse_toc_line("2. The Long Road . . . . . 113"),
            Some(PrintedTocEntry::new("2. The Long Road", 113))
        );
        assert_eq!(
            parse_toc_line("Epilogue…… 240"),
            Some(PrintedTocEntry::new("Epilogue", 240))
        );
        assert_eq!(
            parse_toc_line("Appendix - 251"),
            Some(PrintedTocEntry::new("Appendix", 251))
        );
    }

    #[test]
    fn test_lines_without_entries() {
        assert_eq!(parse_toc_line("Contents"), None);
        assert_eq!(parse_toc_line("Chapter 12"), None);
        assert_eq!(parse_toc_line("It cost 3.50 in 1999"), None);
        assert_eq!(parse_toc_line("........ 7"), None);
        assert_eq!(parse_toc_line("Front ..... 0"), None);
    }

    #[test]
    fn test_page_lines_join_split_fragments() {
        let frag = |seq: u32, x: f32, y: f32, text: &str| {
            Fragment::text(
                FragmentId::new(2, seq),
                BoundingBox::new(x, y, 100.0, 12.0),
                TextContent::new(text, "Times-Roman", 12.0),
            )
        };
        let mut page = PageStream::letter(2);
        page.fragments = vec![
            frag(0, 72.0, 60.0, "Contents"),
            frag(1, 72.0, 100.0, "One Beginning"),
            frag(2, 300.0, 100.0, "......... 3"),
            frag(3, 72.0, 120.0, "Two Middle .... 9"),
        ];
        assert_eq!(
            parse_toc_page(&page, 0.5),
            vec![
                PrintedTocEntry::new("One Beginning", 3),
                PrintedTocEntry::new("Two Middle", 9),
            ]
        );
    }
}
