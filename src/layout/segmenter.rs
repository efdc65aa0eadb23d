//! Structure segmentation: ordered fragments into paragraphs, headings, list items and images.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Warning;
use crate::model::{BoundingBox, Block, Fragment, PageStream};

use super::heuristics::{
    ends_sentence, heading_level, is_page_number, list_marker, size_bucket, ListMarker,
};
use super::LayoutConfig;

/// Fallback body size when a document has no text at all.
const DEFAULT_BODY_SIZE: f32 = 12.0;

/// Font statistics over a whole document.
///
/// Computed once over every page before segmentation starts; the body size
/// is the mode of text fragment sizes in 0.1pt buckets, ties going to the
/// smaller size.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FontStatistics {
    /// Size bucket → (fragments, bold fragments)
    histogram: BTreeMap<i32, (usize, usize)>,
    body_size: f32,
    body_bold: bool,
}

impl FontStatistics {
    /// Create empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect statistics over all decodable text fragments.
    pub fn from_pages(pages: &[PageStream]) -> Self {
        let mut stats = Self::new();
        for fragment in pages.iter().flat_map(|p| p.fragments.iter()) {
            if let Some(text) = fragment.as_text() {
                if !text.undecodable {
                    stats.add(text.font_size, text.is_bold());
                }
            }
        }
        stats.analyze();
        stats
    }

    /// Add a font size observation.
    pub fn add(&mut self, size: f32, bold: bool) {
        if !size.is_finite() || size <= 0.0 {
            return;
        }
        let entry = self.histogram.entry(size_bucket(size)).or_insert((0, 0));
        entry.0 += 1;
        if bold {
            entry.1 += 1;
        }
    }

    /// Calculate body size and body weight.
    pub fn analyze(&mut self) {
        let mut best: Option<(i32, usize, usize)> = None;
        // Ascending keys with a strict comparison keep the smaller size on ties
        for (&key, &(count, bold)) in &self.histogram {
            if best.map_or(true, |(_, c, _)| count > c) {
                best = Some((key, count, bold));
            }
        }
        match best {
            Some((key, count, bold)) => {
                self.body_size = key as f32 / 10.0;
                self.body_bold = bold * 2 > count;
            }
            None => {
                self.body_size = DEFAULT_BODY_SIZE;
                self.body_bold = false;
            }
        }
    }

    /// Dominant (body text) font size.
    pub fn body_size(&self) -> f32 {
        if self.body_size > 0.0 {
            self.body_size
        } else {
            DEFAULT_BODY_SIZE
        }
    }

    /// Whether most body-size text is bold.
    pub fn body_is_bold(&self) -> bool {
        self.body_bold
    }

    /// Number of distinct sizes observed.
    pub fn distinct_sizes(&self) -> usize {
        self.histogram.len()
    }

    /// Observed sizes with their fragment counts, ascending.
    pub fn sizes(&self) -> impl Iterator<Item = (f32, usize)> + '_ {
        self.histogram
            .iter()
            .map(|(&key, &(count, _))| (key as f32 / 10.0, count))
    }
}

/// Result of segmenting a document.
#[derive(Debug, Default)]
pub struct Segmentation {
    pub blocks: Vec<Block>,
    pub warnings: Vec<Warning>,
    /// Undecodable fragments dropped
    pub dropped_fragments: usize,
    /// Pages kept as a single paragraph
    pub degraded_pages: usize,
}

/// Groups reading-ordered fragments into blocks.
pub struct Segmenter<'a> {
    config: &'a LayoutConfig,
    stats: &'a FontStatistics,
}

impl<'a> Segmenter<'a> {
    /// Create a segmenter over precomputed statistics.
    pub fn new(config: &'a LayoutConfig, stats: &'a FontStatistics) -> Self {
        Self { config, stats }
    }

    /// Segment reading-ordered pages, in page order, into one block sequence.
    pub fn segment(&self, pages: Vec<PageStream>) -> Segmentation {
        let mut out = Segmentation::default();
        let mut builder = BlockBuilder::new(self.config, self.stats.body_size());

        for mut page in pages {
            let number = page.number;
            let fragments = std::mem::take(&mut page.fragments);
            let mut kept = Vec::with_capacity(fragments.len());
            for fragment in fragments {
                if fragment.is_undecodable() {
                    log::warn!("page {}: dropped undecodable text {}", number, fragment.id);
                    out.warnings.push(Warning::UndecodableFragment {
                        page: number,
                        fragment: fragment.id,
                    });
                    out.dropped_fragments += 1;
                } else {
                    kept.push(fragment);
                }
            }

            if let Some(reason) = unsegmentable_reason(&page, &kept) {
                log::warn!("page {}: {}, kept as a single paragraph", number, reason);
                out.warnings.push(Warning::UnsegmentablePage {
                    page: number,
                    reason,
                });
                out.degraded_pages += 1;
                builder.push_degraded(kept);
                continue;
            }

            for item in group_lines(kept, self.config.line_tolerance) {
                match item {
                    Item::Image(fragment) => builder.push_image(fragment),
                    Item::Line(line) => {
                        let kind = self.classify(&line);
                        builder.push_line(line, kind);
                    }
                }
            }
        }

        out.blocks = builder.finish();
        log::debug!(
            "segmented {} blocks (body size {:.1}pt{})",
            out.blocks.len(),
            self.stats.body_size(),
            if self.stats.body_is_bold() { ", bold" } else { "" }
        );
        out
    }

    fn classify(&self, line: &Line) -> LineKind {
        let ratio = line.size / self.stats.body_size();
        if ratio >= self.config.heading_size_ratio {
            return LineKind::Heading(heading_level(ratio, &self.config.heading_tiers));
        }
        if let Some(marker) = list_marker(&line.first_text()) {
            return LineKind::ListStart(marker);
        }
        if line.bold && !self.stats.body_is_bold() {
            return LineKind::Heading(self.config.lowest_heading_level());
        }
        LineKind::Body
    }
}

/// Why a page cannot go through line analysis, if it cannot.
fn unsegmentable_reason(page: &PageStream, fragments: &[Fragment]) -> Option<String> {
    if !(page.width.is_finite() && page.height.is_finite() && page.width > 0.0 && page.height > 0.0)
    {
        return Some("page has no usable size".to_string());
    }
    if fragments.iter().any(|f| !f.bbox.is_finite()) {
        return Some("non-finite fragment coordinates".to_string());
    }
    if fragments
        .iter()
        .filter_map(|f| f.font_size())
        .any(|s| !s.is_finite() || s <= 0.0)
    {
        return Some("non-positive font size".to_string());
    }
    None
}

/// A visual line of text fragments.
#[derive(Debug)]
struct Line {
    fragments: Vec<Fragment>,
    bbox: BoundingBox,
    /// Character-weighted font size
    size: f32,
    /// Majority of characters bold
    bold: bool,
    page: u32,
}

impl Line {
    fn new(fragment: Fragment) -> Self {
        let mut line = Self {
            bbox: fragment.bbox,
            page: fragment.page(),
            size: 0.0,
            bold: false,
            fragments: vec![fragment],
        };
        line.measure();
        line
    }

    fn push(&mut self, fragment: Fragment) {
        self.bbox = self.bbox.union(&fragment.bbox);
        self.fragments.push(fragment);
        self.measure();
    }

    fn measure(&mut self) {
        let mut chars = 0usize;
        let mut bold_chars = 0usize;
        let mut weighted = 0.0f32;
        for text in self.fragments.iter().filter_map(|f| f.as_text()) {
            let n = text.text.chars().count().max(1);
            chars += n;
            weighted += text.font_size * n as f32;
            if text.is_bold() {
                bold_chars += n;
            }
        }
        if chars > 0 {
            self.size = weighted / chars as f32;
            self.bold = bold_chars * 2 > chars;
        }
    }

    fn first_text(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.text_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn last_fragment(&self) -> Option<&Fragment> {
        self.fragments.last()
    }

    fn accepts(&self, fragment: &Fragment, tolerance: f32) -> bool {
        let Some(last) = self.last_fragment() else {
            return true;
        };
        let reach = tolerance * self.bbox.height.max(fragment.bbox.height);
        let size = fragment.font_size().unwrap_or(self.size);
        (fragment.bbox.center_y() - last.bbox.center_y()).abs() <= reach
            && fragment.bbox.left() >= last.bbox.right() - size
    }
}

#[derive(Debug)]
enum Item {
    Line(Line),
    Image(Fragment),
}

/// Split a page's ordered fragments into lines and images.
fn group_lines(fragments: Vec<Fragment>, tolerance: f32) -> Vec<Item> {
    let mut items = Vec::new();
    let mut current: Option<Line> = None;

    for fragment in fragments {
        if fragment.is_image() {
            if let Some(line) = current.take() {
                items.push(Item::Line(line));
            }
            items.push(Item::Image(fragment));
            continue;
        }
        match current.as_mut() {
            Some(line) if line.accepts(&fragment, tolerance) => line.push(fragment),
            _ => {
                if let Some(line) = current.take() {
                    items.push(Item::Line(line));
                }
                current = Some(Line::new(fragment));
            }
        }
    }
    if let Some(line) = current {
        items.push(Item::Line(line));
    }
    items
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Heading(u8),
    ListStart(ListMarker),
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenKind {
    Paragraph,
    Heading(u8),
    ListItem(bool),
}

/// The block currently being filled.
struct Open {
    kind: OpenKind,
    fragments: Vec<Fragment>,
    last_bbox: BoundingBox,
    last_size: f32,
    last_text: String,
    page: u32,
}

impl Open {
    fn new(kind: OpenKind, line: Line) -> Self {
        let mut open = Self {
            kind,
            fragments: Vec::new(),
            last_bbox: line.bbox,
            last_size: line.size,
            last_text: String::new(),
            page: line.page,
        };
        open.append(line);
        open
    }

    fn append(&mut self, line: Line) {
        self.last_bbox = line.bbox;
        self.last_size = line.size;
        self.last_text = line.first_text();
        self.page = line.page;
        self.fragments.extend(line.fragments);
    }

    fn into_block(self) -> Block {
        match self.kind {
            OpenKind::Paragraph => Block::paragraph(self.fragments),
            OpenKind::Heading(level) => Block::heading(level, self.fragments),
            OpenKind::ListItem(ordered) => Block::list_item(ordered, self.fragments),
        }
    }
}

struct BlockBuilder<'a> {
    config: &'a LayoutConfig,
    body_size: f32,
    blocks: Vec<Block>,
    open: Option<Open>,
}

impl<'a> BlockBuilder<'a> {
    fn new(config: &'a LayoutConfig, body_size: f32) -> Self {
        Self {
            config,
            body_size,
            blocks: Vec::new(),
            open: None,
        }
    }

    fn flush(&mut self) {
        if let Some(open) = self.open.take() {
            self.blocks.push(open.into_block());
        }
    }

    fn push_image(&mut self, fragment: Fragment) {
        self.flush();
        self.blocks.push(Block::image(fragment));
    }

    /// A page that skipped line analysis: one paragraph, images kept.
    fn push_degraded(&mut self, fragments: Vec<Fragment>) {
        self.flush();
        let mut text = Vec::new();
        let mut before = Vec::new();
        let mut after = Vec::new();
        for fragment in fragments {
            if fragment.is_image() {
                if text.is_empty() {
                    before.push(fragment);
                } else {
                    after.push(fragment);
                }
            } else {
                text.push(fragment);
            }
        }
        self.blocks.extend(before.into_iter().map(Block::image));
        if !text.is_empty() {
            self.blocks.push(Block::paragraph(text));
        }
        self.blocks.extend(after.into_iter().map(Block::image));
    }

    fn push_line(&mut self, line: Line, kind: LineKind) {
        match kind {
            LineKind::Heading(level) => {
                let merge = matches!(&self.open, Some(open)
                    if open.kind == OpenKind::Heading(level)
                        && open.page == line.page
                        && self.gap(open, &line) <= self.config.paragraph_gap_threshold * line.size.max(open.last_size));
                if merge {
                    if let Some(open) = self.open.as_mut() {
                        open.append(line);
                    }
                } else {
                    self.flush();
                    self.open = Some(Open::new(OpenKind::Heading(level), line));
                }
            }
            LineKind::ListStart(marker) => {
                // "I." or "vi." inside running prose is a word, not an enumerator
                let mid_sentence = marker.alphabetic
                    && matches!(&self.open, Some(open)
                        if open.kind == OpenKind::Paragraph
                            && !ends_sentence(&open.last_text)
                            && self.continues(open, &line));
                if mid_sentence {
                    self.push_line(line, LineKind::Body);
                    return;
                }
                self.flush();
                self.open = Some(Open::new(OpenKind::ListItem(marker.ordered), line));
            }
            LineKind::Body => {
                let continues = match &self.open {
                    Some(open) if matches!(open.kind, OpenKind::Paragraph | OpenKind::ListItem(_)) => {
                        self.continues(open, &line)
                    }
                    _ => false,
                };
                if continues {
                    if let Some(open) = self.open.as_mut() {
                        open.append(line);
                    }
                } else {
                    self.flush();
                    self.open = Some(Open::new(OpenKind::Paragraph, line));
                }
            }
        }
    }

    /// Whitespace between the last line of `open` and `line`.
    fn gap(&self, open: &Open, line: &Line) -> f32 {
        line.bbox.top() - open.last_bbox.bottom()
    }

    fn continues(&self, open: &Open, line: &Line) -> bool {
        if (open.last_size - line.size).abs() > 1.0 {
            return false;
        }
        let flows_on = !ends_sentence(&open.last_text) && !is_page_number(&open.last_text);
        if open.page != line.page {
            return flows_on;
        }
        let gap = self.gap(open, line);
        if gap > self.config.paragraph_gap_threshold * self.body_size {
            return false;
        }
        if gap < -self.body_size {
            // Moved back up the page: next column
            return flows_on;
        }
        true
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FragmentId, ImageContent, ImageEncoding, TextContent};

    fn text_at(page: u32, seq: u32, y: f32, size: f32, font: &str, text: &str) -> Fragment {
        Fragment::text(
            FragmentId::new(page, seq),
            BoundingBox::new(72.0, y, 300.0, size),
            TextContent::new(text, font, size),
        )
    }

    fn page_of(number: u32, fragments: Vec<Fragment>) -> PageStream {
        let mut page = PageStream::letter(number);
        page.fragments = fragments;
        page
    }

    fn segment(pages: Vec<PageStream>) -> Segmentation {
        let config = LayoutConfig::default();
        let stats = FontStatistics::from_pages(&pages);
        Segmenter::new(&config, &stats).segment(pages)
    }

    #[test]
    fn test_font_statistics_mode() {
        let mut stats = FontStatistics::new();
        for _ in 0..100 {
            stats.add(12.0, false);
        }
        for _ in 0..5 {
            stats.add(18.0, true);
        }
        stats.analyze();
        assert!((stats.body_size() - 12.0).abs() < 0.01);
        assert!(!stats.body_is_bold());
        assert_eq!(stats.distinct_sizes(), 2);
    }

    #[test]
    fn test_font_statistics_tie_prefers_smaller() {
        let mut stats = FontStatistics::new();
        stats.add(11.0, false);
        stats.add(10.0, false);
        stats.analyze();
        assert!((stats.body_size() - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_empty_statistics_default_body() {
        let mut stats = FontStatistics::new();
        stats.analyze();
        assert_eq!(stats.body_size(), 12.0);
    }

    #[test]
    fn test_uniform_text_has_no_headings() {
        // Two runs separated by a large gap
        let page = page_of(
            1,
            vec![
                text_at(1, 0, 100.0, 10.0, "Times-Roman", "First line of the"),
                text_at(1, 1, 112.0, 10.0, "Times-Roman", "first paragraph."),
                text_at(1, 2, 150.0, 10.0, "Times-Roman", "Second paragraph"),
                text_at(1, 3, 162.0, 10.0, "Times-Roman", "goes on here."),
            ],
        );
        let result = segment(vec![page]);
        assert_eq!(result.blocks.len(), 2);
        assert!(result.blocks.iter().all(|b| matches!(b, Block::Paragraph { .. })));
        assert_eq!(result.blocks[0].fragments().len(), 2);
    }

    #[test]
    fn test_heading_levels_and_merge() {
        let page = page_of(
            1,
            vec![
                text_at(1, 0, 60.0, 24.0, "Helvetica-Bold", "A Very Long"),
                text_at(1, 1, 86.0, 24.0, "Helvetica-Bold", "Title"),
                text_at(1, 2, 130.0, 16.0, "Helvetica", "Section"),
                text_at(1, 3, 160.0, 10.0, "Times-Roman", "Body text one."),
                text_at(1, 4, 172.0, 10.0, "Times-Roman", "Body text two."),
                text_at(1, 5, 184.0, 10.0, "Times-Roman", "Body text three."),
            ],
        );
        let result = segment(vec![page]);
        let levels: Vec<_> = result.blocks.iter().map(|b| b.heading_level()).collect();
        assert_eq!(levels, [Some(1), Some(2), None]);
        assert_eq!(result.blocks[0].plain_text(), "A Very Long Title");
    }

    #[test]
    fn test_page_without_body_text_uses_document_body_size() {
        let body: Vec<Fragment> = (0..12)
            .map(|i| {
                let text = if i == 11 { "End of the page." } else { "running body text" };
                text_at(1, i, 100.0 + 12.0 * i as f32, 10.0, "Times-Roman", text)
            })
            .collect();
        let pages = vec![
            page_of(1, body),
            page_of(
                2,
                vec![
                    text_at(2, 0, 100.0, 18.0, "Helvetica", "Part Two"),
                    text_at(2, 1, 300.0, 18.0, "Helvetica", "In Which Things Happen"),
                ],
            ),
        ];

        let config = LayoutConfig::default();
        let stats = FontStatistics::from_pages(&pages);
        assert!((stats.body_size() - 10.0).abs() < 0.01);

        let result = Segmenter::new(&config, &stats).segment(pages);
        let page_two: Vec<&Block> = result
            .blocks
            .iter()
            .filter(|b| b.fragments()[0].page() == 2)
            .collect();
        assert_eq!(page_two.len(), 2);
        assert!(page_two.iter().all(|b| b.heading_level() == Some(2)));
        assert_eq!(result.blocks[0].kind_name(), "paragraph");
    }

    #[test]
    fn test_bold_line_is_lowest_heading() {
        let page = page_of(
            1,
            vec![
                text_at(1, 0, 100.0, 10.0, "Times-Bold", "Background"),
                text_at(1, 1, 120.0, 10.0, "Times-Roman", "Plain text."),
                text_at(1, 2, 132.0, 10.0, "Times-Roman", "More plain text."),
            ],
        );
        let result = segment(vec![page]);
        assert_eq!(result.blocks[0].heading_level(), Some(3));
        assert!(matches!(result.blocks[1], Block::Paragraph { .. }));
    }

    #[test]
    fn test_list_items() {
        let page = page_of(
            1,
            vec![
                text_at(1, 0, 100.0, 10.0, "Times-Roman", "• apples"),
                text_at(1, 1, 112.0, 10.0, "Times-Roman", "• pears and"),
                text_at(1, 2, 124.0, 10.0, "Times-Roman", "plums"),
                text_at(1, 3, 136.0, 10.0, "Times-Roman", "1. first"),
            ],
        );
        let result = segment(vec![page]);
        assert_eq!(result.blocks.len(), 3);
        assert!(matches!(result.blocks[0], Block::ListItem { ordered: false, .. }));
        assert_eq!(result.blocks[1].fragments().len(), 2);
        assert!(matches!(result.blocks[2], Block::ListItem { ordered: true, .. }));
    }

    #[test]
    fn test_prose_words_do_not_start_list_items() {
        let page = page_of(
            1,
            vec![
                text_at(1, 0, 100.0, 10.0, "Times-Roman", "The evening air was cool and"),
                text_at(1, 1, 112.0, 10.0, "Times-Roman", "mild. After dinner we walked on"),
                text_at(1, 2, 124.0, 10.0, "Times-Roman", "to the river and then"),
                text_at(1, 3, 136.0, 10.0, "Times-Roman", "I. said we should head back."),
            ],
        );
        let result = segment(vec![page]);
        let kinds: Vec<_> = result.blocks.iter().map(|b| b.kind_name()).collect();
        assert_eq!(kinds, ["paragraph"]);
        assert_eq!(result.blocks[0].fragments().len(), 4);
    }

    #[test]
    fn test_lettered_items_after_sentence_end() {
        let page = page_of(
            1,
            vec![
                text_at(1, 0, 100.0, 10.0, "Times-Roman", "Choose one option."),
                text_at(1, 1, 112.0, 10.0, "Times-Roman", "a. the first"),
                text_at(1, 2, 124.0, 10.0, "Times-Roman", "b. the second"),
            ],
        );
        let result = segment(vec![page]);
        let kinds: Vec<_> = result.blocks.iter().map(|b| b.kind_name()).collect();
        assert_eq!(kinds, ["paragraph", "list_item", "list_item"]);
    }

    #[test]
    fn test_image_terminates_paragraph() {
        let image = Fragment::image(
            FragmentId::new(1, 1),
            BoundingBox::new(72.0, 120.0, 200.0, 100.0),
            ImageContent::new(vec![0xFF, 0xD8, 0xFF], ImageEncoding::Jpeg, 20, 10),
        );
        let page = page_of(
            1,
            vec![
                text_at(1, 0, 100.0, 10.0, "Times-Roman", "Before the figure"),
                image,
                text_at(1, 2, 230.0, 10.0, "Times-Roman", "after the figure"),
            ],
        );
        let result = segment(vec![page]);
        let kinds: Vec<_> = result.blocks.iter().map(|b| b.kind_name()).collect();
        assert_eq!(kinds, ["paragraph", "image", "paragraph"]);
    }

    #[test]
    fn test_paragraph_continues_across_pages() {
        let pages = vec![
            page_of(1, vec![text_at(1, 0, 700.0, 10.0, "Times-Roman", "a sentence that")]),
            page_of(2, vec![text_at(2, 0, 72.0, 10.0, "Times-Roman", "keeps going.")]),
            page_of(3, vec![text_at(3, 0, 72.0, 10.0, "Times-Roman", "New start.")]),
        ];
        let result = segment(pages);
        assert_eq!(result.blocks.len(), 2);
        assert_eq!(result.blocks[0].plain_text(), "a sentence that keeps going.");
    }

    #[test]
    fn test_undecodable_dropped_with_warning() {
        let mut broken = text_at(1, 1, 112.0, 10.0, "Symbol", "");
        if let crate::model::FragmentKind::Text(t) = &mut broken.kind {
            t.undecodable = true;
        }
        let page = page_of(1, vec![text_at(1, 0, 100.0, 10.0, "Times-Roman", "ok"), broken]);
        let result = segment(vec![page]);
        assert_eq!(result.dropped_fragments, 1);
        assert!(matches!(
            result.warnings[0],
            Warning::UndecodableFragment { page: 1, .. }
        ));
        assert_eq!(result.blocks.len(), 1);
    }

    #[test]
    fn test_degraded_page_single_paragraph() {
        let mut bad = text_at(1, 1, 112.0, 10.0, "Times-Roman", "two");
        bad.bbox.x = f32::INFINITY;
        let page = page_of(
            1,
            vec![
                text_at(1, 0, 100.0, 20.0, "Times-Roman", "one"),
                bad,
                text_at(1, 2, 300.0, 10.0, "Times-Roman", "three"),
            ],
        );
        let result = segment(vec![page]);
        assert_eq!(result.degraded_pages, 1);
        assert_eq!(result.blocks.len(), 1);
        assert_eq!(result.blocks[0].fragments().len(), 3);
        assert!(matches!(
            result.warnings[0],
            Warning::UnsegmentablePage { page: 1, .. }
        ));
    }
}
