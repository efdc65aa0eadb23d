//! Chapter splitting and table of contents construction.

use crate::model::{Block, Chapter, ChapterId, TocEntry};

use super::printed_toc::PrintedTocEntry;
use super::LayoutConfig;

/// Chapters and the navigation tree built over them.
#[derive(Debug, Default)]
pub struct ChapterBuild {
    pub chapters: Vec<Chapter>,
    pub toc: Vec<TocEntry>,
}

/// Split a block sequence into chapters and build the TOC.
///
/// Chapters partition `blocks` in order. Every heading gets an anchor
/// `h{chapter}-{n}`; the TOC nests headings by level, drops entries nested
/// deeper than `max_toc_depth`, and gives chapters that do not open with a
/// heading a top-level entry of their own.
pub fn build_chapters(mut blocks: Vec<Block>, config: &LayoutConfig) -> ChapterBuild {
    let threshold = config
        .chapter_heading_level
        .or_else(|| blocks.iter().filter_map(Block::heading_level).min());
    log::debug!("chapter heading threshold: {:?}", threshold);

    let chapters = split(&mut blocks, threshold);
    let toc = build_toc(&chapters, threshold, config.max_toc_depth);
    ChapterBuild { chapters, toc }
}

/// Split at the pages listed on a printed contents page instead of at headings.
///
/// Each entry opens a chapter titled by the entry at its page; a block belongs
/// to the chapter whose page range holds its first page. Blocks before the
/// first entry form a front matter chapter. Headings keep their anchors and
/// nest under their chapter's entry. Without entries this is
/// [`build_chapters`].
pub fn build_chapters_from_toc(
    blocks: Vec<Block>,
    entries: &[PrintedTocEntry],
    config: &LayoutConfig,
) -> ChapterBuild {
    let mut starts: Vec<&PrintedTocEntry> = entries.iter().collect();
    starts.sort_by_key(|e| e.page);
    starts.dedup_by_key(|e| e.page);
    if starts.is_empty() {
        return build_chapters(blocks, config);
    }

    let mut groups: Vec<(Option<&str>, Vec<Block>)> = vec![(None, Vec::new())];
    groups.extend(starts.iter().map(|e| (Some(e.title.as_str()), Vec::new())));
    let mut slot = 0;
    for block in blocks {
        if let Some(page) = block.first_page() {
            slot = starts.iter().take_while(|e| e.page <= page).count();
        }
        groups[slot].1.push(block);
    }

    let mut chapters = Vec::new();
    let mut has_preface = false;
    for (index, (title, blocks)) in groups.into_iter().enumerate() {
        if blocks.is_empty() {
            if let Some(title) = title {
                log::debug!("contents entry \"{}\" has no pages, skipped", title);
            }
            continue;
        }
        has_preface |= index == 0;
        let heading_start =
            title.is_none() && blocks.first().is_some_and(|b| b.heading_level().is_some());
        push_chapter(&mut chapters, blocks, heading_start, title.map(str::to_string));
    }
    if chapters.is_empty() {
        push_chapter(&mut chapters, Vec::new(), false, None);
    }
    if has_preface && chapters.len() > 1 {
        chapters[0].front_matter = true;
    }

    let toc = build_toc(&chapters, None, config.max_toc_depth);
    ChapterBuild { chapters, toc }
}

fn split(blocks: &mut Vec<Block>, threshold: Option<u8>) -> Vec<Chapter> {
    let mut chapters: Vec<Chapter> = Vec::new();
    let mut current: Vec<Block> = Vec::new();
    let mut current_starts_with_heading = false;

    for block in blocks.drain(..) {
        if starts_chapter(&block, threshold) && !current.is_empty() {
            push_chapter(
                &mut chapters,
                std::mem::take(&mut current),
                current_starts_with_heading,
                None,
            );
        }
        if current.is_empty() {
            current_starts_with_heading = starts_chapter(&block, threshold);
        }
        current.push(block);
    }
    if !current.is_empty() || chapters.is_empty() {
        push_chapter(&mut chapters, current, current_starts_with_heading, None);
    }
    // Only text before the first chapter heading counts as front matter
    if chapters.len() > 1 {
        let first_is_heading = chapters[0]
            .blocks
            .first()
            .is_some_and(|b| starts_chapter(b, threshold));
        chapters[0].front_matter = !first_is_heading;
    }
    chapters
}

fn starts_chapter(block: &Block, threshold: Option<u8>) -> bool {
    match (block.heading_level(), threshold) {
        (Some(level), Some(threshold)) => level <= threshold,
        _ => false,
    }
}

fn push_chapter(
    chapters: &mut Vec<Chapter>,
    mut blocks: Vec<Block>,
    heading_start: bool,
    title: Option<String>,
) {
    let number = chapters.len() as u32 + 1;
    let id = ChapterId(number);

    let mut n = 0;
    for block in &mut blocks {
        if let Block::Heading { anchor, .. } = block {
            n += 1;
            *anchor = Some(format!("h{}-{}", number, n));
        }
    }

    let title = title.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| {
        blocks
            .first()
            .filter(|_| heading_start)
            .map(Block::plain_text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| format!("Chapter {}", number))
    });

    let mut chapter = Chapter::new(id, title);
    chapter.blocks = blocks;
    chapters.push(chapter);
}

/// Stack slot while nesting; `None` marks a folded heading.
struct Open {
    level: u8,
    entry: Option<TocEntry>,
}

fn build_toc(chapters: &[Chapter], threshold: Option<u8>, max_depth: u8) -> Vec<TocEntry> {
    let mut roots = Vec::new();
    let mut stack: Vec<Open> = Vec::new();

    for chapter in chapters {
        let leading_heading = chapter
            .blocks
            .first()
            .is_some_and(|b| starts_chapter(b, threshold));

        if !leading_heading {
            close_all(&mut stack, &mut roots);
            stack.push(Open {
                level: 0,
                entry: Some(TocEntry::new(chapter.title.clone(), chapter.id, None)),
            });
        } else {
            // A synthetic chapter entry never holds a later chapter's headings
            if stack.first().is_some_and(|open| open.level == 0) {
                close_all(&mut stack, &mut roots);
            }
        }

        for (index, block) in chapter.blocks.iter().enumerate() {
            let Block::Heading { level, anchor, .. } = block else {
                continue;
            };
            // The chapter entry already names an opening heading that repeats its title
            if index == 0
                && !leading_heading
                && block.plain_text().to_lowercase() == chapter.title.to_lowercase()
            {
                continue;
            }
            let level = (*level).max(1);
            while stack.last().is_some_and(|open| open.level >= level) {
                close_top(&mut stack, &mut roots);
            }

            let depth = stack.len() + 1;
            let folded = depth > max_depth as usize
                || stack.last().is_some_and(|open| open.entry.is_none());
            let entry = if folded {
                None
            } else {
                let title = block.plain_text();
                let title = if title.is_empty() {
                    chapter.title.clone()
                } else {
                    title
                };
                let anchor = if index == 0 && leading_heading {
                    None
                } else {
                    anchor.clone()
                };
                Some(TocEntry::new(title, chapter.id, anchor))
            };
            stack.push(Open { level, entry });
        }
    }
    close_all(&mut stack, &mut roots);
    roots
}

fn close_top(stack: &mut Vec<Open>, roots: &mut Vec<TocEntry>) {
    let Some(open) = stack.pop() else {
        return;
    };
    let Some(entry) = open.entry else {
        return;
    };
    match stack.iter_mut().rev().find_map(|o| o.entry.as_mut()) {
        Some(parent) => parent.add_child(entry),
        None => roots.push(entry),
    }
}

fn close_all(stack: &mut Vec<Open>, roots: &mut Vec<TocEntry>) {
    while !stack.is_empty() {
        close_top(stack, roots);
    }
}
