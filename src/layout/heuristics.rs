//! Small pure layout heuristics.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Bullet or enumerator at the start of a line, followed by space or end of text.
    ///
    /// Roman enumerators are limited to well-formed numerals up to 39.
    static ref LIST_MARKER: Regex = Regex::new(
        r"^\s*(?:(?P<bullet>[•●○▪■◦‣*\-–])|(?P<num>\(\d{1,3}\)|\d{1,3}[.)])|(?P<alpha>\([a-zA-Z]\)|[a-zA-Z][.)]|\(?(?i:x{0,3}(?:ix|iv|v?i{0,3}))[.)]))(?:\s+|$)"
    )
    .unwrap();

    /// A line holding only a page number, optionally dashed.
    static ref PAGE_NUMBER: Regex = Regex::new(r"^\s*[-–—]?\s*\d{1,4}\s*[-–—]?\s*$").unwrap();
}

/// A list marker found at the start of a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMarker {
    /// Numbered or lettered enumerator
    pub ordered: bool,
    /// Letter or roman numeral, which ordinary words can look like
    pub alphabetic: bool,
    /// Byte length of the marker including trailing whitespace
    pub len: usize,
}

/// Detect a list marker at the start of `text`.
pub fn list_marker(text: &str) -> Option<ListMarker> {
    let caps = LIST_MARKER.captures(text)?;
    let whole = caps.get(0)?;
    let alpha = caps.name("alpha");
    // The roman alternative also matches a bare "." or "(."
    if alpha.is_some_and(|m| m.as_str().trim_matches(['(', ')', '.']).is_empty()) {
        return None;
    }
    Some(ListMarker {
        ordered: alpha.is_some() || caps.name("num").is_some(),
        alphabetic: alpha.is_some(),
        len: whole.end(),
    })
}

/// Remove a leading list marker, if any.
pub fn strip_list_marker(text: &str) -> &str {
    match list_marker(text) {
        Some(marker) => &text[marker.len..],
        None => text,
    }
}

/// Whether a line is a bare page number.
pub fn is_page_number(text: &str) -> bool {
    PAGE_NUMBER.is_match(text)
}

/// Heading level for a size ratio against the body size.
///
/// `tiers` are descending ratios for levels 1, 2, ...; ratios below the last
/// tier get the level after it.
pub fn heading_level(ratio: f32, tiers: &[f32]) -> u8 {
    let level = tiers
        .iter()
        .position(|tier| ratio >= *tier)
        .unwrap_or(tiers.len())
        + 1;
    level.min(6) as u8
}

/// Font size key with 0.1pt precision.
pub fn size_bucket(size: f32) -> i32 {
    (size * 10.0).round() as i32
}

/// Whether text ends a sentence.
pub fn ends_sentence(text: &str) -> bool {
    let trimmed = text
        .trim_end()
        .trim_end_matches(['"', '\'', '”', '’', '»', ')', ']']);
    trimmed
        .chars()
        .last()
        .is_some_and(|c| matches!(c, '.' | '!' | '?' | ':' | '…' | '。' | '！' | '？'))
}

/// Whether text ends with a hyphen that splits a word across lines.
pub fn ends_with_word_hyphen(text: &str) -> bool {
    let mut chars = text.trim_end().chars().rev();
    matches!(chars.next(), Some('-') | Some('\u{2010}')) && chars.next().is_some_and(char::is_alphabetic)
}

/// Check if character is from a script that doesn't use word spaces.
///
/// Chinese and Japanese don't use spaces between words, but Korean does.
pub fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and extensions A-F
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    || (0x20000..=0x2A6DF).contains(&code)
    || (0x2A700..=0x2B73F).contains(&code)
    || (0x2B740..=0x2B81F).contains(&code)
    || (0x2B820..=0x2CEAF).contains(&code)
    || (0x2CEB0..=0x2EBEF).contains(&code)
    // Hiragana
    || (0x3040..=0x309F).contains(&code)
    // Katakana
    || (0x30A0..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
    // Fullwidth forms
    || (0xFF00..=0xFFEF).contains(&code)
}
