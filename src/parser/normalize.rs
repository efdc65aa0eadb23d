//! Unicode cleanup applied to every extracted text run.

use unicode_normalization::UnicodeNormalization;

const LIGATURES: &[(char, &str)] = &[
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "st"),
    ('\u{FB06}', "st"),
];

/// Normalize a decoded text run.
///
/// Applies NFC, expands typographic ligatures and removes private use area
/// characters, noncharacters, U+FFFD and control characters. Tabs and other whitespace
/// become plain spaces.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfc() {
        if let Some((_, expanded)) = LIGATURES.iter().find(|(lig, _)| *lig == c) {
            out.push_str(expanded);
        } else if c.is_whitespace() {
            out.push(' ');
        } else if !is_dropped_char(c) {
            out.push(c);
        }
    }
    out
}

fn is_dropped_char(c: char) -> bool {
    let code = c as u32;
    c == '\u{FFFD}'
        || c.is_control()
        || (0xE000..=0xF8FF).contains(&code)
        || (0xF0000..=0xFFFFD).contains(&code)
        || (0x100000..=0x10FFFD).contains(&code)
        // noncharacters, U+FFFE and U+FFFF among them
        || (0xFDD0..=0xFDEF).contains(&code)
        || code & 0xFFFE == 0xFFFE
        // zero-width joiners and soft hyphens left over from layout
        || matches!(c, '\u{200B}' | '\u{00AD}' | '\u{FEFF}')
}
