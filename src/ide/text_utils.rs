//! Text helpers for cursor-relative lookups.

use text_size::{TextRange, TextSize};

/// Check if a character can be part of a template identifier.
///
/// Unicode identifier characters plus `$`, which Java names allow.
#[inline]
pub fn is_word_character(c: char) -> bool {
    unicode_ident::is_xid_continue(c) || c == '$'
}

/// Start of the identifier that ends at `offset`, or `offset` itself when
/// the character before it is not part of a word.
pub fn word_start(text: &str, offset: TextSize) -> TextSize {
    let before = text.get(..usize::from(offset)).unwrap_or("");
    let len: usize = before
        .chars()
        .rev()
        .take_while(|&c| is_word_character(c))
        .map(char::len_utf8)
        .sum();
    offset - TextSize::new(len as u32)
}

/// Range of the identifier touching `offset` (on either side).
pub fn word_range_at(text: &str, offset: TextSize) -> Option<TextRange> {
    let start = word_start(text, offset);
    let after = text.get(usize::from(offset)..).unwrap_or("");
    let len: usize = after
        .chars()
        .take_while(|&c| is_word_character(c))
        .map(char::len_utf8)
        .sum();
    let range = TextRange::new(start, offset + TextSize::new(len as u32));
    (!range.is_empty()).then_some(range)
}

/// The character just before `offset`.
pub fn char_before(text: &str, offset: TextSize) -> Option<char> {
    text.get(..usize::from(offset))?.chars().next_back()
}

/// Text of the line containing `offset`, up to `offset`.
pub fn line_prefix(text: &str, offset: TextSize) -> &str {
    let before = text.get(..usize::from(offset)).unwrap_or("");
    match before.rfind('\n') {
        Some(newline) => &before[newline + 1..],
        None => before,
    }
}
