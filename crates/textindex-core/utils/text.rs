//! Character offset and line-ending helpers
//!
//! Spans throughout the crate are expressed in `char` offsets so they stay
//! meaningful to a presentation layer and to spell backends; Rust strings
//! index by byte, so every slice goes through these conversions.

/// Strip a leading UTF-8 BOM
///
/// Returns the text without BOM and whether one was present.
///
/// ```rust
/// # use textindex_core::utils::strip_bom;
/// let (stripped, had_bom) = strip_bom("\u{FEFF}id,kind");
/// assert_eq!(stripped, "id,kind");
/// assert!(had_bom);
/// ```
#[must_use]
pub fn strip_bom(text: &str) -> (&str, bool) {
    text.strip_prefix('\u{FEFF}')
        .map_or((text, false), |rest| (rest, true))
}

/// Normalize `\r\n`, `\r` and the Unicode line/paragraph separators to `\n`
#[must_use]
pub fn normalize_line_endings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            '\u{2028}' | '\u{2029}' => out.push('\n'),
            _ => out.push(ch),
        }
    }
    out
}

/// Number of chars in `text`
#[must_use]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Convert a char offset into a byte offset
///
/// `char_offset == char_len(text)` maps to `text.len()`. Returns `None`
/// past the end.
#[must_use]
pub fn char_to_byte(text: &str, char_offset: usize) -> Option<usize> {
    if char_offset == 0 {
        return Some(0);
    }
    let mut indices = text.char_indices().map(|(i, _)| i).chain(Some(text.len()));
    indices.nth(char_offset)
}

/// Convert a byte offset (on a char boundary) into a char offset
#[must_use]
pub fn byte_to_char(text: &str, byte_offset: usize) -> usize {
    let end = byte_offset.min(text.len());
    text[..end].chars().count()
}

/// Slice `text` by char offsets `[start, end)`
#[must_use]
pub fn char_slice(text: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }
    let start_byte = char_to_byte(text, start)?;
    let end_byte = char_to_byte(text, end)?;
    text.get(start_byte..end_byte)
}

/// Convert a UTF-16 code unit offset into a char offset
///
/// Spell services built on the JVM or JavaScript report positions in
/// UTF-16 units. Returns `None` if the offset splits a surrogate pair or
/// lies past the end.
#[must_use]
pub fn utf16_to_char(text: &str, utf16_offset: usize) -> Option<usize> {
    let mut units = 0;
    for (chars, ch) in text.chars().enumerate() {
        if units == utf16_offset {
            return Some(chars);
        }
        if units > utf16_offset {
            return None;
        }
        units += ch.len_utf16();
    }
    (units == utf16_offset).then(|| char_len(text))
}
