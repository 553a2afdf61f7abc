//! Rich-text markup removal for host text
//!
//! Title generators store styled text with inline markup: override blocks
//! such as `{\b1}` and HTML-like tags such as `<i>` or `<font color=...>`.
//! The index keeps only plain content and newlines.

use super::text::normalize_line_endings;

/// Remove styling markup and normalize line endings
///
/// - `{\...}` override blocks are dropped; braces without a leading
///   backslash are literal text
/// - `<tag>` / `</tag>` elements are dropped, `<br>` becomes a newline;
///   a `<` not followed by a tag name is literal text
/// - `\N` and `\n` escapes become newlines, `\h` a space
/// - the five XML entities are decoded
///
/// ```rust
/// # use textindex_core::utils::strip_markup;
/// assert_eq!(strip_markup(r"{\b1}Hello{\b0}\NWorld"), "Hello\nWorld");
/// assert_eq!(strip_markup("<i>a</i> < b"), "a < b");
/// ```
#[must_use]
pub fn strip_markup(raw: &str) -> String {
    let normalized = normalize_line_endings(raw);
    let mut out = String::with_capacity(normalized.len());
    let mut rest = normalized.as_str();

    while let Some(ch) = rest.chars().next() {
        match ch {
            '{' if rest[1..].starts_with('\\') => {
                if let Some(close) = rest.find('}') {
                    rest = &rest[close + 1..];
                    continue;
                }
                out.push_str(rest);
                break;
            }
            '<' => {
                if let Some((tag, len)) = scan_tag(rest) {
                    if tag.eq_ignore_ascii_case("br") {
                        out.push('\n');
                    }
                    rest = &rest[len..];
                    continue;
                }
                out.push('<');
                rest = &rest[1..];
            }
            '\\' => {
                let replacement = match rest[1..].chars().next() {
                    Some('N' | 'n') => Some('\n'),
                    Some('h') => Some(' '),
                    _ => None,
                };
                if let Some(r) = replacement {
                    out.push(r);
                    rest = &rest[2..];
                } else {
                    out.push('\\');
                    rest = &rest[1..];
                }
            }
            '&' => {
                if let Some((decoded, len)) = decode_entity(rest) {
                    out.push(decoded);
                    rest = &rest[len..];
                } else {
                    out.push('&');
                    rest = &rest[1..];
                }
            }
            _ => {
                out.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
    }

    out
}

/// Recognize `<name ...>`, `</name>` or `<name/>` at the start of `input`
///
/// Returns the tag name and the byte length of the whole tag.
fn scan_tag(input: &str) -> Option<(&str, usize)> {
    let close = input.find('>')?;
    let inner = &input[1..close];
    if inner.contains('<') {
        return None;
    }
    let inner = inner.strip_prefix('/').unwrap_or(inner);
    let name_end = inner
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(inner.len());
    let name = &inner[..name_end];
    let starts_alpha = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    if !starts_alpha {
        return None;
    }
    let tail = inner[name_end..].trim_end_matches('/');
    if !tail.is_empty() && !tail.starts_with(char::is_whitespace) {
        return None;
    }
    Some((name, close + 1))
}

fn decode_entity(input: &str) -> Option<(char, usize)> {
    const ENTITIES: [(&str, char); 6] = [
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&apos;", '\''),
        ("&#39;", '\''),
    ];
    ENTITIES
        .iter()
        .find(|(entity, _)| input.starts_with(entity))
        .map(|(entity, ch)| (*ch, entity.len()))
}
