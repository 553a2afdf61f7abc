//! Bulk text transforms: punctuation cleanup and case changes
//!
//! Transforms are plain functions of a record's text. [`transform_records`]
//! runs a chain of them over the index (optionally one kind only) and
//! writes every changed record through `set_text`, returning the deltas so
//! the caller can record a single undo entry.

use crate::core::{TextDelta, TextIndex};
use textindex_core::{ElementId, ElementKind};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Punctuation removed by [`TextTransform::strip_common_punctuation`]
pub const COMMON_PUNCTUATION: &str = ".,!?;:-\"'()…";

/// One text transformation
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TextTransform {
    /// Remove every character in the set, then trim surrounding whitespace
    StripPunctuation(String),
    Uppercase,
    Lowercase,
    /// First letter of every word upper, the rest lower
    TitleCase,
    /// First letter of every sentence upper, the rest untouched
    SentenceCase,
}

impl TextTransform {
    #[must_use]
    pub fn strip_common_punctuation() -> Self {
        Self::StripPunctuation(COMMON_PUNCTUATION.to_string())
    }

    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        match self {
            Self::StripPunctuation(marks) => text
                .chars()
                .filter(|c| !marks.contains(*c))
                .collect::<String>()
                .trim()
                .to_string(),
            Self::Uppercase => text.to_uppercase(),
            Self::Lowercase => text.to_lowercase(),
            Self::TitleCase => title_case(text),
            Self::SentenceCase => sentence_case(text),
        }
    }
}

/// Apply `transforms` in order to every record (of `kind`, if given)
pub fn transform_records(
    index: &mut TextIndex,
    transforms: &[TextTransform],
    kind: Option<ElementKind>,
) -> Vec<TextDelta> {
    let planned: Vec<(ElementId, String, String)> = index
        .list()
        .iter()
        .filter(|r| kind.is_none() || kind == Some(r.kind()))
        .filter_map(|r| {
            let after = transforms
                .iter()
                .fold(r.text().to_string(), |text, t| t.apply(&text));
            (after != r.text()).then(|| (r.id(), r.text().to_string(), after))
        })
        .collect();

    planned
        .into_iter()
        .filter_map(|(id, before, after)| {
            index
                .set_text(id, after.clone())
                .ok()
                .map(|_| TextDelta::new(id, before, after))
        })
        .collect()
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

fn sentence_case(text: &str) -> String {
    let trimmed = text.trim();
    let mut out = String::with_capacity(trimmed.len());
    let mut capitalize = true;
    let mut after_terminator = false;
    for c in trimmed.chars() {
        if capitalize && c.is_alphabetic() {
            out.extend(c.to_uppercase());
            capitalize = false;
            after_terminator = false;
            continue;
        }
        if matches!(c, '.' | '!' | '?') {
            after_terminator = true;
            capitalize = false;
        } else if c.is_whitespace() {
            if after_terminator {
                capitalize = true;
            }
        } else {
            after_terminator = false;
            capitalize = false;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use textindex_core::{ElementRecord, FrameRate};

    #[test]
    fn strip_punctuation_trims() {
        let t = TextTransform::strip_common_punctuation();
        assert_eq!(t.apply("  Well, hello there! "), "Well hello there");
        assert_eq!(TextTransform::StripPunctuation(",".into()).apply("a,b."), "ab.");
    }

    #[test]
    fn case_modes() {
        assert_eq!(TextTransform::Uppercase.apply("straße"), "STRASSE");
        assert_eq!(TextTransform::Lowercase.apply("HeLLo"), "hello");
        assert_eq!(TextTransform::TitleCase.apply("hELLO wORLD-wide"), "Hello World-Wide");
        assert_eq!(
            TextTransform::SentenceCase.apply("hello there. how are you?  fine!yes"),
            "Hello there. How are you?  Fine!yes"
        );
        assert_eq!(TextTransform::SentenceCase.apply("привет. мир"), "Привет. Мир");
    }

    #[test]
    fn transform_records_filters_by_kind() {
        let records = vec![
            ElementRecord::new(ElementId::new(1, 0), ElementKind::Subtitle, 1, 0, 0, 5, "hi.")
                .unwrap(),
            ElementRecord::new(ElementId::new(1, 1), ElementKind::Text, 2, 0, 0, 5, "hi.").unwrap(),
            ElementRecord::new(ElementId::new(1, 2), ElementKind::Subtitle, 1, 1, 5, 9, "OK")
                .unwrap(),
        ];
        let mut index = TextIndex::from_records(1, FrameRate::PAL, records);
        let deltas = transform_records(
            &mut index,
            &[TextTransform::strip_common_punctuation(), TextTransform::Uppercase],
            Some(ElementKind::Subtitle),
        );
        assert_eq!(deltas, vec![TextDelta::new(ElementId::new(1, 0), "hi.", "HI")]);
        assert_eq!(index.get(ElementId::new(1, 1)).unwrap().text(), "hi.");
    }
}
