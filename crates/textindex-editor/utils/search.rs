//! Search/Replace Engine
//!
//! A [`SearchPattern`] compiles a literal or regular expression plus its
//! [`SearchOptions`] into one `regex::Regex`. Searching yields
//! [`MatchSpan`]s lazily in index order, left to right and non-overlapping
//! within each record. [`apply`] writes replacements back through
//! [`TextIndex::set_text`], re-validating every span against the record's
//! current text first so spans computed before an intervening edit are
//! skipped instead of corrupting text.
//!
//! Offsets in spans are character offsets, not bytes.

use crate::core::{IndexError, Result, TextDelta, TextIndex};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use textindex_core::{char_to_byte, ElementId, ElementKind, ElementRecord};
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where in a record's text a pattern must match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MatchMode {
    /// Anywhere in the text
    #[default]
    Contains,
    /// The whole text
    Exact,
    /// At the start of the text
    StartsWith,
    /// At the end of the text
    EndsWith,
}

/// Search options for index queries
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SearchOptions {
    /// Treat the pattern as a regular expression
    pub is_regex: bool,

    /// Whether to perform case-sensitive search
    pub case_sensitive: bool,

    /// Whether to match whole words only
    pub whole_word: bool,

    pub mode: MatchMode,

    /// Restrict the search to one element kind
    pub kind: Option<ElementKind>,
}

impl SearchOptions {
    /// Options for a regular expression search
    #[must_use]
    pub fn regex() -> Self {
        Self {
            is_regex: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    #[must_use]
    pub fn whole_word(mut self, whole_word: bool) -> Self {
        self.whole_word = whole_word;
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: Option<ElementKind>) -> Self {
        self.kind = kind;
        self
    }
}

/// A located match within one record's text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchSpan {
    pub record_id: ElementId,
    /// Character offset of the first matched character
    pub start_offset: usize,
    /// Character offset one past the last matched character
    pub end_offset: usize,
    pub matched_text: String,
}

/// Compiled search pattern
#[derive(Debug, Clone)]
pub struct SearchPattern {
    source: String,
    regex: Regex,
    is_regex: bool,
    kind: Option<ElementKind>,
}

impl SearchPattern {
    /// Compile `pattern` under `options`
    ///
    /// Fails with [`IndexError::InvalidPattern`] for an empty pattern or a
    /// regular expression that does not compile; the message is the regex
    /// engine's diagnostic.
    pub fn compile(pattern: &str, options: &SearchOptions) -> Result<Self> {
        if pattern.is_empty() {
            return Err(IndexError::invalid_pattern(pattern, "pattern is empty"));
        }

        let mut body = if options.is_regex {
            Regex::new(pattern).map_err(|e| IndexError::invalid_pattern(pattern, e))?;
            pattern.to_string()
        } else {
            regex::escape(pattern)
        };

        if options.whole_word {
            body = format!(r"\b(?:{body})\b");
        }
        body = match options.mode {
            MatchMode::Contains => body,
            MatchMode::Exact => format!(r"\A(?:{body})\z"),
            MatchMode::StartsWith => format!(r"\A(?:{body})"),
            MatchMode::EndsWith => format!(r"(?:{body})\z"),
        };

        let regex = RegexBuilder::new(&body)
            .case_insensitive(!options.case_sensitive)
            .build()
            .map_err(|e| IndexError::invalid_pattern(pattern, e))?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
            is_regex: options.is_regex,
            kind: options.kind,
        })
    }

    /// The pattern as the caller wrote it
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Lazily search every record of `index` in index order
    #[must_use]
    pub fn find<'p, 'i>(&'p self, index: &'i TextIndex) -> Matches<'p, 'i> {
        Matches {
            pattern: self,
            records: index.list().iter(),
            current: None,
        }
    }

    /// Replacement for spans found by this pattern
    ///
    /// Regex patterns expand `$1`/`${name}` back-references; literal
    /// patterns insert `text` verbatim.
    #[must_use]
    pub fn replacement(&self, text: &str) -> Replacement {
        if self.is_regex {
            Replacement::Template {
                regex: self.regex.clone(),
                template: text.to_string(),
            }
        } else {
            Replacement::Literal(text.to_string())
        }
    }
}

/// Lazy sequence of [`MatchSpan`]s over an index
#[derive(Debug)]
pub struct Matches<'p, 'i> {
    pattern: &'p SearchPattern,
    records: core::slice::Iter<'i, ElementRecord>,
    current: Option<RecordCursor<'p, 'i>>,
}

#[derive(Debug)]
struct RecordCursor<'p, 'i> {
    record: &'i ElementRecord,
    matches: regex::Matches<'p, 'i>,
    byte_pos: usize,
    char_pos: usize,
}

impl RecordCursor<'_, '_> {
    fn span(&mut self, m: &regex::Match<'_>) -> MatchSpan {
        let text = self.record.text();
        let start_offset = self.char_pos + text[self.byte_pos..m.start()].chars().count();
        let end_offset = start_offset + m.as_str().chars().count();
        self.byte_pos = m.end();
        self.char_pos = end_offset;
        MatchSpan {
            record_id: self.record.id(),
            start_offset,
            end_offset,
            matched_text: m.as_str().to_string(),
        }
    }
}

impl Iterator for Matches<'_, '_> {
    type Item = MatchSpan;

    fn next(&mut self) -> Option<MatchSpan> {
        loop {
            if let Some(cursor) = self.current.as_mut() {
                if let Some(m) = cursor.matches.next() {
                    return Some(cursor.span(&m));
                }
                self.current = None;
            }

            let record = self.records.next()?;
            if self.pattern.kind.is_some_and(|kind| kind != record.kind()) {
                continue;
            }
            self.current = Some(RecordCursor {
                record,
                matches: self.pattern.regex.find_iter(record.text()),
                byte_pos: 0,
                char_pos: 0,
            });
        }
    }
}

/// Text to put in place of a span
#[derive(Debug, Clone)]
pub enum Replacement {
    Literal(String),
    /// Expanded against the captures of `regex` at the span
    Template { regex: Regex, template: String },
}

impl Replacement {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }
}

/// Why a span was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The record is not in the current index build
    UnknownRecord,
    /// The record's text no longer holds the matched text at the span
    Stale,
    /// The span overlaps another span applied in the same call
    Overlapping,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSpan {
    pub span: MatchSpan,
    pub reason: SkipReason,
}

/// Outcome of applying spans
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Number of spans applied
    pub applied: usize,
    pub skipped: Vec<SkippedSpan>,
    /// One delta per record whose text changed
    pub deltas: Vec<TextDelta>,
}

impl ApplyReport {
    /// Ids of the records whose text changed
    #[must_use]
    pub fn changed_ids(&self) -> Vec<ElementId> {
        self.deltas.iter().map(|d| d.id).collect()
    }
}

/// Apply `replacement` at every span that still validates
///
/// Spans are grouped per record and applied right to left, so earlier
/// offsets stay valid while later ones are consumed. Each record is
/// written once.
pub fn apply(index: &mut TextIndex, spans: &[MatchSpan], replacement: &Replacement) -> ApplyReport {
    let mut groups: Vec<(ElementId, Vec<&MatchSpan>)> = Vec::new();
    let mut slots: HashMap<ElementId, usize> = HashMap::new();
    for span in spans {
        let slot = *slots.entry(span.record_id).or_insert_with(|| {
            groups.push((span.record_id, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(span);
    }

    let mut report = ApplyReport::default();
    for (id, mut group) in groups {
        let Some(record) = index.get(id) else {
            report.skipped.extend(group.into_iter().map(|span| SkippedSpan {
                span: span.clone(),
                reason: SkipReason::UnknownRecord,
            }));
            continue;
        };

        let current = record.text().to_string();
        let mut text = current.clone();
        let mut boundary = usize::MAX;
        let mut applied_here = 0;

        group.sort_by(|a, b| {
            b.start_offset
                .cmp(&a.start_offset)
                .then(b.end_offset.cmp(&a.end_offset))
        });

        for span in group {
            let outcome = if span.end_offset > boundary {
                Err(SkipReason::Overlapping)
            } else {
                resolve(&current, span, replacement).ok_or(SkipReason::Stale)
            };

            match outcome {
                Ok((range, inserted)) => {
                    text.replace_range(range, &inserted);
                    boundary = span.start_offset;
                    applied_here += 1;
                }
                Err(reason) => {
                    debug!(%id, start = span.start_offset, ?reason, "skipping span");
                    report.skipped.push(SkippedSpan {
                        span: span.clone(),
                        reason,
                    });
                }
            }
        }

        report.applied += applied_here;
        if text != current {
            // The id was resolved above, so this cannot fail.
            if index.set_text(id, text.clone()).is_ok() {
                report.deltas.push(TextDelta::new(id, current, text));
            }
        }
    }

    debug!(
        applied = report.applied,
        skipped = report.skipped.len(),
        records = report.deltas.len(),
        "spans applied"
    );
    report
}

/// Find every match of `pattern` and replace it
pub fn replace_all(
    index: &mut TextIndex,
    pattern: &str,
    options: &SearchOptions,
    replacement: &str,
) -> Result<ApplyReport> {
    let compiled = SearchPattern::compile(pattern, options)?;
    let spans: Vec<MatchSpan> = compiled.find(index).collect();
    let replacement = compiled.replacement(replacement);
    Ok(apply(index, &spans, &replacement))
}

/// Check `span` against `text` and compute its byte range and replacement
fn resolve(
    text: &str,
    span: &MatchSpan,
    replacement: &Replacement,
) -> Option<(core::ops::Range<usize>, String)> {
    if span.start_offset > span.end_offset {
        return None;
    }
    let start = char_to_byte(text, span.start_offset)?;
    let end = char_to_byte(text, span.end_offset)?;
    if text[start..end] != span.matched_text {
        return None;
    }

    let inserted = match replacement {
        Replacement::Literal(literal) => literal.clone(),
        Replacement::Template { regex, template } => {
            let caps = regex.captures_at(text, start)?;
            let whole = caps.get(0)?;
            if whole.start() != start || whole.end() != end {
                return None;
            }
            let mut expanded = String::new();
            caps.expand(template, &mut expanded);
            expanded
        }
    };
    Some((start..end, inserted))
}
