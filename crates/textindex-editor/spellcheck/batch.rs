//! Partitioning of records into backend-sized batches

use super::{BackendMatch, SpellSuggestion};
use textindex_core::utils::{char_len, char_slice};
use textindex_core::ElementId;
use tracing::debug;

/// Placed between records so matches cannot join two of them
pub(crate) const SEPARATOR: &str = "\n\n";
const SEPARATOR_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BatchEntry {
    pub id: ElementId,
    pub text: String,
    /// Character offset of this record inside the batch text
    pub offset: usize,
    pub chars: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Batch {
    pub entries: Vec<BatchEntry>,
    pub text: String,
    chars: usize,
}

impl Batch {
    fn push(&mut self, id: ElementId, text: String) {
        if !self.entries.is_empty() {
            self.text.push_str(SEPARATOR);
            self.chars += SEPARATOR_CHARS;
        }
        let chars = char_len(&text);
        self.text.push_str(&text);
        self.entries.push(BatchEntry {
            id,
            text,
            offset: self.chars,
            chars,
        });
        self.chars += chars;
    }

    pub fn record_ids(&self) -> Vec<ElementId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// Map backend matches on the batch text back onto single records
    ///
    /// Matches spanning a separator, or empty ones, are dropped.
    pub fn suggestions(&self, matches: Vec<BackendMatch>) -> Vec<SpellSuggestion> {
        let mut out = Vec::with_capacity(matches.len());
        for m in matches {
            if m.length == 0 {
                continue;
            }
            let end = m.offset + m.length;
            let slot = self.entries.partition_point(|e| e.offset + e.chars < end);
            let entry = self
                .entries
                .get(slot)
                .filter(|e| e.offset <= m.offset && end <= e.offset + e.chars);
            let Some(entry) = entry else {
                debug!(offset = m.offset, length = m.length, rule = %m.rule_id, "match crosses records, dropped");
                continue;
            };
            let start = m.offset - entry.offset;
            let stop = end - entry.offset;
            let Some(fragment) = char_slice(&entry.text, start, stop) else {
                continue;
            };
            out.push(SpellSuggestion {
                record_id: entry.id,
                start_offset: start,
                end_offset: stop,
                original_fragment: fragment.to_string(),
                replacements: m.replacements,
                rule_id: m.rule_id,
            });
        }
        out
    }
}

/// Split `records` into batches of at most `max_chars` characters
///
/// Records keep their order. A record longer than the limit forms a batch
/// of its own; blank records are not sent.
pub(crate) fn partition(records: Vec<(ElementId, String)>, max_chars: usize) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut current = Batch::default();

    for (id, text) in records {
        if text.trim().is_empty() {
            continue;
        }
        let chars = char_len(&text);
        if !current.entries.is_empty() && current.chars + SEPARATOR_CHARS + chars > max_chars {
            batches.push(std::mem::take(&mut current));
        }
        current.push(id, text);
    }
    if !current.entries.is_empty() {
        batches.push(current);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(seq: u32, text: &str) -> (ElementId, String) {
        (ElementId::new(1, seq), text.to_string())
    }

    fn matched(offset: usize, length: usize) -> BackendMatch {
        BackendMatch {
            offset,
            length,
            replacements: vec!["fix".into()],
            rule_id: "SPELL".into(),
            message: String::new(),
        }
    }

    #[test]
    fn partition_respects_limit() {
        let batches = partition(
            vec![rec(0, "aaaa"), rec(1, "bbbb"), rec(2, "   "), rec(3, "cccc")],
            10,
        );
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].text, "aaaa\n\nbbbb");
        assert_eq!(batches[1].record_ids(), vec![ElementId::new(1, 3)]);
    }

    #[test]
    fn oversized_record_gets_own_batch() {
        let batches = partition(vec![rec(0, "ab"), rec(1, &"x".repeat(50)), rec(2, "cd")], 10);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[1].entries[0].chars, 50);
    }

    #[test]
    fn matches_map_back_to_records() {
        let batches = partition(vec![rec(0, "Helo"), rec(1, "héllo wrold")], 100);
        let batch = &batches[0];
        // "Helo\n\nhéllo wrold": record 1 starts at char 6
        let out = batch.suggestions(vec![matched(0, 4), matched(12, 5), matched(2, 6)]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].record_id, ElementId::new(1, 0));
        assert_eq!(out[0].original_fragment, "Helo");
        assert_eq!(out[1].record_id, ElementId::new(1, 1));
        assert_eq!((out[1].start_offset, out[1].end_offset), (6, 11));
        assert_eq!(out[1].original_fragment, "wrold");
    }
}
