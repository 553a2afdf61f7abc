//! History management for undo/redo operations
//!
//! Each mutating operation (replace, import apply, accepted suggestion,
//! transform, manual edit) records one [`HistoryEntry`] holding the text
//! deltas it made. Depth and memory limits evict the oldest entries.

use super::errors::{IndexError, Result};
use super::index::TextIndex;
use std::collections::VecDeque;
use std::time::Instant;
use textindex_core::ElementId;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One record's text before and after an edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDelta {
    pub id: ElementId,
    pub before: String,
    pub after: String,
}

impl TextDelta {
    pub fn new(id: ElementId, before: impl Into<String>, after: impl Into<String>) -> Self {
        Self {
            id,
            before: before.into(),
            after: after.into(),
        }
    }

    fn memory_usage(&self) -> usize {
        core::mem::size_of::<Self>() + self.before.len() + self.after.len()
    }
}

/// A single entry in the undo/redo history
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Description of the operation
    pub description: String,

    /// Per-record deltas, in the order they were applied
    pub deltas: Vec<TextDelta>,

    /// Timestamp when the operation was performed
    pub timestamp: Instant,

    /// Memory usage of this entry (for capacity management)
    pub memory_usage: usize,
}

impl HistoryEntry {
    pub fn new(description: impl Into<String>, deltas: Vec<TextDelta>) -> Self {
        let description = description.into();
        let memory_usage =
            description.len() + deltas.iter().map(TextDelta::memory_usage).sum::<usize>();
        Self {
            description,
            deltas,
            timestamp: Instant::now(),
            memory_usage,
        }
    }
}

/// Configuration for undo stack behavior
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct UndoStackConfig {
    /// Maximum number of undo entries to keep
    pub max_entries: usize,

    /// Maximum memory usage in bytes (0 = unlimited)
    pub max_memory: usize,
}

impl Default for UndoStackConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            max_memory: 10 * 1024 * 1024,
        }
    }
}

/// Outcome of one undo or redo step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryOutcome {
    /// Description of the entry that was undone or redone
    pub description: String,
    /// Records whose text was restored
    pub restored: Vec<ElementId>,
    /// Records skipped because their text changed since the entry was made
    pub skipped: Vec<ElementId>,
}

/// Entries of one direction plus the bytes they hold
#[derive(Debug, Default)]
struct Entries {
    /// Newest first
    items: VecDeque<HistoryEntry>,
    bytes: usize,
}

impl Entries {
    fn push(&mut self, entry: HistoryEntry) {
        self.bytes += entry.memory_usage;
        self.items.push_front(entry);
    }

    fn pop(&mut self) -> Option<HistoryEntry> {
        let entry = self.items.pop_front()?;
        self.bytes -= entry.memory_usage;
        Some(entry)
    }

    fn drop_oldest(&mut self) -> bool {
        match self.items.pop_back() {
            Some(entry) => {
                self.bytes -= entry.memory_usage;
                true
            }
            None => false,
        }
    }

    fn newest_description(&self) -> Option<&str> {
        self.items.front().map(|e| e.description.as_str())
    }

    fn clear(&mut self) {
        self.items.clear();
        self.bytes = 0;
    }
}

/// Bounded undo/redo history over [`TextIndex`] edits
///
/// Undo entries are evicted oldest first once `max_entries` or
/// `max_memory` (bytes across both directions) is exceeded; redo entries
/// are never evicted but vanish on the next push.
#[derive(Debug, Default)]
pub struct UndoStack {
    config: UndoStackConfig,
    undo: Entries,
    redo: Entries,
}

impl UndoStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: UndoStackConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Record an edit; entries without deltas are ignored
    pub fn push(&mut self, entry: HistoryEntry) {
        if entry.deltas.is_empty() {
            return;
        }
        self.redo.clear();
        self.undo.push(entry);
        self.evict();
    }

    /// Revert the most recent entry against `index`
    ///
    /// A delta whose record no longer holds the `after` text (or no longer
    /// exists) is skipped rather than overwriting the newer edit.
    pub fn undo(&mut self, index: &mut TextIndex) -> Result<HistoryOutcome> {
        let entry = self.undo.pop().ok_or(IndexError::NothingToUndo)?;
        let mut outcome = outcome_for(&entry);
        for delta in entry.deltas.iter().rev() {
            swap_text(index, delta.id, &delta.after, &delta.before, &mut outcome);
        }
        debug!(
            description = %entry.description,
            restored = outcome.restored.len(),
            skipped = outcome.skipped.len(),
            "undo"
        );
        self.redo.push(entry);
        Ok(outcome)
    }

    /// Reapply the most recently undone entry against `index`
    pub fn redo(&mut self, index: &mut TextIndex) -> Result<HistoryOutcome> {
        let entry = self.redo.pop().ok_or(IndexError::NothingToRedo)?;
        let mut outcome = outcome_for(&entry);
        for delta in &entry.deltas {
            swap_text(index, delta.id, &delta.before, &delta.after, &mut outcome);
        }
        debug!(
            description = %entry.description,
            restored = outcome.restored.len(),
            skipped = outcome.skipped.len(),
            "redo"
        );
        self.undo.push(entry);
        self.evict();
        Ok(outcome)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.items.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.items.is_empty()
    }

    #[must_use]
    pub fn undo_count(&self) -> usize {
        self.undo.items.len()
    }

    #[must_use]
    pub fn redo_count(&self) -> usize {
        self.redo.items.len()
    }

    /// Bytes held by both directions
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.undo.bytes + self.redo.bytes
    }

    #[must_use]
    pub fn next_undo_description(&self) -> Option<&str> {
        self.undo.newest_description()
    }

    #[must_use]
    pub fn next_redo_description(&self) -> Option<&str> {
        self.redo.newest_description()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    fn evict(&mut self) {
        let max_memory = self.config.max_memory;
        while self.undo.items.len() > self.config.max_entries
            || (max_memory > 0 && self.memory_usage() > max_memory)
        {
            if !self.undo.drop_oldest() {
                break;
            }
        }
    }
}

fn outcome_for(entry: &HistoryEntry) -> HistoryOutcome {
    HistoryOutcome {
        description: entry.description.clone(),
        restored: Vec::new(),
        skipped: Vec::new(),
    }
}

fn swap_text(
    index: &mut TextIndex,
    id: ElementId,
    expected: &str,
    replacement: &str,
    outcome: &mut HistoryOutcome,
) {
    let holds_expected = index.get(id).is_some_and(|r| r.text() == expected);
    if holds_expected && index.set_text(id, replacement).is_ok() {
        outcome.restored.push(id);
    } else {
        outcome.skipped.push(id);
    }
}
