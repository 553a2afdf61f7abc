//! Editing session over one timeline
//!
//! `IndexSession` is the context object the presentation layer talks to.
//! It owns the current [`TextIndex`], its undo history, the spell-check
//! coordinator, a staged CSV import and the replace log, and broadcasts an
//! [`IndexEvent`] after every operation. All index mutation happens through
//! `&mut self`, on the caller's thread.

use crate::core::{
    commit, CommitReport, HistoryEntry, HistoryOutcome, IndexBuilder, IndexError, Result,
    SkippedItem, TextDelta, TextIndex, TimelineSource, UndoStack, UndoStackConfig,
};
use crate::events::{ChangeSource, EventBus, IndexEvent, DEFAULT_EVENT_CAPACITY};
use crate::formats::{
    apply_import, reconcile, CsvFormat, CsvOptions, ImportApplyReport, ReconciliationReport,
};
use crate::spellcheck::{
    RunEvent, RunHandle, RunState, SpellBackend, SpellCheckConfig, SpellCheckCoordinator,
    SpellSuggestion, SuggestionId,
};
use crate::utils::{
    apply, transform_records, ApplyReport, MatchSpan, Replacement, SearchOptions, SearchPattern,
    TextTransform,
};
use std::io::Write;
use std::sync::Arc;
use std::time::SystemTime;
use textindex_core::{ElementId, ElementKind, FrameRate};
use tokio::sync::broadcast;
use tracing::{debug, info};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for an editing session
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    /// Undo history limits
    pub undo: UndoStackConfig,

    /// Spell-check backend and batching
    pub spellcheck: SpellCheckConfig,

    /// Buffered change events per subscriber
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            undo: UndoStackConfig::default(),
            spellcheck: SpellCheckConfig::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

#[cfg(feature = "serde")]
impl SessionConfig {
    /// Load a config from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| IndexError::config(format!("invalid session config: {e}")))
    }
}

/// One `replace_all` issued through the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceLogEntry {
    pub at: SystemTime,
    pub pattern: String,
    pub replacement: String,
    pub options: SearchOptions,
    /// Spans actually replaced
    pub applied: usize,
}

/// Stateful editing context over one timeline
#[derive(Debug)]
pub struct IndexSession {
    config: SessionConfig,
    index: TextIndex,
    history: UndoStack,
    spellcheck: SpellCheckCoordinator,
    pending_import: Option<ReconciliationReport>,
    replace_log: Vec<ReplaceLogEntry>,
    events: EventBus,
    csv: CsvFormat,
}

impl IndexSession {
    /// Create a session with an empty index
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            index: TextIndex::default(),
            history: UndoStack::with_config(config.undo.clone()),
            spellcheck: SpellCheckCoordinator::new(config.spellcheck.clone()),
            pending_import: None,
            replace_log: Vec::new(),
            events: EventBus::new(config.event_capacity),
            csv: CsvFormat::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn index(&self) -> &TextIndex {
        &self.index
    }

    #[must_use]
    pub fn rate(&self) -> FrameRate {
        self.index.rate()
    }

    #[must_use]
    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    /// Subscribe to change notifications
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<IndexEvent> {
        self.events.subscribe()
    }

    /// Rebuild the index from `source` under a new generation
    ///
    /// Identifiers of the previous build become unknown. Any spell-check
    /// run is cancelled and its suggestions dropped, a staged import is
    /// discarded and the undo history is cleared.
    pub fn rebuild<S: TimelineSource>(&mut self, source: &S) -> Vec<SkippedItem> {
        let generation = self.index.generation().wrapping_add(1);
        let report = IndexBuilder::build(source, generation);

        self.spellcheck.reset();
        self.pending_import = None;
        self.history.clear();
        self.index = report.index;

        self.events.emit(IndexEvent::Rebuilt {
            generation,
            records: self.index.len(),
            skipped: report.skipped.len(),
        });
        report.skipped
    }

    /// Replace the text of one record
    pub fn set_text(&mut self, id: ElementId, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        let before = self.index.set_text(id, text.clone())?;
        if before != text {
            self.record(
                format!("Edit {id}"),
                vec![TextDelta::new(id, before, text)],
                ChangeSource::Edit,
            );
        }
        Ok(())
    }

    /// Every match of `pattern`, in index order
    pub fn find(&self, pattern: &str, options: &SearchOptions) -> Result<Vec<MatchSpan>> {
        let compiled = SearchPattern::compile(pattern, options)?;
        Ok(compiled.find(&self.index).collect())
    }

    /// Apply previously found spans
    pub fn apply(&mut self, spans: &[MatchSpan], replacement: &Replacement) -> ApplyReport {
        let report = apply(&mut self.index, spans, replacement);
        self.record(
            format!("Replace {} match(es)", report.applied),
            report.deltas.clone(),
            ChangeSource::Replace,
        );
        report
    }

    /// Find and replace every match of `pattern` in one step
    ///
    /// Regex patterns may use `$1`-style group references in `replacement`.
    pub fn replace_all(
        &mut self,
        pattern: &str,
        options: &SearchOptions,
        replacement: &str,
    ) -> Result<ApplyReport> {
        let compiled = SearchPattern::compile(pattern, options)?;
        let spans: Vec<MatchSpan> = compiled.find(&self.index).collect();
        let report = apply(&mut self.index, &spans, &compiled.replacement(replacement));

        info!(pattern, applied = report.applied, skipped = report.skipped.len(), "replace all");
        self.replace_log.push(ReplaceLogEntry {
            at: SystemTime::now(),
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            options: options.clone(),
            applied: report.applied,
        });
        self.record(
            format!("Replace '{pattern}' with '{replacement}'"),
            report.deltas.clone(),
            ChangeSource::Replace,
        );
        Ok(report)
    }

    /// Every `replace_all` issued so far, oldest first
    #[must_use]
    pub fn replace_log(&self) -> &[ReplaceLogEntry] {
        &self.replace_log
    }

    /// Run `transforms` over all records, or only those of `kind`
    ///
    /// Returns the ids of the records that changed.
    pub fn transform(
        &mut self,
        transforms: &[TextTransform],
        kind: Option<ElementKind>,
    ) -> Vec<ElementId> {
        let deltas = transform_records(&mut self.index, transforms, kind);
        let ids = deltas.iter().map(|d| d.id).collect();
        self.record("Transform text", deltas, ChangeSource::Transform);
        ids
    }

    /// The whole index as a CSV table
    #[must_use]
    pub fn export_csv(&self) -> String {
        self.csv.export_to_string(&self.index)
    }

    pub fn export_csv_to(&self, writer: &mut dyn Write) -> Result<()> {
        self.csv.export_to_writer(&self.index, writer)
    }

    /// Parse and reconcile a table, staging it for [`apply_import`](Self::apply_import)
    ///
    /// The index is not touched. Fails with `ImportPending` while an
    /// earlier import is still staged.
    pub fn import_csv(
        &mut self,
        input: &str,
        options: CsvOptions,
    ) -> Result<&ReconciliationReport> {
        if self.pending_import.is_some() {
            return Err(IndexError::ImportPending);
        }
        let rows = self.csv.import_from_str(input, self.index.rate(), options)?;
        let report = reconcile(&rows, &self.index);
        Ok(self.pending_import.insert(report))
    }

    #[must_use]
    pub fn pending_import(&self) -> Option<&ReconciliationReport> {
        self.pending_import.as_ref()
    }

    /// Drop the staged import without applying it
    pub fn discard_import(&mut self) -> Option<ReconciliationReport> {
        self.pending_import.take()
    }

    /// Apply the staged import's accepted changes
    pub fn apply_import(&mut self) -> Result<ImportApplyReport> {
        let report = self.pending_import.take().ok_or(IndexError::NoPendingImport)?;
        let outcome = apply_import(&report, &mut self.index);
        self.record("Import CSV", outcome.deltas.clone(), ChangeSource::Import);
        Ok(outcome)
    }

    pub fn undo(&mut self) -> Result<HistoryOutcome> {
        let outcome = self.history.undo(&mut self.index)?;
        self.emit_restored(&outcome, ChangeSource::Undo);
        Ok(outcome)
    }

    pub fn redo(&mut self) -> Result<HistoryOutcome> {
        let outcome = self.history.redo(&mut self.index)?;
        self.emit_restored(&outcome, ChangeSource::Redo);
        Ok(outcome)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Write dirty records back to the host
    pub fn commit<S: TimelineSource>(&mut self, source: &mut S) -> CommitReport {
        let report = commit(&mut self.index, source);
        if !report.committed.is_empty() {
            self.events.emit(IndexEvent::Committed {
                ids: report.committed.clone(),
            });
        }
        for (id, message) in &report.failed {
            self.events.emit(IndexEvent::CommitFailed {
                id: *id,
                message: message.clone(),
            });
        }
        report
    }

    /// Start a spell-check run over `ids`, or over every record
    ///
    /// `language` picks the language for this run; `None` uses the
    /// configured one.
    pub fn start_spellcheck(
        &mut self,
        ids: Option<&[ElementId]>,
        language: Option<&str>,
        backend: Arc<dyn SpellBackend>,
    ) -> Result<RunHandle> {
        let records = match ids {
            Some(ids) => ids
                .iter()
                .map(|id| {
                    self.index
                        .record(*id)
                        .map(|r| (r.id(), r.text().to_string()))
                })
                .collect::<Result<Vec<_>>>()?,
            None => self
                .index
                .list()
                .iter()
                .map(|r| (r.id(), r.text().to_string()))
                .collect(),
        };
        self.spellcheck.start(records, language, backend)
    }

    /// Start a run with the backend named in the session config
    #[cfg(feature = "http")]
    pub fn start_spellcheck_with_config(
        &mut self,
        ids: Option<&[ElementId]>,
        language: Option<&str>,
    ) -> Result<RunHandle> {
        let backend = crate::spellcheck::create_backend(&self.config.spellcheck)?;
        self.start_spellcheck(ids, language, backend)
    }

    /// Absorb whatever the active run has delivered, without waiting
    pub fn poll_spellcheck(&mut self) -> Vec<RunEvent> {
        let events = self.spellcheck.poll();
        for event in &events {
            self.announce(event);
        }
        events
    }

    /// Wait for the next event of the active run
    pub async fn next_spellcheck_event(&mut self) -> Option<RunEvent> {
        let event = self.spellcheck.next_event().await?;
        self.announce(&event);
        Some(event)
    }

    pub fn cancel_spellcheck(&self) -> bool {
        self.spellcheck.cancel()
    }

    #[must_use]
    pub fn spellcheck_state(&self) -> RunState {
        self.spellcheck.state()
    }

    #[must_use]
    pub fn suggestions(&self) -> Vec<(SuggestionId, &SpellSuggestion)> {
        self.spellcheck.suggestions().collect()
    }

    /// Apply replacement `choice` of a pending suggestion
    pub fn accept_suggestion(&mut self, id: SuggestionId, choice: usize) -> Result<ApplyReport> {
        let report = self.spellcheck.accept(id, choice, &mut self.index)?;
        self.record(
            format!("Accept suggestion {id}"),
            report.deltas.clone(),
            ChangeSource::Suggestion,
        );
        Ok(report)
    }

    pub fn reject_suggestion(&mut self, id: SuggestionId) -> Result<()> {
        self.spellcheck.reject(id).map(|_| ())
    }

    /// Drop all pending suggestions so a new run may start
    pub fn clear_suggestions(&mut self) {
        self.spellcheck.reset();
    }

    fn record(
        &mut self,
        description: impl Into<String>,
        deltas: Vec<TextDelta>,
        source: ChangeSource,
    ) {
        if deltas.is_empty() {
            return;
        }
        let ids = deltas.iter().map(|d| d.id).collect();
        let entry = HistoryEntry::new(description, deltas);
        debug!(
            description = %entry.description,
            deltas = entry.deltas.len(),
            "history entry recorded"
        );
        self.history.push(entry);
        self.events.emit(IndexEvent::TextChanged { ids, source });
    }

    fn emit_restored(&self, outcome: &HistoryOutcome, source: ChangeSource) {
        if !outcome.restored.is_empty() {
            self.events.emit(IndexEvent::TextChanged {
                ids: outcome.restored.clone(),
                source,
            });
        }
    }

    fn announce(&self, event: &RunEvent) {
        match event {
            RunEvent::Batch(outcome) if !outcome.suggestion_ids.is_empty() => {
                self.events.emit(IndexEvent::SuggestionsAdded {
                    count: outcome.suggestion_ids.len(),
                });
            }
            RunEvent::Batch(_) => {}
            RunEvent::Finished(summary) => {
                self.events.emit(IndexEvent::RunFinished(summary.clone()));
            }
        }
    }
}

impl Default for IndexSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
