//! Background spell-check runs and the pending suggestion list

use super::batch::{partition, Batch};
use super::{
    BatchOutcome, BatchStatus, RunEvent, RunHandle, RunState, RunSummary, SpellBackend,
    SpellCheckConfig, SpellSuggestion, SuggestionId,
};
use crate::core::{IndexError, Result, TextIndex};
use crate::utils::search::{apply, ApplyReport, MatchSpan, Replacement};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use textindex_core::utils::char_len;
use textindex_core::{CoreError, ElementId};
use tokio::sync::{mpsc, watch, Semaphore};
use tracing::{debug, info, warn};

/// Backend calls per batch: the first try plus one retry
const MAX_ATTEMPTS: u32 = 2;

struct ActiveRun {
    handle: RunHandle,
    events: mpsc::Receiver<RunEvent>,
    credit: Arc<Semaphore>,
    /// Batches taken by the foreground whose dispatch credit is not yet granted
    owed: usize,
}

impl ActiveRun {
    fn grant_owed(&mut self) {
        if self.owed > 0 {
            self.credit.add_permits(self.owed);
            self.owed = 0;
        }
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        // wakes a worker parked on credit; it stops once the receiver is gone
        self.credit.close();
    }
}

/// Owns spell-check runs and the suggestions they produce
///
/// Lives on the foreground side. Runs are spawned on the ambient tokio
/// runtime; their results are only absorbed when the foreground calls
/// [`poll`](Self::poll) or [`next_event`](Self::next_event).
pub struct SpellCheckCoordinator {
    config: SpellCheckConfig,
    state: Arc<watch::Sender<RunState>>,
    active: Option<ActiveRun>,
    pending: BTreeMap<SuggestionId, SpellSuggestion>,
    next_run: u64,
    next_suggestion: u64,
}

impl std::fmt::Debug for SpellCheckCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpellCheckCoordinator")
            .field("state", &*self.state.borrow())
            .field("active", &self.active.as_ref().map(|a| a.handle.id()))
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl SpellCheckCoordinator {
    #[must_use]
    pub fn new(config: SpellCheckConfig) -> Self {
        let (state, _) = watch::channel(RunState::Idle);
        Self {
            config,
            state: Arc::new(state),
            active: None,
            pending: BTreeMap::new(),
            next_run: 1,
            next_suggestion: 1,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SpellCheckConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Receiver that sees every state change of the current run
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Start checking `records` in the background
    ///
    /// `language` overrides the configured language for this run only.
    /// Fails with `AlreadyRunning` while a run is active or suggestions of a
    /// previous run are still pending, and with a config error outside a
    /// tokio runtime.
    pub fn start(
        &mut self,
        records: Vec<(ElementId, String)>,
        language: Option<&str>,
        backend: Arc<dyn SpellBackend>,
    ) -> Result<RunHandle> {
        if self.active.is_some() || !self.pending.is_empty() {
            return Err(IndexError::AlreadyRunning);
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| IndexError::config(format!("spell-check needs a tokio runtime: {e}")))?;

        let batches = partition(records, self.config.max_batch_chars.max(1));
        let run = self.next_run;
        self.next_run += 1;

        let language = language.map_or_else(|| self.config.language.clone(), str::to_string);
        let cancel = Arc::new(AtomicBool::new(false));
        // the first batch goes out without waiting for the foreground
        let credit = Arc::new(Semaphore::new(1));
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        // One state channel per run; a detached run only writes its own
        let (state, _) = watch::channel(RunState::Running {
            completed: 0,
            total: batches.len(),
        });
        self.state = Arc::new(state);
        let handle = RunHandle {
            id: run,
            cancel: Arc::clone(&cancel),
            credit: Arc::clone(&credit),
            state: self.state.subscribe(),
        };

        info!(
            run,
            backend = backend.name(),
            %language,
            batches = batches.len(),
            "spell-check started"
        );
        runtime.spawn(run_batches(RunContext {
            run,
            batches,
            language,
            backoff: Duration::from_millis(self.config.retry_backoff_ms),
            backend,
            cancel,
            credit: Arc::clone(&credit),
            events: tx,
            state: Arc::clone(&self.state),
        }));

        self.active = Some(ActiveRun {
            handle: handle.clone(),
            events: rx,
            credit,
            owed: 0,
        });
        Ok(handle)
    }

    /// Request cancellation of the active run
    ///
    /// The batch in flight still completes but its results are dropped, as
    /// are any results not yet taken by the foreground.
    pub fn cancel(&self) -> bool {
        match &self.active {
            Some(active) => {
                active.handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Drain every event delivered so far without waiting
    pub fn poll(&mut self) -> Vec<RunEvent> {
        let mut events = Vec::new();
        if let Some(active) = self.active.as_mut() {
            active.grant_owed();
        }
        while let Some(active) = self.active.as_mut() {
            match active.events.try_recv() {
                Ok(event) => events.extend(self.absorb(event)),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.active = None;
                }
            }
        }
        events
    }

    /// Wait for the next event of the active run
    ///
    /// Returns `None` when no run is active.
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        loop {
            let active = self.active.as_mut()?;
            active.grant_owed();
            let Some(event) = active.events.recv().await else {
                self.active = None;
                return None;
            };
            if let Some(event) = self.absorb(event) {
                return Some(event);
            }
        }
    }

    /// Record a delivered event; batches arriving after a cancel are dropped
    fn absorb(&mut self, event: RunEvent) -> Option<RunEvent> {
        let active = self.active.as_mut()?;
        let cancelled = active.handle.is_cancel_requested();
        match event {
            RunEvent::Batch(mut outcome) => {
                active.owed += 1;
                if cancelled {
                    debug!(
                        run = outcome.run,
                        batch = outcome.batch,
                        "batch arrived after cancel, dropped"
                    );
                    return None;
                }
                for suggestion in &outcome.suggestions {
                    let id = SuggestionId(self.next_suggestion);
                    self.next_suggestion += 1;
                    self.pending.insert(id, suggestion.clone());
                    outcome.suggestion_ids.push(id);
                }
                Some(RunEvent::Batch(outcome))
            }
            RunEvent::Finished(mut summary) => {
                if cancelled && summary.state != RunState::Cancelled {
                    summary.state = RunState::Cancelled;
                    self.state.send_replace(RunState::Cancelled);
                }
                self.active = None;
                Some(RunEvent::Finished(summary))
            }
        }
    }

    /// Pending suggestions in arrival order
    pub fn suggestions(&self) -> impl Iterator<Item = (SuggestionId, &SpellSuggestion)> {
        self.pending.iter().map(|(id, s)| (*id, s))
    }

    #[must_use]
    pub fn suggestion(&self, id: SuggestionId) -> Option<&SpellSuggestion> {
        self.pending.get(&id)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Apply replacement `choice` of suggestion `id` to the index
    ///
    /// Goes through the same validation as search-and-replace: when the
    /// record no longer holds the original fragment at the recorded
    /// offsets the report lists the span as skipped and nothing changes.
    /// The suggestion is consumed either way. Later suggestions in the same
    /// record are shifted by the change in length.
    pub fn accept(
        &mut self,
        id: SuggestionId,
        choice: usize,
        index: &mut TextIndex,
    ) -> Result<ApplyReport> {
        let suggestion = self
            .pending
            .get(&id)
            .ok_or(IndexError::UnknownSuggestion(id.0))?;
        let replacement = suggestion.replacements.get(choice).cloned().ok_or_else(|| {
            IndexError::Core(CoreError::validation(format!(
                "suggestion {id} has no replacement #{choice}"
            )))
        })?;
        let Some(suggestion) = self.pending.remove(&id) else {
            return Err(IndexError::UnknownSuggestion(id.0));
        };

        let span = MatchSpan {
            record_id: suggestion.record_id,
            start_offset: suggestion.start_offset,
            end_offset: suggestion.end_offset,
            matched_text: suggestion.original_fragment.clone(),
        };
        let shift = char_len(&replacement) as isize
            - (suggestion.end_offset - suggestion.start_offset) as isize;
        let report = apply(index, &[span], &Replacement::Literal(replacement));

        if report.applied == 1 && shift != 0 {
            self.rebase(suggestion.record_id, suggestion.end_offset, shift);
        }
        debug!(%id, applied = report.applied, "suggestion accepted");
        Ok(report)
    }

    /// Drop suggestion `id` without touching the index
    pub fn reject(&mut self, id: SuggestionId) -> Result<SpellSuggestion> {
        self.pending
            .remove(&id)
            .ok_or(IndexError::UnknownSuggestion(id.0))
    }

    /// Cancel any active run, forget its channel and all pending suggestions
    pub fn reset(&mut self) {
        if let Some(active) = self.active.take() {
            active.handle.cancel();
            debug!(run = active.handle.id(), "spell-check run detached");
        }
        self.pending.clear();
        self.state = Arc::new(watch::channel(RunState::Idle).0);
    }

    fn rebase(&mut self, record: ElementId, from: usize, shift: isize) {
        for s in self.pending.values_mut() {
            if s.record_id != record || s.start_offset < from {
                continue;
            }
            if let (Some(start), Some(end)) = (
                s.start_offset.checked_add_signed(shift),
                s.end_offset.checked_add_signed(shift),
            ) {
                s.start_offset = start;
                s.end_offset = end;
            }
        }
    }
}

struct RunContext {
    run: u64,
    batches: Vec<Batch>,
    language: String,
    backoff: Duration,
    backend: Arc<dyn SpellBackend>,
    cancel: Arc<AtomicBool>,
    credit: Arc<Semaphore>,
    events: mpsc::Sender<RunEvent>,
    state: Arc<watch::Sender<RunState>>,
}

impl RunContext {
    /// Wait until the foreground has taken the previous batch, then report
    /// whether the run may go on
    async fn may_continue(&self) -> bool {
        match self.credit.acquire().await {
            Ok(permit) => permit.forget(),
            Err(_) => return false,
        }
        !self.cancel.load(Ordering::Acquire)
    }
}

async fn run_batches(ctx: RunContext) {
    let total = ctx.batches.len();
    let mut summary = RunSummary {
        run: ctx.run,
        state: RunState::Running { completed: 0, total },
        total_batches: total,
        checked_batches: 0,
        failed_batches: Vec::new(),
        suggestions: 0,
    };
    let mut cancelled = false;

    for (number, batch) in ctx.batches.iter().enumerate() {
        if !ctx.may_continue().await {
            cancelled = true;
            break;
        }

        let (status, suggestions, attempts) =
            check_batch(ctx.backend.as_ref(), batch, &ctx.language, ctx.backoff).await;
        if ctx.cancel.load(Ordering::Acquire) {
            debug!(run = ctx.run, batch = number, "cancelled while checking, result dropped");
            cancelled = true;
            break;
        }
        match &status {
            BatchStatus::Checked => summary.checked_batches += 1,
            BatchStatus::Failed(message) => {
                warn!(run = ctx.run, batch = number, attempts, "batch failed: {message}");
                summary.failed_batches.push(number);
            }
        }
        summary.suggestions += suggestions.len();
        ctx.state.send_replace(RunState::Running {
            completed: number + 1,
            total,
        });

        let outcome = BatchOutcome {
            run: ctx.run,
            batch: number,
            completed: number + 1,
            total,
            record_ids: batch.record_ids(),
            status,
            attempts,
            suggestions,
            suggestion_ids: Vec::new(),
        };
        if ctx.events.send(RunEvent::Batch(outcome)).await.is_err() {
            debug!(run = ctx.run, "result receiver dropped, stopping");
            return;
        }
    }

    // the last batch must be taken before the run can close
    if !cancelled && !ctx.may_continue().await {
        cancelled = true;
    }

    let state = if cancelled {
        RunState::Cancelled
    } else if total > 0 && summary.failed_batches.len() == total {
        RunState::Failed
    } else {
        RunState::Completed
    };
    summary.state = state;
    info!(
        run = ctx.run,
        %state,
        checked = summary.checked_batches,
        failed = summary.failed_batches.len(),
        suggestions = summary.suggestions,
        "spell-check finished"
    );
    ctx.state.send_replace(state);
    let _ = ctx.events.send(RunEvent::Finished(summary)).await;
}

async fn check_batch(
    backend: &dyn SpellBackend,
    batch: &Batch,
    language: &str,
    backoff: Duration,
) -> (BatchStatus, Vec<SpellSuggestion>, u32) {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match backend.check(&batch.text, language).await {
            Ok(matches) => return (BatchStatus::Checked, batch.suggestions(matches), attempts),
            Err(e) if attempts < MAX_ATTEMPTS => {
                debug!(backend = backend.name(), attempts, "batch check failed, retrying: {e}");
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return (BatchStatus::Failed(e.to_string()), Vec::new(), attempts),
        }
    }
}
