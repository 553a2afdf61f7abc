//! Spell-Check Coordinator and backends
//!
//! A run partitions records into batches, checks them one after another on
//! a background tokio task through a [`SpellBackend`], and streams
//! [`RunEvent`]s back over a bounded channel. The foreground drains those
//! events, keeps the pending suggestions, and applies accepted corrections
//! through the search engine's `apply` path. The background task never
//! touches the index.
//!
//! Run state moves `Idle -> Running -> {Completed, Cancelled, Failed}` and
//! is published on a watch channel. Cancellation is a shared flag checked
//! between batches.
//!
//! Dispatch is paced by the foreground: the next batch is only sent to the
//! backend once the foreground has asked for more events after taking the
//! previous one. A cancel issued after seeing batch `n` therefore never
//! causes a call for batch `n + 1`, and results that finish after a cancel
//! are dropped instead of delivered.

mod backend;
mod batch;
mod coordinator;

#[cfg(feature = "http")]
mod languagetool;
#[cfg(feature = "http")]
mod yandex;

pub use backend::SpellBackend;
pub use coordinator::SpellCheckCoordinator;

#[cfg(feature = "http")]
pub use backend::create_backend;
#[cfg(feature = "http")]
pub use languagetool::LanguageToolBackend;
#[cfg(feature = "http")]
pub use yandex::YandexSpeller;

use core::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use textindex_core::ElementId;
use tokio::sync::{watch, Semaphore};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Public LanguageTool API
pub const LANGUAGETOOL_HOSTED_ENDPOINT: &str = "https://api.languagetool.org/v2";

/// Default address of a self-hosted LanguageTool server
pub const LANGUAGETOOL_LOCAL_ENDPOINT: &str = "http://localhost:8081/v2";

/// Yandex Speller JSON API
pub const YANDEX_SPELLER_ENDPOINT: &str = "https://speller.yandex.net/services/spellservice.json";

/// Which checking service to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BackendKind {
    #[default]
    LanguageToolHosted,
    LanguageToolLocal,
    YandexSpeller,
}

/// Configuration for spell-check runs
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpellCheckConfig {
    pub backend: BackendKind,

    /// Language code passed to the backend; `auto` lets it detect
    pub language: String,

    /// Upper bound on characters sent per backend call
    pub max_batch_chars: usize,

    /// Delay before the single retry of a failed batch
    pub retry_backoff_ms: u64,

    /// Per-request timeout for HTTP backends
    pub request_timeout_ms: u64,

    /// Base URL of the local LanguageTool server
    pub local_endpoint: String,

    /// Backend rule ids whose matches are dropped
    pub disabled_rules: Vec<String>,

    /// Capacity of the batch result channel
    pub channel_capacity: usize,
}

impl Default for SpellCheckConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            language: "auto".to_string(),
            max_batch_chars: 6000,
            retry_backoff_ms: 500,
            request_timeout_ms: 15_000,
            local_endpoint: LANGUAGETOOL_LOCAL_ENDPOINT.to_string(),
            disabled_rules: vec!["UPPERCASE_SENTENCE_START".to_string()],
            channel_capacity: 16,
        }
    }
}

/// A problem reported by a backend, relative to the text it was given
///
/// Offsets are character offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendMatch {
    pub offset: usize,
    pub length: usize,
    pub replacements: Vec<String>,
    pub rule_id: String,
    pub message: String,
}

/// A suggested correction inside one record
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpellSuggestion {
    pub record_id: ElementId,
    /// Character offsets into the record's text
    pub start_offset: usize,
    pub end_offset: usize,
    pub original_fragment: String,
    /// Candidates, best first
    pub replacements: Vec<String>,
    pub rule_id: String,
}

/// Identifier of a pending suggestion within a coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SuggestionId(pub u64);

impl fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Spell-check run state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RunState {
    Idle,
    Running { completed: usize, total: usize },
    Completed,
    Cancelled,
    Failed,
}

impl RunState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Running { completed, total } => write!(f, "Running ({completed}/{total})"),
            Self::Completed => write!(f, "Completed"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// How one batch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatus {
    Checked,
    /// Failed after the retry; carries the last error
    Failed(String),
}

/// Result of one batch, as delivered to the foreground
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub run: u64,
    /// 0-based batch number
    pub batch: usize,
    /// Batches finished so far, this one included
    pub completed: usize,
    pub total: usize,
    pub record_ids: Vec<ElementId>,
    pub status: BatchStatus,
    /// Backend calls made for this batch
    pub attempts: u32,
    pub suggestions: Vec<SpellSuggestion>,
    /// Ids assigned to `suggestions` when the foreground received them
    pub suggestion_ids: Vec<SuggestionId>,
}

/// Closing summary of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run: u64,
    pub state: RunState,
    pub total_batches: usize,
    pub checked_batches: usize,
    pub failed_batches: Vec<usize>,
    pub suggestions: usize,
}

/// Progress notifications of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Batch(BatchOutcome),
    Finished(RunSummary),
}

/// Caller's handle on a started run
#[derive(Debug, Clone)]
pub struct RunHandle {
    id: u64,
    cancel: Arc<AtomicBool>,
    credit: Arc<Semaphore>,
    state: watch::Receiver<RunState>,
}

impl RunHandle {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Ask the run to stop before its next batch
    ///
    /// Also wakes a worker parked waiting for dispatch credit so it can
    /// observe the flag and finish.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
        self.credit.add_permits(1);
    }

    #[must_use]
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Wait until the run reaches a terminal state
    pub async fn finished(&mut self) -> RunState {
        loop {
            let state = *self.state.borrow_and_update();
            if state.is_terminal() {
                return state;
            }
            if self.state.changed().await.is_err() {
                return *self.state.borrow();
            }
        }
    }
}
