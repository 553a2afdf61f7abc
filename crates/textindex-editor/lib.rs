//! Searchable, spell-checkable text index over a video editing timeline
//!
//! `textindex-editor` is the stateful layer built on `textindex-core`. It
//! enumerates the text-bearing items of a host timeline into a uniform,
//! frame-accurate index and edits that index in bulk.
//!
//! # Features
//!
//! - **Index building**: titles, multi-line text and subtitles behind one
//!   [`TimelineSource`] seam, with write-back of dirty records
//! - **Search/replace**: literal or regex, case and whole-word options,
//!   stale-span validation before every write
//! - **CSV round-trip**: export, re-import with reconciliation by id
//! - **Spell-check**: batched background runs against LanguageTool or
//!   Yandex Speller, cancellable, with per-suggestion accept/reject
//! - **Undo/redo**: one history entry per bulk operation
//!
//! # Example
//!
//! ```
//! use textindex_editor::core::TextIndex;
//! use textindex_editor::utils::{replace_all, SearchOptions};
//! use textindex_editor::{ElementId, ElementKind, ElementRecord, FrameRate};
//!
//! let record = ElementRecord::new(
//!     ElementId::new(1, 0),
//!     ElementKind::Subtitle,
//!     1,
//!     0,
//!     100,
//!     150,
//!     "Helo wrold",
//! )?;
//! let mut index = TextIndex::from_records(1, FrameRate::PAL, vec![record]);
//!
//! let report = replace_all(&mut index, "Helo", &SearchOptions::default(), "Hello")?;
//! assert_eq!(report.applied, 1);
//! assert_eq!(index.list()[0].text(), "Hello wrold");
//! assert!(index.list()[0].dirty());
//! # Ok::<(), textindex_editor::IndexError>(())
//! ```

#![deny(unsafe_code)]

pub mod core;
pub mod events;
pub mod formats;
pub mod sessions;
pub mod spellcheck;
pub mod utils;

// Re-export textindex-core types as first-class citizens
pub use textindex_core::{
    frames_to_timecode, timecode_to_frames, ElementId, ElementKind, ElementRecord, FrameRate,
    Timecode,
};

// Public API exports
pub use self::core::{
    BuildReport, CommitReport, HistoryOutcome, HostWriteError, IndexBuilder, IndexError, Result,
    TextDelta, TextIndex, TimelineSource, UndoStack, UndoStackConfig,
};
pub use events::{ChangeSource, EventBus, IndexEvent};
pub use formats::{CsvFormat, CsvOptions, ReconciliationReport};
pub use sessions::{IndexSession, ReplaceLogEntry, SessionConfig};
pub use spellcheck::{
    BackendKind, RunEvent, RunHandle, RunState, SpellBackend, SpellCheckConfig,
    SpellCheckCoordinator, SpellSuggestion, SuggestionId,
};
pub use utils::{ApplyReport, MatchMode, MatchSpan, Replacement, SearchOptions, TextTransform};

/// Crate version for runtime compatibility checks
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
