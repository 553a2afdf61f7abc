//! Core types and structures for the text index
//!
//! - `TextIndex`: the owning store of element records
//! - `IndexBuilder` and the `TimelineSource` host seam
//! - Undo/redo history over text deltas
//! - Error types for index operations

pub mod builder;
pub mod errors;
pub mod history;
pub mod index;

// Re-export commonly used types
pub use builder::{
    commit, BuildReport, CommitReport, HostWriteError, IndexBuilder, SkippedItem, TimelineSource,
};
pub use errors::{IndexError, Result};
pub use history::{HistoryEntry, HistoryOutcome, TextDelta, UndoStack, UndoStackConfig};
pub use index::TextIndex;
