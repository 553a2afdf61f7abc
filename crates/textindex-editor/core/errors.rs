//! Error types for the textindex-editor crate
//!
//! Provides the main `IndexError` enum that wraps `CoreError` from
//! textindex-core and adds the failures of the stateful layer: unknown
//! identifiers, bad patterns and tables, spell-check transport problems and
//! host write failures.
//!
//! Per-item problems inside batch operations (stale spans, orphan rows,
//! failed batches, failed commits) are not errors here; they are itemized
//! in the report each operation returns.

use core::fmt;
use textindex_core::{CoreError, ElementId, ErrorCategory};
use thiserror::Error;

/// Main error type for textindex-editor operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// Errors from textindex-core
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Identifier not present in the current index build
    #[error("Unknown element id: {0}")]
    UnknownId(ElementId),

    /// Search pattern failed to compile
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// CSV header or structure is not the expected table
    #[error("Malformed CSV: {0}")]
    MalformedCsv(String),

    /// A CSV data row could not be parsed
    #[error("CSV row {row}: {message}")]
    RowParseError { row: usize, message: String },

    /// A spell-check run is active or still has unresolved suggestions
    #[error("A spell-check run is already active")]
    AlreadyRunning,

    /// A reconciled import is waiting to be applied or discarded
    #[error("A CSV import is already pending application")]
    ImportPending,

    /// `apply` was called with no reconciled import staged
    #[error("No CSV import is pending")]
    NoPendingImport,

    /// Suggestion id not among the pending suggestions
    #[error("Unknown suggestion: {0}")]
    UnknownSuggestion(u64),

    /// Spell backend unreachable or returned an error
    #[error("Transport error: {0}")]
    Transport(String),

    /// The host rejected a text write
    #[error("Host write failed: {0}")]
    HostWrite(String),

    /// No operation to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// No operation to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// Local I/O failure
    #[error("IO error: {0}")]
    Io(String),

    /// Invalid or unusable configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IndexError {
    /// Create an invalid pattern error
    pub fn invalid_pattern<T: fmt::Display>(pattern: &str, message: T) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a row parse error
    pub fn row<T: fmt::Display>(row: usize, message: T) -> Self {
        Self::RowParseError {
            row,
            message: message.to_string(),
        }
    }

    /// Create a transport error
    pub fn transport<T: fmt::Display>(message: T) -> Self {
        Self::Transport(message.to_string())
    }

    /// Create a configuration error
    pub fn config<T: fmt::Display>(message: T) -> Self {
        Self::Config(message.to_string())
    }

    /// Get error category for filtering/grouping
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Core(core_err) => core_err.category(),
            Self::InvalidPattern { .. }
            | Self::MalformedCsv(_)
            | Self::RowParseError { .. }
            | Self::Config(_) => ErrorCategory::Validation,
            Self::UnknownId(_)
            | Self::UnknownSuggestion(_)
            | Self::AlreadyRunning
            | Self::ImportPending
            | Self::NoPendingImport
            | Self::NothingToUndo
            | Self::NothingToRedo => ErrorCategory::StaleState,
            Self::Transport(_) => ErrorCategory::Transport,
            Self::HostWrite(_) => ErrorCategory::HostWrite,
            Self::Io(_) => ErrorCategory::Internal,
        }
    }

    /// Check if error is recoverable
    ///
    /// Nothing in this crate poisons the session; only local I/O failures
    /// may leave the caller without a usable result.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Core(core_err) => core_err.is_recoverable(),
            Self::Io(_) => false,
            _ => true,
        }
    }
}

/// Result type alias for editor operations
pub type Result<T> = core::result::Result<T, IndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_pass_through() {
        let err: IndexError = CoreError::InvalidFrameCount(-3).into();
        assert_eq!(err.to_string(), "Invalid frame count: -3");
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn categories() {
        assert_eq!(
            IndexError::UnknownId(ElementId::new(1, 2)).category(),
            ErrorCategory::StaleState
        );
        assert_eq!(
            IndexError::transport("timeout").category(),
            ErrorCategory::Transport
        );
        assert!(IndexError::transport("timeout").category().is_retryable());
        assert_eq!(
            IndexError::HostWrite("locked".into()).category(),
            ErrorCategory::HostWrite
        );
    }

    #[test]
    fn row_error_carries_location() {
        let err = IndexError::row(4, "expected 5 columns, found 3");
        assert_eq!(err.to_string(), "CSV row 4: expected 5 columns, found 3");
        assert!(err.is_recoverable());
    }
}
