//! Error categorization shared by the core and editor crates
//!
//! Groups failures by how a batch operation should treat them: validation
//! failures are rejected up front, stale state is skipped per item,
//! transport failures are retried, host write failures leave records dirty.

use super::CoreError;
use core::fmt;

/// Error category for filtering and user interface organization
///
/// # Examples
///
/// ```rust
/// use textindex_core::utils::errors::{CoreError, ErrorCategory};
///
/// let error = CoreError::InvalidFrameCount(-1);
/// assert_eq!(error.category(), ErrorCategory::Validation);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed pattern, timecode or table
    ///
    /// Rejected before any mutation; fully recoverable.
    Validation,

    /// A span or row no longer matches the current record
    ///
    /// Skipped per item, never aborts a batch operation.
    StaleState,

    /// Spell backend unreachable or erroring
    Transport,

    /// Commit to the host timeline failed for an item
    HostWrite,

    /// Internal consistency failure or local I/O
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ErrorCategory {
    /// Get human-readable category name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::StaleState => "stale-state",
            Self::Transport => "transport",
            Self::HostWrite => "host-write",
            Self::Internal => "internal",
        }
    }

    /// Whether an operation may retry after an error of this category
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Transport | Self::HostWrite)
    }
}

impl CoreError {
    /// Get error category for filtering/grouping
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidFrameCount(_)
            | Self::MalformedTimecode { .. }
            | Self::FrameOutOfRange { .. }
            | Self::InvalidRange { .. }
            | Self::InvalidFrameRate(_)
            | Self::Validation(_) => ErrorCategory::Validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_names() {
        assert_eq!(ErrorCategory::StaleState.to_string(), "stale-state");
        assert_eq!(ErrorCategory::HostWrite.name(), "host-write");
    }

    #[test]
    fn retryable_categories() {
        assert!(ErrorCategory::Transport.is_retryable());
        assert!(!ErrorCategory::Validation.is_retryable());
        assert!(!ErrorCategory::StaleState.is_retryable());
    }
}
