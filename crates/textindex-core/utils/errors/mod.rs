//! Core error types for timecode arithmetic and record validation
//!
//! Provides the main `CoreError` enum used by the timecode engine and the
//! record model, plus an `ErrorCategory` used by callers to decide whether
//! an operation should abort, skip an item, or retry.
//!
//! # Error Philosophy
//!
//! - Use `thiserror` for structured error handling (no `anyhow` bloat)
//! - Carry the offending input so the caller can report location detail
//! - Validation failures are always recoverable and never mutate state
//!
//! # Examples
//!
//! ```rust
//! use textindex_core::utils::errors::{CoreError, ErrorCategory};
//!
//! let err = CoreError::malformed_timecode("01:02", "expected HH:MM:SS:FF");
//! assert_eq!(err.category(), ErrorCategory::Validation);
//! assert!(err.is_recoverable());
//! ```

mod category;
mod core;

pub use category::ErrorCategory;
pub use self::core::{CoreError, Result};
