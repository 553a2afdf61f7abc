//! Core error type for timecode and record operations
//!
//! Every variant describes input that was rejected before any state was
//! touched, so callers can surface it with location detail and carry on.

use core::fmt;
use thiserror::Error;

/// Main error type for textindex core operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A frame count was negative or could not be represented
    #[error("Invalid frame count: {0}")]
    InvalidFrameCount(i64),

    /// A timecode string did not match `HH:MM:SS[:;]FF`
    #[error("Malformed timecode '{input}': {reason}")]
    MalformedTimecode { input: String, reason: String },

    /// The frame field of a timecode is not valid for the frame rate
    #[error("Frame {frame} out of range in '{input}' (rate allows 0..{limit})")]
    FrameOutOfRange {
        input: String,
        frame: u32,
        limit: u32,
    },

    /// A frame range whose end does not lie after its start
    #[error("Invalid range: start {start}, end {end}")]
    InvalidRange { start: u64, end: u64 },

    /// A frame rate that is zero, malformed or cannot use drop-frame
    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(String),

    /// Generic validation failure
    #[error("Validation error: {0}")]
    Validation(String),
}

impl CoreError {
    /// Create a malformed timecode error
    pub fn malformed_timecode<T: fmt::Display>(input: T, reason: &str) -> Self {
        Self::MalformedTimecode {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid frame rate error
    pub fn invalid_frame_rate<T: fmt::Display>(message: T) -> Self {
        Self::InvalidFrameRate(message.to_string())
    }

    /// Create a validation error
    pub fn validation<T: fmt::Display>(message: T) -> Self {
        Self::Validation(message.to_string())
    }

    /// Check if error is recoverable
    ///
    /// Every core error is raised before mutation, so all of them are.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        true
    }
}

/// Result type alias for convenience
pub type Result<T> = core::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_timecode_display() {
        let err = CoreError::malformed_timecode("1:2", "expected four fields");
        assert_eq!(
            err.to_string(),
            "Malformed timecode '1:2': expected four fields"
        );
    }

    #[test]
    fn frame_out_of_range_display() {
        let err = CoreError::FrameOutOfRange {
            input: "00:00:00:25".to_string(),
            frame: 25,
            limit: 25,
        };
        assert!(err.to_string().contains("0..25"));
        assert!(err.is_recoverable());
    }
}
