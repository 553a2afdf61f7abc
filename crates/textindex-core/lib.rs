//! # textindex-core
//!
//! Value types shared by the timeline text index: frame rates, SMPTE
//! timecode conversion (including drop-frame), element records, and the
//! text utilities used to turn host markup into plain searchable text.
//!
//! Nothing here touches a host or performs I/O; every function is pure.
//!
//! ## Quick Start
//!
//! ```rust
//! use textindex_core::{frames_to_timecode, timecode_to_frames, FrameRate};
//!
//! let rate: FrameRate = "25".parse()?;
//! assert_eq!(frames_to_timecode(100, rate)?.to_string(), "00:00:04:00");
//! assert_eq!(timecode_to_frames("00:00:06:00", rate)?, 150);
//! # Ok::<(), textindex_core::CoreError>(())
//! ```

#![deny(unsafe_code)]

pub mod record;
pub mod timecode;
pub mod utils;

pub use record::{ElementId, ElementKind, ElementRecord};
pub use timecode::{
    duration_frames, frames_to_seconds, frames_to_srt_time, frames_to_timecode,
    timecode_to_frames, FrameRate, Timecode,
};
pub use utils::{
    byte_to_char, char_len, char_slice, char_to_byte, normalize_line_endings, strip_bom,
    strip_markup, utf16_to_char, CoreError, ErrorCategory, Result,
};

/// Crate version for runtime compatibility checks
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
