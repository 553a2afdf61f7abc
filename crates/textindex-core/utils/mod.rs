//! Utility functions and shared types for textindex-core
//!
//! Contains the error types, character/byte offset helpers used wherever
//! spans are expressed in characters, and markup normalization applied to
//! raw host text before it enters the index.

pub mod errors;
pub mod markup;
pub mod text;

pub use errors::{CoreError, ErrorCategory, Result};
pub use markup::strip_markup;
pub use text::{
    byte_to_char, char_len, char_slice, char_to_byte, normalize_line_endings, strip_bom,
    utf16_to_char,
};
