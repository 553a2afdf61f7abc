//! Utility modules for the text index
//!
//! Search/replace over the index and bulk text transforms. Both mutate
//! records only through `TextIndex::set_text` and hand back the deltas
//! they made.

pub mod search;
pub mod transform;

// Re-export commonly used types
pub use search::{
    apply, replace_all, ApplyReport, MatchMode, MatchSpan, Matches, Replacement, SearchOptions,
    SearchPattern, SkipReason, SkippedSpan,
};
pub use transform::{transform_records, TextTransform, COMMON_PUNCTUATION};
