//! Import/export of the index as flat tables
//!
//! Only CSV is supported. The table is a projection of the index: ids,
//! kinds and timecodes are informational on the way back in, and only text
//! changes are ever applied.

pub mod csv;

pub use csv::{
    apply_import, reconcile, CsvFormat, CsvOptions, DuplicateRow, ImportApplyReport,
    MismatchField, OrphanRow, ParsedRow, PendingChange, ReconciliationReport, StructuralMismatch,
    HEADER,
};

/// Metadata about a table format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatInfo {
    /// Format name (e.g., "CSV")
    pub name: String,
    /// File extensions supported by this format
    pub extensions: Vec<String>,
    /// MIME type for this format
    pub mime_type: String,
    /// Brief description of the format
    pub description: String,
}

impl FormatInfo {
    /// Check if this format handles the given file extension
    #[must_use]
    pub fn handles_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}
