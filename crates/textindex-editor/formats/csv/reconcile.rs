//! Reconciliation of an imported table against the live index
//!
//! Reconciling is read-only: every parsed row is matched to a record by id
//! and classified. Only text changes on rows whose kind and timecodes still
//! agree with the record are accepted; applying re-checks that each record
//! still holds the text seen during reconciliation.

use super::ParsedRow;
use crate::core::{TextDelta, TextIndex};
use std::collections::HashMap;
use textindex_core::{ElementId, ElementKind};
use tracing::{debug, info, warn};

/// An accepted text change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
    pub row: usize,
    pub id: ElementId,
    /// Record text at reconciliation time
    pub before: String,
    /// Text from the table
    pub after: String,
}

/// A row whose id does not resolve in the current index build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanRow {
    pub row: usize,
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchField {
    Kind,
    TimecodeIn,
    TimecodeOut,
}

/// A row whose informational columns disagree with the record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralMismatch {
    pub row: usize,
    pub id: ElementId,
    pub fields: Vec<MismatchField>,
    /// Whether the row also carried a text change (not accepted)
    pub text_changed: bool,
}

/// A second row for an id already seen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateRow {
    pub row: usize,
    pub id: ElementId,
    pub first_row: usize,
}

/// Classification of every parsed row
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconciliationReport {
    /// Index generation the report was computed against
    pub generation: u32,
    pub pending: Vec<PendingChange>,
    pub orphans: Vec<OrphanRow>,
    pub mismatches: Vec<StructuralMismatch>,
    pub duplicates: Vec<DuplicateRow>,
    /// Rows identical to their record
    pub unchanged: usize,
}

impl ReconciliationReport {
    /// True when nothing would change and nothing was flagged
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.pending.is_empty()
            && self.orphans.is_empty()
            && self.mismatches.is_empty()
            && self.duplicates.is_empty()
    }
}

/// Outcome of applying a reconciled import
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportApplyReport {
    pub applied: usize,
    /// Changes whose record no longer held the reconciled text
    pub stale: Vec<PendingChange>,
    pub deltas: Vec<TextDelta>,
}

/// Match `rows` to the records of `index` by id
#[must_use]
pub fn reconcile(rows: &[ParsedRow], index: &TextIndex) -> ReconciliationReport {
    let mut report = ReconciliationReport {
        generation: index.generation(),
        ..ReconciliationReport::default()
    };
    let mut seen: HashMap<ElementId, usize> = HashMap::new();

    for row in rows {
        let record = row
            .id
            .parse::<ElementId>()
            .ok()
            .and_then(|id| index.get(id));
        let Some(record) = record else {
            report.orphans.push(OrphanRow {
                row: row.row,
                id: row.id.clone(),
            });
            continue;
        };
        let id = record.id();

        if let Some(&first_row) = seen.get(&id) {
            report.duplicates.push(DuplicateRow {
                row: row.row,
                id,
                first_row,
            });
            continue;
        }
        seen.insert(id, row.row);

        let mut fields = Vec::new();
        if row.kind.parse::<ElementKind>().ok() != Some(record.kind()) {
            fields.push(MismatchField::Kind);
        }
        if row.timecode_in != record.start_frame() {
            fields.push(MismatchField::TimecodeIn);
        }
        if row.timecode_out != record.end_frame() {
            fields.push(MismatchField::TimecodeOut);
        }
        let text_changed = row.text != record.text();

        if !fields.is_empty() {
            report.mismatches.push(StructuralMismatch {
                row: row.row,
                id,
                fields,
                text_changed,
            });
        } else if text_changed {
            report.pending.push(PendingChange {
                row: row.row,
                id,
                before: record.text().to_string(),
                after: row.text.clone(),
            });
        } else {
            report.unchanged += 1;
        }
    }

    info!(
        pending = report.pending.len(),
        orphans = report.orphans.len(),
        mismatches = report.mismatches.len(),
        duplicates = report.duplicates.len(),
        unchanged = report.unchanged,
        "import reconciled"
    );
    report
}

/// Apply the accepted text changes of `report`
///
/// Orphan, mismatched and duplicate rows are never applied.
pub fn apply_import(report: &ReconciliationReport, index: &mut TextIndex) -> ImportApplyReport {
    let mut outcome = ImportApplyReport::default();
    for change in &report.pending {
        let current = index.get(change.id).map(|r| r.text() == change.before);
        if current == Some(true) && index.set_text(change.id, change.after.clone()).is_ok() {
            debug!(id = %change.id, row = change.row, "import change applied");
            outcome.applied += 1;
            outcome
                .deltas
                .push(TextDelta::new(change.id, change.before.clone(), change.after.clone()));
        } else {
            warn!(id = %change.id, row = change.row, "import change is stale, skipping");
            outcome.stale.push(change.clone());
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use textindex_core::{ElementRecord, FrameRate};

    fn index() -> TextIndex {
        let records = vec![
            ElementRecord::new(ElementId::new(2, 0), ElementKind::Subtitle, 1, 0, 100, 150, "Helo")
                .unwrap(),
            ElementRecord::new(ElementId::new(2, 1), ElementKind::Text, 1, 1, 200, 250, "Title")
                .unwrap(),
        ];
        TextIndex::from_records(2, FrameRate::PAL, records)
    }

    fn row(row: usize, id: &str, kind: &str, range: (u64, u64), text: &str) -> ParsedRow {
        ParsedRow {
            row,
            id: id.to_string(),
            kind: kind.to_string(),
            timecode_in: range.0,
            timecode_out: range.1,
            text: text.to_string(),
        }
    }

    #[test]
    fn classifies_rows() {
        let idx = index();
        let rows = vec![
            row(2, "2-0", "Subtitle", (100, 150), "Hello"),
            row(3, "2-1", "Subtitle", (200, 250), "New title"),
            row(4, "1-0", "Subtitle", (100, 150), "old build"),
            row(5, "2-0", "Subtitle", (100, 150), "again"),
            row(6, "garbage", "Text", (0, 1), ""),
        ];
        let report = reconcile(&rows, &idx);

        assert_eq!(
            report.pending,
            vec![PendingChange {
                row: 2,
                id: ElementId::new(2, 0),
                before: "Helo".into(),
                after: "Hello".into(),
            }]
        );
        assert_eq!(
            report.mismatches,
            vec![StructuralMismatch {
                row: 3,
                id: ElementId::new(2, 1),
                fields: vec![MismatchField::Kind],
                text_changed: true,
            }]
        );
        assert_eq!(report.orphans.len(), 2);
        assert_eq!(report.duplicates[0].first_row, 2);
        assert_eq!(report.unchanged, 0);
        assert_eq!(idx.get(ElementId::new(2, 0)).unwrap().text(), "Helo");
    }

    #[test]
    fn apply_skips_records_edited_after_reconcile() {
        let mut idx = index();
        let rows = vec![
            row(2, "2-0", "Subtitle", (100, 150), "Hello"),
            row(3, "2-1", "Text", (200, 250), "New title"),
        ];
        let report = reconcile(&rows, &idx);
        idx.set_text(ElementId::new(2, 1), "Edited meanwhile").unwrap();

        let outcome = apply_import(&report, &mut idx);
        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.stale.len(), 1);
        assert_eq!(idx.get(ElementId::new(2, 0)).unwrap().text(), "Hello");
        assert_eq!(idx.get(ElementId::new(2, 1)).unwrap().text(), "Edited meanwhile");
    }
}
