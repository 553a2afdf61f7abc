//! Integration tests for textindex-editor
//!
//! Drive an `IndexSession` against an in-memory timeline through build,
//! search/replace, CSV round-trip, spell-check and commit.

mod common;

use common::{init_tracing, ScriptedBackend, Timeline};
use pretty_assertions::assert_eq;
use textindex_editor::utils::SkipReason;
use textindex_editor::*;

fn subtitle_timeline() -> Timeline {
    Timeline::new(FrameRate::PAL).with_track(&[(ElementKind::Subtitle, 100, 150, "Helo wrold")])
}

fn mixed_timeline() -> Timeline {
    Timeline::new(FrameRate::PAL)
        .with_track(&[
            (ElementKind::Text, 0, 50, "Opening <b>title</b>"),
            (ElementKind::MultiText, 60, 120, "first line<br>second line"),
        ])
        .with_track(&[
            (ElementKind::Subtitle, 10, 40, "The colour of night"),
            (ElementKind::Subtitle, 40, 80, "Colour, again; \"quoted\""),
            (ElementKind::Subtitle, 80, 90, "café"),
        ])
}

#[tokio::test]
async fn test_edit_check_export_commit_scenario() {
    init_tracing();
    let mut host = subtitle_timeline();
    let mut session = IndexSession::default();
    assert!(session.rebuild(&host).is_empty());
    let id = session.index().list()[0].id();

    let report = session
        .replace_all("Helo", &SearchOptions::default(), "Hello")
        .unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(session.index().record(id).unwrap().text(), "Hello wrold");

    let csv = session.export_csv();
    let expected_row = format!("{id},Subtitle,00:00:04:00,00:00:06:00,\"Hello wrold\"\r\n");
    assert!(csv.ends_with(&expected_row), "unexpected export: {csv}");

    let backend = ScriptedBackend::new(&[("wrold", "world")]).into_arc();
    session.start_spellcheck(None, None, backend.clone()).unwrap();
    while let Some(event) = session.next_spellcheck_event().await {
        if matches!(event, RunEvent::Finished(_)) {
            break;
        }
    }
    assert_eq!(session.spellcheck_state(), RunState::Completed);

    let suggestions = session.suggestions();
    assert_eq!(suggestions.len(), 1);
    let (suggestion_id, suggestion) = suggestions[0];
    assert_eq!(suggestion.record_id, id);
    assert_eq!(suggestion.original_fragment, "wrold");
    assert_eq!((suggestion.start_offset, suggestion.end_offset), (6, 11));

    let applied = session.accept_suggestion(suggestion_id, 0).unwrap();
    assert_eq!(applied.applied, 1);
    let record = session.index().record(id).unwrap();
    assert_eq!(record.text(), "Hello world");
    assert!(record.dirty());

    let commit = session.commit(&mut host);
    assert_eq!(commit.committed, vec![id]);
    assert!(commit.failed.is_empty());
    assert_eq!(host.tracks[0][0].text, "Hello world");
    assert!(!session.index().record(id).unwrap().dirty());
}

#[test]
fn test_build_normalizes_markup_and_orders_by_track() {
    let mut session = IndexSession::default();
    session.rebuild(&mixed_timeline());

    let texts: Vec<&str> = session.index().list().iter().map(ElementRecord::text).collect();
    assert_eq!(
        texts,
        [
            "Opening title",
            "first line\nsecond line",
            "The colour of night",
            "Colour, again; \"quoted\"",
            "café",
        ]
    );
    assert_eq!(session.index().generation(), 1);
}

#[test]
fn test_rebuild_invalidates_old_ids() {
    let host = mixed_timeline();
    let mut session = IndexSession::default();
    session.rebuild(&host);
    let old = session.index().list()[0].id();

    session.rebuild(&host);
    assert_eq!(session.index().generation(), 2);
    assert_eq!(
        session.set_text(old, "stale").unwrap_err(),
        IndexError::UnknownId(old)
    );
    assert!(!session.can_undo());
}

#[test]
fn test_replace_is_idempotent_when_replacement_does_not_match() {
    let mut session = IndexSession::default();
    session.rebuild(&mixed_timeline());
    let options = SearchOptions::default();

    let first = session.replace_all("colour", &options, "color").unwrap();
    assert_eq!(first.applied, 2);
    assert_eq!(first.changed_ids().len(), 2);
    let second = session.replace_all("colour", &options, "color").unwrap();
    assert_eq!(second.applied, 0);

    assert_eq!(session.index().list()[3].text(), "color, again; \"quoted\"");
    assert_eq!(session.replace_log().len(), 2);
    assert_eq!(session.history().undo_count(), 1);
}

#[test]
fn test_matches_do_not_overlap() {
    let host = Timeline::new(FrameRate::PAL).with_track(&[(ElementKind::Text, 0, 10, "aaaa")]);
    let mut session = IndexSession::default();
    session.rebuild(&host);

    let spans = session.find("aa", &SearchOptions::default()).unwrap();
    let offsets: Vec<_> = spans.iter().map(|s| (s.start_offset, s.end_offset)).collect();
    assert_eq!(offsets, [(0, 2), (2, 4)]);
}

#[test]
fn test_stale_spans_are_skipped() {
    let mut session = IndexSession::default();
    session.rebuild(&mixed_timeline());
    let spans = session
        .find("colour", &SearchOptions::default())
        .unwrap();
    assert_eq!(spans.len(), 2);

    session.set_text(spans[0].record_id, "Changed meanwhile").unwrap();
    let report = session.apply(&spans, &Replacement::literal("hue"));
    assert_eq!(report.applied, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, SkipReason::Stale);
    assert_eq!(
        session.index().record(spans[0].record_id).unwrap().text(),
        "Changed meanwhile"
    );
}

#[test]
fn test_regex_replace_with_groups() {
    let mut session = IndexSession::default();
    session.rebuild(&mixed_timeline());
    let options = SearchOptions::regex().case_sensitive(true);

    let report = session
        .replace_all(r"(\w+) line", &options, "line $1")
        .unwrap();
    assert_eq!(report.applied, 2);
    assert_eq!(session.index().list()[1].text(), "line first\nline second");

    assert!(matches!(
        session.replace_all("(unclosed", &options, "x"),
        Err(IndexError::InvalidPattern { .. })
    ));
}

#[test]
fn test_csv_round_trip_without_edits_is_clean() {
    let mut session = IndexSession::default();
    session.rebuild(&mixed_timeline());
    let csv = session.export_csv();

    let report = session.import_csv(&csv, CsvOptions::default()).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.unchanged, 5);
    assert!(report.orphans.is_empty());
    assert!(report.mismatches.is_empty());
    session.discard_import();
}

#[test]
fn test_csv_round_trip_keeps_carriage_returns() {
    let mut session = IndexSession::default();
    session.rebuild(&subtitle_timeline());
    let id = session.index().list()[0].id();
    session.set_text(id, "line one\r\nline two\rend").unwrap();

    let csv = session.export_csv();
    let report = session.import_csv(&csv, CsvOptions::default()).unwrap();
    assert!(report.is_clean());
    assert!(report.pending.is_empty());
    assert_eq!(report.unchanged, 1);
}

#[test]
fn test_csv_import_applies_only_text_changes() {
    let mut session = IndexSession::default();
    session.rebuild(&mixed_timeline());
    let ids: Vec<ElementId> = session.index().list().iter().map(ElementRecord::id).collect();

    let edited = session
        .export_csv()
        .replace("\"café\"", "\"café au lait\"")
        .replace(
            &format!("{},Text,00:00:00:00", ids[0]),
            &format!("{},Text,00:00:00:01", ids[0]),
        )
        .replace("\"Opening title\"", "\"Closing title\"");

    let report = session.import_csv(&edited, CsvOptions::default()).unwrap();
    assert_eq!(report.pending.len(), 1);
    assert_eq!(report.mismatches.len(), 1);
    assert!(report.mismatches[0].text_changed);

    let outcome = session.apply_import().unwrap();
    assert_eq!(outcome.applied, 1);
    assert_eq!(session.index().record(ids[4]).unwrap().text(), "café au lait");
    assert_eq!(session.index().record(ids[0]).unwrap().text(), "Opening title");

    session.undo().unwrap();
    assert_eq!(session.index().record(ids[4]).unwrap().text(), "café");
}

#[test]
fn test_csv_import_with_semicolons_and_bom() {
    let mut session = IndexSession::default();
    session.rebuild(&subtitle_timeline());
    let id = session.index().list()[0].id();

    let table = format!(
        "{}id;kind;timecode_in;timecode_out;text\n{id};Subtitle;00:00:04:00;00:00:06:00;\"Hello; world\"\n",
        '\u{feff}'
    );
    let report = session.import_csv(&table, CsvOptions::default()).unwrap();
    assert_eq!(report.pending[0].after, "Hello; world");
}

#[test]
fn test_commit_reports_host_failures() {
    let mut host = mixed_timeline();
    let mut session = IndexSession::default();
    session.rebuild(&host);
    let mut events = session.subscribe();

    session.transform(&[TextTransform::Uppercase], Some(ElementKind::Subtitle));
    host.tracks[1][1].locked = true;

    let report = session.commit(&mut host);
    assert_eq!(report.committed.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(host.tracks[1][0].text, "THE COLOUR OF NIGHT");
    assert_eq!(session.index().dirty_ids().len(), 1);

    let received: Vec<IndexEvent> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    assert!(matches!(
        received[0],
        IndexEvent::TextChanged {
            source: ChangeSource::Transform,
            ..
        }
    ));
    assert!(received
        .iter()
        .any(|e| matches!(e, IndexEvent::CommitFailed { .. })));
}

#[test]
fn test_undo_redo_walks_history_in_order() {
    let mut session = IndexSession::default();
    session.rebuild(&mixed_timeline());
    let ids: Vec<ElementId> = session.index().list().iter().map(ElementRecord::id).collect();

    session
        .replace_all("colour", &SearchOptions::default(), "color")
        .unwrap();
    session.set_text(ids[2], "Rewritten").unwrap();

    session.undo().unwrap();
    assert_eq!(session.index().record(ids[2]).unwrap().text(), "The color of night");

    let outcome = session.undo().unwrap();
    assert_eq!(outcome.restored.len(), 2);
    assert!(outcome.skipped.is_empty());
    assert_eq!(session.index().record(ids[2]).unwrap().text(), "The colour of night");
    assert_eq!(session.index().record(ids[3]).unwrap().text(), "Colour, again; \"quoted\"");
    assert!(matches!(session.undo(), Err(IndexError::NothingToUndo)));

    session.redo().unwrap();
    assert_eq!(session.index().record(ids[2]).unwrap().text(), "The color of night");
    assert!(session.can_redo());
}
