//! Index Builder and the host timeline seam
//!
//! [`TimelineSource`] is the capability the host application provides:
//! track and item enumeration plus text/range access. [`IndexBuilder`]
//! walks it once per build, normalizes each item into an
//! [`ElementRecord`], and later writes dirty records back through
//! [`commit`].

use super::index::TextIndex;
use std::collections::HashMap;
use textindex_core::{strip_markup, ElementId, ElementKind, ElementRecord, FrameRate};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failure reported by the host for a single write
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HostWriteError(pub String);

/// Host timeline access
///
/// Handles are only valid for the enumeration that produced them; the
/// builder never keeps them past one build or commit cycle.
pub trait TimelineSource {
    type Track;
    type Item;

    /// All tracks that may carry text, in host order
    fn enumerate_tracks(&self) -> Vec<Self::Track>;

    /// Items on `track` filtered to the supported kinds, in host order
    fn enumerate_items(&self, track: &Self::Track) -> Vec<Self::Item>;

    fn item_kind(&self, item: &Self::Item) -> ElementKind;

    /// Raw text, possibly carrying host markup
    fn read_text(&self, item: &Self::Item) -> String;

    /// `(start_frame, end_frame)` in the timeline's native rate, end exclusive
    fn read_range(&self, item: &Self::Item) -> (u64, u64);

    fn write_text(
        &mut self,
        item: &Self::Item,
        text: &str,
    ) -> core::result::Result<(), HostWriteError>;

    fn frame_rate(&self) -> FrameRate;
}

/// An item the builder could not index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    pub track_index: u32,
    pub item_index: u32,
    pub reason: String,
}

/// Result of one build
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub index: TextIndex,
    pub skipped: Vec<SkippedItem>,
}

/// Per-record outcome of a commit
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitReport {
    pub committed: Vec<ElementId>,
    pub failed: Vec<(ElementId, String)>,
}

/// Normalizes host items into element records
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexBuilder;

impl IndexBuilder {
    /// Build a fresh index for `generation`
    ///
    /// Tracks are numbered from 1 and items from 0 in enumeration order;
    /// record ids follow the same order. Items whose range is empty or
    /// inverted are reported as skipped; items with empty text are kept.
    pub fn build<S: TimelineSource>(source: &S, generation: u32) -> BuildReport {
        let rate = source.frame_rate();
        let mut records = Vec::new();
        let mut skipped = Vec::new();
        let mut sequence = 0u32;

        for (track_pos, track) in source.enumerate_tracks().iter().enumerate() {
            let track_index = track_pos as u32 + 1;
            for (item_pos, item) in source.enumerate_items(track).iter().enumerate() {
                let item_index = item_pos as u32;
                let kind = source.item_kind(item);
                let (start, end) = source.read_range(item);
                let text = strip_markup(&source.read_text(item));
                let id = ElementId::new(generation, sequence);

                match ElementRecord::new(id, kind, track_index, item_index, start, end, text) {
                    Ok(record) => {
                        sequence += 1;
                        records.push(record);
                    }
                    Err(err) => {
                        warn!(track_index, item_index, %err, "skipping timeline item");
                        skipped.push(SkippedItem {
                            track_index,
                            item_index,
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            generation,
            records = records.len(),
            skipped = skipped.len(),
            rate = %rate,
            "index built"
        );
        BuildReport {
            index: TextIndex::from_records(generation, rate, records),
            skipped,
        }
    }
}

/// Write every dirty record back to the host
///
/// Each record is re-located by its track and item position and must still
/// have the same kind and frame range; otherwise it is reported as failed.
/// Failed records stay dirty, committed ones are marked clean.
pub fn commit<S: TimelineSource>(index: &mut TextIndex, source: &mut S) -> CommitReport {
    let mut located: HashMap<(u32, u32), S::Item> = HashMap::new();
    for (track_pos, track) in source.enumerate_tracks().iter().enumerate() {
        for (item_pos, item) in source.enumerate_items(track).into_iter().enumerate() {
            located.insert((track_pos as u32 + 1, item_pos as u32), item);
        }
    }

    let mut report = CommitReport::default();
    for id in index.dirty_ids() {
        let Some(record) = index.get(id) else {
            continue;
        };
        let key = (record.track_index(), record.item_index());
        let outcome = match located.get(&key) {
            None => Err("item no longer exists on the timeline".to_string()),
            Some(item)
                if source.item_kind(item) != record.kind()
                    || source.read_range(item) != (record.start_frame(), record.end_frame()) =>
            {
                Err("item moved or changed kind since the index was built".to_string())
            }
            Some(item) => source
                .write_text(item, record.text())
                .map_err(|err| err.to_string()),
        };

        match outcome {
            Ok(()) => {
                debug!(%id, "committed");
                report.committed.push(id);
            }
            Err(message) => {
                warn!(%id, %message, "commit failed");
                report.failed.push((id, message));
            }
        }
    }

    index.mark_committed(&report.committed);
    info!(
        committed = report.committed.len(),
        failed = report.failed.len(),
        "commit finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Item {
        kind: ElementKind,
        range: (u64, u64),
        text: String,
        locked: bool,
    }

    struct Timeline {
        tracks: Vec<Vec<Item>>,
    }

    impl TimelineSource for Timeline {
        type Track = usize;
        type Item = (usize, usize);

        fn enumerate_tracks(&self) -> Vec<usize> {
            (0..self.tracks.len()).collect()
        }

        fn enumerate_items(&self, track: &usize) -> Vec<(usize, usize)> {
            (0..self.tracks[*track].len()).map(|i| (*track, i)).collect()
        }

        fn item_kind(&self, item: &(usize, usize)) -> ElementKind {
            self.tracks[item.0][item.1].kind
        }

        fn read_text(&self, item: &(usize, usize)) -> String {
            self.tracks[item.0][item.1].text.clone()
        }

        fn read_range(&self, item: &(usize, usize)) -> (u64, u64) {
            self.tracks[item.0][item.1].range
        }

        fn write_text(
            &mut self,
            item: &(usize, usize),
            text: &str,
        ) -> core::result::Result<(), HostWriteError> {
            let slot = &mut self.tracks[item.0][item.1];
            if slot.locked {
                return Err(HostWriteError("track is locked".into()));
            }
            slot.text = text.to_string();
            Ok(())
        }

        fn frame_rate(&self) -> FrameRate {
            FrameRate::PAL
        }
    }

    fn item(kind: ElementKind, range: (u64, u64), text: &str) -> Item {
        Item {
            kind,
            range,
            text: text.to_string(),
            locked: false,
        }
    }

    fn timeline() -> Timeline {
        Timeline {
            tracks: vec![
                vec![
                    item(ElementKind::Text, (200, 250), "{\\b1}Title{\\b0}"),
                    item(ElementKind::MultiText, (0, 100), "line one<br>line two"),
                ],
                vec![
                    item(ElementKind::Subtitle, (100, 150), "Helo wrold"),
                    item(ElementKind::Subtitle, (150, 150), "zero length"),
                    item(ElementKind::Subtitle, (300, 320), ""),
                ],
            ],
        }
    }

    #[test]
    fn build_normalizes_and_orders() {
        let report = IndexBuilder::build(&timeline(), 1);
        let texts: Vec<_> = report.index.list().iter().map(ElementRecord::text).collect();
        assert_eq!(texts, ["line one\nline two", "Title", "Helo wrold", ""]);

        let first = &report.index.list()[0];
        assert_eq!(first.id(), ElementId::new(1, 1));
        assert_eq!((first.track_index(), first.item_index()), (1, 1));

        assert_eq!(report.skipped.len(), 1);
        assert_eq!((report.skipped[0].track_index, report.skipped[0].item_index), (2, 1));
    }

    #[test]
    fn commit_writes_dirty_records_and_reports_failures() {
        let mut host = timeline();
        let mut index = IndexBuilder::build(&host, 1).index;
        let title = ElementId::new(1, 0);
        let subtitle = ElementId::new(1, 2);
        index.set_text(title, "New title").unwrap();
        index.set_text(subtitle, "Hello world").unwrap();
        host.tracks[1][0].locked = true;

        let report = commit(&mut index, &mut host);
        assert_eq!(report.committed, vec![title]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, subtitle);

        assert_eq!(host.tracks[0][0].text, "New title");
        assert_eq!(index.dirty_ids().into_iter().collect::<Vec<_>>(), [subtitle]);
    }

    #[test]
    fn commit_refuses_moved_items() {
        let mut host = timeline();
        let mut index = IndexBuilder::build(&host, 1).index;
        let subtitle = ElementId::new(1, 2);
        index.set_text(subtitle, "Hello world").unwrap();
        host.tracks[1][0].range = (110, 160);

        let report = commit(&mut index, &mut host);
        assert!(report.committed.is_empty());
        assert_eq!(host.tracks[1][0].text, "Helo wrold");
    }
}
