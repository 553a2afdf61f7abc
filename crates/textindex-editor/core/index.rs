//! The owning store of element records
//!
//! `TextIndex` holds every record of one index build in index order (track,
//! then start frame) together with the build's generation and frame rate.
//! Every text mutation in the crate funnels through [`TextIndex::set_text`];
//! other components only hold ids.

use super::errors::{IndexError, Result};
use std::collections::{BTreeSet, HashMap};
use textindex_core::{ElementId, ElementRecord, FrameRate};

/// Ordered, id-addressable set of element records
#[derive(Debug, Clone)]
pub struct TextIndex {
    generation: u32,
    rate: FrameRate,
    records: Vec<ElementRecord>,
    positions: HashMap<ElementId, usize>,
}

impl TextIndex {
    /// Create an empty index at generation 0
    #[must_use]
    pub fn new(rate: FrameRate) -> Self {
        Self {
            generation: 0,
            rate,
            records: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Create an index holding `records` for `generation`
    ///
    /// Records are sorted into index order; the build order breaks ties.
    #[must_use]
    pub fn from_records(generation: u32, rate: FrameRate, mut records: Vec<ElementRecord>) -> Self {
        records.sort_by_key(|r| (r.track_index(), r.start_frame()));
        let positions = records
            .iter()
            .enumerate()
            .map(|(pos, record)| (record.id(), pos))
            .collect();
        Self {
            generation,
            rate,
            records,
            positions,
        }
    }

    /// Build generation; ids from any other generation never resolve
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Frame rate of the timeline the records were read from
    #[must_use]
    pub const fn rate(&self) -> FrameRate {
        self.rate
    }

    /// All records in index order
    #[must_use]
    pub fn list(&self) -> &[ElementRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&ElementRecord> {
        self.positions.get(&id).map(|&pos| &self.records[pos])
    }

    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Look up a record, failing for ids outside this build
    pub fn record(&self, id: ElementId) -> Result<&ElementRecord> {
        self.get(id).ok_or(IndexError::UnknownId(id))
    }

    /// Replace a record's text, returning the previous text
    pub fn set_text(&mut self, id: ElementId, text: impl Into<String>) -> Result<String> {
        let pos = *self.positions.get(&id).ok_or(IndexError::UnknownId(id))?;
        Ok(self.records[pos].set_text(text.into()))
    }

    /// Record that the host now holds the current text of `ids`
    ///
    /// Unknown ids are ignored.
    pub fn mark_committed(&mut self, ids: &[ElementId]) {
        for id in ids {
            if let Some(&pos) = self.positions.get(id) {
                self.records[pos].mark_committed();
            }
        }
    }

    /// Ids whose text differs from the host's
    #[must_use]
    pub fn dirty_ids(&self) -> BTreeSet<ElementId> {
        self.records
            .iter()
            .filter(|r| r.dirty())
            .map(ElementRecord::id)
            .collect()
    }
}

impl Default for TextIndex {
    fn default() -> Self {
        Self::new(FrameRate::PAL)
    }
}
