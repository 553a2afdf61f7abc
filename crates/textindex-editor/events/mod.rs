//! Change notifications for the index
//!
//! Provides `IndexEvent` describing what happened to the index and
//! `EventBus`, a broadcast channel any number of observers can subscribe
//! to. Events are emitted by the session after each operation; slow
//! subscribers lag and miss events rather than blocking the foreground.

use crate::spellcheck::RunSummary;
use textindex_core::ElementId;
use tokio::sync::broadcast;
use tracing::trace;

/// Default number of buffered events per subscriber
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// What produced a text change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    /// Direct edit of a single record
    Edit,
    /// Search/replace apply or replace-all
    Replace,
    /// Bulk text transform
    Transform,
    /// Applied CSV import
    Import,
    /// Accepted spell-check suggestion
    Suggestion,
    Undo,
    Redo,
}

/// Things that happen to the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexEvent {
    /// The index was rebuilt from the host timeline
    Rebuilt {
        /// New generation; older identifiers are invalid
        generation: u32,
        /// Number of records
        records: usize,
        /// Items the builder could not read
        skipped: usize,
    },

    /// Record texts changed in the index
    TextChanged {
        ids: Vec<ElementId>,
        source: ChangeSource,
    },

    /// Records were written back to the host
    Committed { ids: Vec<ElementId> },

    /// A host write failed; the record stays dirty
    CommitFailed { id: ElementId, message: String },

    /// Suggestions arrived from a spell-check batch
    SuggestionsAdded { count: usize },

    /// A spell-check run ended
    RunFinished(RunSummary),
}

impl IndexEvent {
    /// Get a human-readable description of the event
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::Rebuilt {
                generation,
                records,
                skipped,
            } => format!("Rebuilt index generation {generation}: {records} records, {skipped} skipped"),
            Self::TextChanged { ids, source } => {
                format!("{} record(s) changed by {source:?}", ids.len())
            }
            Self::Committed { ids } => format!("Committed {} record(s)", ids.len()),
            Self::CommitFailed { id, message } => format!("Commit of {id} failed: {message}"),
            Self::SuggestionsAdded { count } => format!("{count} suggestion(s) added"),
            Self::RunFinished(summary) => format!(
                "Spell-check run {} finished: {}",
                summary.run, summary.state
            ),
        }
    }

    /// Whether the event reports changed index text
    #[must_use]
    pub fn is_modification(&self) -> bool {
        matches!(self, Self::TextChanged { .. } | Self::Rebuilt { .. })
    }

    /// Records the event refers to
    #[must_use]
    pub fn affected_ids(&self) -> &[ElementId] {
        match self {
            Self::TextChanged { ids, .. } | Self::Committed { ids } => ids,
            Self::CommitFailed { id, .. } => core::slice::from_ref(id),
            _ => &[],
        }
    }
}

/// Broadcast channel for [`IndexEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<IndexEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<IndexEvent> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Send `event` to every current subscriber
    ///
    /// Having no subscribers is not an error.
    pub fn emit(&self, event: IndexEvent) {
        trace!(event = %event.description(), "index event");
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_description() {
        let event = IndexEvent::TextChanged {
            ids: vec![ElementId::new(1, 0), ElementId::new(1, 1)],
            source: ChangeSource::Replace,
        };
        assert_eq!(event.description(), "2 record(s) changed by Replace");
        assert!(event.is_modification());
        assert_eq!(event.affected_ids().len(), 2);

        let failed = IndexEvent::CommitFailed {
            id: ElementId::new(3, 7),
            message: "locked".into(),
        };
        assert!(!failed.is_modification());
        assert_eq!(failed.affected_ids(), &[ElementId::new(3, 7)]);
    }

    #[test]
    fn emit_without_subscribers() {
        let bus = EventBus::new(4);
        bus.emit(IndexEvent::SuggestionsAdded { count: 1 });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn subscribers_receive_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.emit(IndexEvent::Committed {
            ids: vec![ElementId::new(1, 2)],
        });
        let event = rx.try_recv().unwrap();
        assert_eq!(event.affected_ids(), &[ElementId::new(1, 2)]);
    }
}
