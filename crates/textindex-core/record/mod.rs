//! Element records: one indexed text-bearing timeline item
//!
//! A record carries the item's identity, kind, placement and frame range
//! together with its current plain text and the text last known to match
//! the host. The dirty flag is derived from those two texts rather than
//! stored, so it cannot drift.

use crate::utils::errors::{CoreError, Result};
use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Kind of text-bearing element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ElementKind {
    /// Single-style text generator
    Text,
    /// Rich text generator (`Text+`)
    MultiText,
    /// Subtitle item on a subtitle track
    Subtitle,
}

impl ElementKind {
    /// Every kind, in display order
    pub const ALL: [Self; 3] = [Self::Text, Self::MultiText, Self::Subtitle];

    /// Canonical name used in exports
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::MultiText => "MultiText",
            Self::Subtitle => "Subtitle",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Text" => Ok(Self::Text),
            "MultiText" | "Text+" => Ok(Self::MultiText),
            "Subtitle" => Ok(Self::Subtitle),
            other => Err(CoreError::validation(format!("unknown element kind '{other}'"))),
        }
    }
}

/// Identifier of a record, unique within one index generation
///
/// Rendered as `{generation}-{sequence}`. A rebuild bumps the generation,
/// so ids from an older build never resolve against a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElementId {
    generation: u32,
    sequence: u32,
}

impl ElementId {
    #[must_use]
    pub const fn new(generation: u32, sequence: u32) -> Self {
        Self {
            generation,
            sequence,
        }
    }

    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    #[must_use]
    pub const fn sequence(self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.generation, self.sequence)
    }
}

impl FromStr for ElementId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let parsed = s.split_once('-').and_then(|(generation, sequence)| {
            Some(Self::new(generation.parse().ok()?, sequence.parse().ok()?))
        });
        parsed.ok_or_else(|| CoreError::validation(format!("malformed element id '{s}'")))
    }
}

/// One indexed element
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElementRecord {
    id: ElementId,
    kind: ElementKind,
    track_index: u32,
    item_index: u32,
    start_frame: u64,
    end_frame: u64,
    text: String,
    original_text: String,
}

impl ElementRecord {
    /// Create a clean record whose text matches the host
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRange`] if `end_frame <= start_frame`.
    pub fn new(
        id: ElementId,
        kind: ElementKind,
        track_index: u32,
        item_index: u32,
        start_frame: u64,
        end_frame: u64,
        text: impl Into<String>,
    ) -> Result<Self> {
        if end_frame <= start_frame {
            return Err(CoreError::InvalidRange {
                start: start_frame,
                end: end_frame,
            });
        }
        let text = text.into();
        Ok(Self {
            id,
            kind,
            track_index,
            item_index,
            start_frame,
            end_frame,
            original_text: text.clone(),
            text,
        })
    }

    #[must_use]
    pub const fn id(&self) -> ElementId {
        self.id
    }

    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Track position, 1-based as the host reports it
    #[must_use]
    pub const fn track_index(&self) -> u32 {
        self.track_index
    }

    /// Position of the item within its track, 0-based
    #[must_use]
    pub const fn item_index(&self) -> u32 {
        self.item_index
    }

    #[must_use]
    pub const fn start_frame(&self) -> u64 {
        self.start_frame
    }

    #[must_use]
    pub const fn end_frame(&self) -> u64 {
        self.end_frame
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text as last read from or written to the host
    #[must_use]
    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    /// True while the text differs from what the host holds
    #[must_use]
    pub fn dirty(&self) -> bool {
        self.text != self.original_text
    }

    /// Replace the text, returning the previous value
    pub fn set_text(&mut self, text: String) -> String {
        core::mem::replace(&mut self.text, text)
    }

    /// Record that the host now holds the current text
    pub fn mark_committed(&mut self) {
        self.original_text.clone_from(&self.text);
    }
}
