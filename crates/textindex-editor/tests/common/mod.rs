//! Test doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use textindex_editor::spellcheck::BackendMatch;
use textindex_editor::{
    ElementKind, FrameRate, HostWriteError, IndexError, Result, RunHandle, SpellBackend,
    TimelineSource,
};

#[derive(Debug, Clone)]
pub struct Item {
    pub kind: ElementKind,
    pub range: (u64, u64),
    pub text: String,
    pub locked: bool,
}

/// In-memory timeline: tracks of items
#[derive(Debug, Clone)]
pub struct Timeline {
    pub rate: FrameRate,
    pub tracks: Vec<Vec<Item>>,
}

impl Timeline {
    pub fn new(rate: FrameRate) -> Self {
        Self {
            rate,
            tracks: Vec::new(),
        }
    }

    pub fn with_track(mut self, items: &[(ElementKind, u64, u64, &str)]) -> Self {
        self.tracks.push(
            items
                .iter()
                .map(|(kind, start, end, text)| Item {
                    kind: *kind,
                    range: (*start, *end),
                    text: (*text).to_string(),
                    locked: false,
                })
                .collect(),
        );
        self
    }
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
            return Err(HostWriteError("item is locked".into()));
        }
        slot.text = text.to_string();
        Ok(())
    }

    fn frame_rate(&self) -> FrameRate {
        self.rate
    }
}

/// Backend that flags known misspellings and records its calls
///
/// When a handle is installed and `cancel_on_call` is reached, the run is
/// cancelled from inside that call.
pub struct ScriptedBackend {
    corrections: Vec<(String, String)>,
    calls: Mutex<u32>,
    languages: Mutex<Vec<String>>,
    cancel_on_call: Option<u32>,
    handle: Mutex<Option<RunHandle>>,
}

impl ScriptedBackend {
    pub fn new(corrections: &[(&str, &str)]) -> Self {
        Self {
            corrections: corrections
                .iter()
                .map(|(wrong, right)| ((*wrong).to_string(), (*right).to_string()))
                .collect(),
            calls: Mutex::new(0),
            languages: Mutex::new(Vec::new()),
            cancel_on_call: None,
            handle: Mutex::new(None),
        }
    }

    pub fn cancelling_on(mut self, call: u32) -> Self {
        self.cancel_on_call = Some(call);
        self
    }

    pub fn install(&self, handle: RunHandle) {
        *self.handle.lock() = Some(handle);
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock()
    }

    /// Language passed to each call, in call order
    pub fn languages(&self) -> Vec<String> {
        self.languages.lock().clone()
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl SpellBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn check(&self, text: &str, language: &str) -> Result<Vec<BackendMatch>> {
        self.languages.lock().push(language.to_string());
        let call = {
            let mut calls = self.calls.lock();
            *calls += 1;
            *calls
        };
        if self.cancel_on_call == Some(call) {
            if let Some(handle) = self.handle.lock().as_ref() {
                handle.cancel();
            }
        }
        if text.contains("FAIL") {
            return Err(IndexError::Transport("service unavailable".into()));
        }

        let mut matches = Vec::new();
        for (wrong, right) in &self.corrections {
            for (at, _) in text.match_indices(wrong.as_str()) {
                matches.push(BackendMatch {
                    offset: text[..at].chars().count(),
                    length: wrong.chars().count(),
                    replacements: vec![right.clone()],
                    rule_id: "MORFOLOGIK_RULE".into(),
                    message: "Possible spelling mistake found.".into(),
                });
            }
        }
        matches.sort_by_key(|m| m.offset);
        Ok(matches)
    }

    async fn probe(&self) -> bool {
        true
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
