//! Yandex Speller backend

use super::backend::is_auto_language;
use super::{BackendMatch, SpellBackend, SpellCheckConfig, YANDEX_SPELLER_ENDPOINT};
use crate::core::{IndexError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use textindex_core::utils::utf16_to_char;
use tracing::debug;

/// Languages requested when detection is asked for
const AUTO_LANGUAGES: &str = "ru,en";

/// IGNORE_DIGITS | IGNORE_URLS
const OPTIONS: &str = "6";

#[derive(Debug, Deserialize)]
struct SpellerError {
    code: u32,
    pos: usize,
    len: usize,
    #[serde(default)]
    word: String,
    #[serde(default)]
    s: Vec<String>,
}

fn rule_id(code: u32) -> &'static str {
    match code {
        1 => "ERROR_UNKNOWN_WORD",
        2 => "ERROR_REPEAT_WORD",
        3 => "ERROR_CAPITALIZATION",
        4 => "ERROR_TOO_MANY_ERRORS",
        _ => "ERROR_UNKNOWN",
    }
}

/// Client for `speller.yandex.net`
#[derive(Debug, Clone)]
pub struct YandexSpeller {
    client: reqwest::Client,
    endpoint: String,
}

impl YandexSpeller {
    pub fn new(config: &SpellCheckConfig) -> Result<Self> {
        Self::with_endpoint(YANDEX_SPELLER_ENDPOINT, config)
    }

    pub fn with_endpoint(endpoint: &str, config: &SpellCheckConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| IndexError::config(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SpellBackend for YandexSpeller {
    fn name(&self) -> &str {
        "yandex-speller"
    }

    async fn check(&self, text: &str, language: &str) -> Result<Vec<BackendMatch>> {
        let lang = if is_auto_language(language) {
            AUTO_LANGUAGES
        } else {
            language
        };
        let response = self
            .client
            .post(format!("{}/checkText", self.endpoint))
            .form(&[
                ("text", text),
                ("lang", lang),
                ("options", OPTIONS),
                ("format", "plain"),
            ])
            .send()
            .await
            .map_err(|e| IndexError::transport(format!("Yandex Speller request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IndexError::transport(format!(
                "Yandex Speller returned {status}"
            )));
        }

        let errors: Vec<SpellerError> = response
            .json()
            .await
            .map_err(|e| IndexError::transport(format!("Yandex Speller response: {e}")))?;

        let matches: Vec<BackendMatch> = errors
            .into_iter()
            .filter_map(|e| {
                let start = utf16_to_char(text, e.pos)?;
                let end = utf16_to_char(text, e.pos.checked_add(e.len)?)?;
                Some(BackendMatch {
                    offset: start,
                    length: end - start,
                    replacements: e.s,
                    rule_id: rule_id(e.code).to_string(),
                    message: e.word,
                })
            })
            .collect();
        debug!(chars = text.len(), matches = matches.len(), "Yandex batch checked");
        Ok(matches)
    }

    async fn probe(&self) -> bool {
        self.client
            .get(format!("{}/checkText", self.endpoint))
            .query(&[("text", "test")])
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }
}
