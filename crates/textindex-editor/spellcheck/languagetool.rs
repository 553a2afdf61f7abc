//! LanguageTool HTTP backend (hosted API or a local server)

use super::backend::is_auto_language;
use super::{BackendMatch, SpellBackend, SpellCheckConfig};
use crate::core::{IndexError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use textindex_core::utils::utf16_to_char;
use tracing::{debug, warn};

/// Replacement candidates kept per match
const MAX_REPLACEMENTS: usize = 5;

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    matches: Vec<LtMatch>,
}

#[derive(Debug, Deserialize)]
struct LtMatch {
    #[serde(default)]
    message: String,
    offset: usize,
    length: usize,
    #[serde(default)]
    replacements: Vec<LtReplacement>,
    rule: LtRule,
}

#[derive(Debug, Deserialize)]
struct LtReplacement {
    value: String,
}

#[derive(Debug, Deserialize)]
struct LtRule {
    id: String,
}

/// Client for the LanguageTool `/v2` API
#[derive(Debug, Clone)]
pub struct LanguageToolBackend {
    client: reqwest::Client,
    endpoint: String,
    disabled_rules: Vec<String>,
}

impl LanguageToolBackend {
    /// Client for the API rooted at `endpoint` (e.g. `.../v2`)
    pub fn new(endpoint: &str, config: &SpellCheckConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| IndexError::config(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            disabled_rules: config.disabled_rules.clone(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn convert(&self, text: &str, response: CheckResponse) -> Vec<BackendMatch> {
        response
            .matches
            .into_iter()
            .filter(|m| !self.disabled_rules.iter().any(|r| *r == m.rule.id))
            .filter_map(|m| {
                let start = utf16_to_char(text, m.offset)?;
                let end = utf16_to_char(text, m.offset.checked_add(m.length)?)?;
                Some(BackendMatch {
                    offset: start,
                    length: end - start,
                    replacements: m
                        .replacements
                        .into_iter()
                        .take(MAX_REPLACEMENTS)
                        .map(|r| r.value)
                        .collect(),
                    rule_id: m.rule.id,
                    message: m.message,
                })
            })
            .collect()
    }
}

#[async_trait]
impl SpellBackend for LanguageToolBackend {
    fn name(&self) -> &str {
        "languagetool"
    }

    async fn check(&self, text: &str, language: &str) -> Result<Vec<BackendMatch>> {
        let language = if is_auto_language(language) {
            "auto"
        } else {
            language
        };
        let disabled = self.disabled_rules.join(",");
        let mut form = vec![("text", text), ("language", language), ("level", "default")];
        if !disabled.is_empty() {
            form.push(("disabledRules", disabled.as_str()));
        }

        let response = self
            .client
            .post(format!("{}/check", self.endpoint))
            .form(&form)
            .send()
            .await
            .map_err(|e| IndexError::transport(format!("LanguageTool request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "LanguageTool rejected the request");
            return Err(IndexError::transport(format!(
                "LanguageTool returned {status}: {body}"
            )));
        }

        let body: CheckResponse = response
            .json()
            .await
            .map_err(|e| IndexError::transport(format!("LanguageTool response: {e}")))?;
        let matches = self.convert(text, body);
        debug!(chars = text.len(), matches = matches.len(), "LanguageTool batch checked");
        Ok(matches)
    }

    async fn probe(&self) -> bool {
        match self
            .client
            .get(format!("{}/languages", self.endpoint))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(endpoint = %self.endpoint, "LanguageTool probe failed: {e}");
                false
            }
        }
    }
}
