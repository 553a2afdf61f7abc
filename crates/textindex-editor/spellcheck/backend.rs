//! Backend seam for spell-check runs

use super::BackendMatch;
use crate::core::Result;
use async_trait::async_trait;

#[cfg(feature = "http")]
use super::{
    BackendKind, LanguageToolBackend, SpellCheckConfig, YandexSpeller,
    LANGUAGETOOL_HOSTED_ENDPOINT,
};
#[cfg(feature = "http")]
use std::sync::Arc;

/// A spell/grammar checking service
///
/// Implementations receive one batch of plain text and report matches with
/// character offsets into that text. Failures are `Transport` errors; the
/// coordinator decides whether to retry.
#[async_trait]
pub trait SpellBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn check(&self, text: &str, language: &str) -> Result<Vec<BackendMatch>>;

    /// Whether the service answers at all
    async fn probe(&self) -> bool;
}

/// Build the backend selected by `config`
#[cfg(feature = "http")]
pub fn create_backend(config: &SpellCheckConfig) -> Result<Arc<dyn SpellBackend>> {
    let backend: Arc<dyn SpellBackend> = match config.backend {
        BackendKind::LanguageToolHosted => Arc::new(LanguageToolBackend::new(
            LANGUAGETOOL_HOSTED_ENDPOINT,
            config,
        )?),
        BackendKind::LanguageToolLocal => {
            Arc::new(LanguageToolBackend::new(&config.local_endpoint, config)?)
        }
        BackendKind::YandexSpeller => Arc::new(YandexSpeller::new(config)?),
    };
    tracing::debug!(backend = backend.name(), "spell backend created");
    Ok(backend)
}

/// `true` for the spellings that ask the service to detect the language
pub(crate) fn is_auto_language(language: &str) -> bool {
    let language = language.trim();
    language.is_empty()
        || language.eq_ignore_ascii_case("auto")
        || language.eq_ignore_ascii_case("auto-detect")
}
