/*!
 * Translation engine collaborators.
 *
 * The coordinator never translates by itself. It drives an engine through
 * the traits defined here:
 * - `TranslationEngine`: creates handles bound to a language pair
 * - `EngineHandle`: acquires the pair's model, translates, closes
 * - `ModelStore`: lists the models present locally
 *
 * Two implementations are provided:
 * - `ollama`: a local Ollama server reached over HTTP
 * - `simulated`: an in-process engine with scripted behaviors
 */

use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

use anyhow::Result;

use crate::app_config::{EngineBackend, EngineConfig};
use crate::errors::EngineError;

pub mod ollama;
pub mod simulated;

/// Network conditions under which a model download may run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DownloadConditions {
    /// Whether the download may use a metered cellular connection
    pub allow_cellular: bool,
}

impl DownloadConditions {
    /// Only download over Wi-Fi
    pub fn wifi_only() -> Self {
        Self { allow_cellular: false }
    }

    /// Download over any connection
    pub fn any_network() -> Self {
        Self { allow_cellular: true }
    }
}

/// Factory for engine handles
pub trait TranslationEngine: Send + Sync + Debug {
    /// Create a handle bound to the given language pair
    ///
    /// # Arguments
    /// * `source_language` - ISO 639-1 code of the input text
    /// * `target_language` - ISO 639-1 code of the output text
    ///
    /// # Returns
    /// * `Result<Arc<dyn EngineHandle>, EngineError>` - The new handle, or
    ///   `UnsupportedPair`/`CreationFailed`
    fn create_translator(
        &self,
        source_language: &str,
        target_language: &str,
    ) -> Result<Arc<dyn EngineHandle>, EngineError>;
}

/// A live engine instance bound to one language pair
#[async_trait]
pub trait EngineHandle: Send + Sync + Debug {
    /// Source language of the bound pair
    fn source_language(&self) -> &str;

    /// Target language of the bound pair
    fn target_language(&self) -> &str;

    /// Make sure the models needed by this pair are present locally
    ///
    /// Resolves immediately when they already are.
    async fn download_model_if_needed(
        &self,
        conditions: &DownloadConditions,
    ) -> Result<(), EngineError>;

    /// Translate text with the bound pair
    async fn translate(&self, text: &str) -> Result<String, EngineError>;

    /// Release the resources held by this handle
    ///
    /// Calling it more than once has no further effect. Operations started
    /// afterwards fail with `EngineError::HandleClosed`.
    fn close(&self);
}

/// Local store of downloaded models
#[async_trait]
pub trait ModelStore: Send + Sync + Debug {
    /// Language codes whose model is installed
    async fn downloaded_models(&self) -> Result<HashSet<String>, EngineError>;
}

/// Build the engine and model store selected by the configuration
pub fn build_backend(
    config: &EngineConfig,
) -> Result<(Arc<dyn TranslationEngine>, Arc<dyn ModelStore>)> {
    match config.backend {
        EngineBackend::Ollama => {
            let engine = ollama::OllamaEngine::from_config(config)?;
            let store = engine.model_store();
            Ok((Arc::new(engine), Arc::new(store)))
        }
        EngineBackend::Simulated => {
            let engine = simulated::SimulatedEngine::working()
                .with_installed(&config.installed_languages)
                .with_download_delay(config.download_delay_ms);
            let store = engine.model_store();
            Ok((Arc::new(engine), Arc::new(store)))
        }
    }
}
