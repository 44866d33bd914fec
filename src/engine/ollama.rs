/*!
 * Engine backed by a local Ollama server.
 *
 * - Model acquisition pulls the models routed to the pair's languages
 *   (`POST /api/pull`)
 * - The model store lists pulled models (`GET /api/tags`)
 * - Inference is a single non-streaming generation (`POST /api/generate`)
 */

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use url::Url;

use crate::app_config::EngineConfig;
use crate::engine::{DownloadConditions, EngineHandle, ModelStore, TranslationEngine};
use crate::errors::EngineError;
use crate::language_catalog::{self, LanguagePair};

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Generation options for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    pub model: String,
    /// Generated text
    pub response: String,
    /// Whether the generation is complete
    pub done: bool,
}

/// Pull request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct PullRequest {
    /// Model name to pull
    model: String,
    /// Whether to stream progress updates
    stream: bool,
}

/// Final status of a non-streaming pull
#[derive(Debug, Serialize, Deserialize)]
pub struct PullResponse {
    /// "success" once the model is available
    pub status: String,
}

/// Entry of the `/api/tags` listing
#[derive(Debug, Serialize, Deserialize)]
pub struct LocalModel {
    /// Model name including its tag, e.g. "llama3.2:3b"
    pub name: String,
}

/// Response of `/api/tags`
#[derive(Debug, Serialize, Deserialize)]
pub struct TagsResponse {
    /// Locally available models
    #[serde(default)]
    pub models: Vec<LocalModel>,
}

impl GenerationRequest {
    /// Create a new non-streaming generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: Some(false),
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options = Some(GenerationOptions {
            temperature: Some(temperature),
        });
        self
    }
}

/// Ollama models use an implicit ":latest" tag
fn canonical_model_name(model: &str) -> String {
    if model.contains(':') {
        model.to_string()
    } else {
        format!("{}:latest", model)
    }
}

/// Minimal client for the Ollama endpoints the engine needs
#[derive(Debug, Clone)]
pub struct OllamaClient {
    /// Base URL of the Ollama API, without trailing slash
    base_url: String,
    /// HTTP client shared by all requests
    client: Client,
    /// Timeout for generation and listing requests
    request_timeout: Duration,
}

impl OllamaClient {
    /// Create a client for the given endpoint
    pub fn new(endpoint: &str, request_timeout: Duration) -> Result<Self> {
        let url = Url::parse(endpoint).with_context(|| format!("Invalid Ollama endpoint: {}", endpoint))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!("Unsupported scheme for Ollama endpoint: {}", url.scheme()));
        }

        // Pulls can take minutes, so the timeout is set per request instead
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: url.as_str().trim_end_matches('/').to_string(),
            client,
            request_timeout,
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generate text with the given request
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send generate request to Ollama API: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Ollama API error ({}): {}", status, error_text);
            return Err(anyhow!("Ollama API error ({}): {}", status, error_text));
        }

        response
            .json::<GenerationResponse>()
            .await
            .map_err(|e| anyhow!("Failed to parse Ollama API response: {}", e))
    }

    /// Pull a model, waiting until the download finishes
    pub async fn pull(&self, model: &str) -> Result<PullResponse> {
        let url = format!("{}/api/pull", self.base_url);
        let request = PullRequest {
            model: model.to_string(),
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to reach Ollama API: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            return Err(anyhow!("Ollama refused to pull '{}' ({}): {}", model, status, error_text));
        }

        response
            .json::<PullResponse>()
            .await
            .map_err(|e| anyhow!("Failed to parse Ollama pull response: {}", e))
    }

    /// List the models available locally
    pub async fn tags(&self) -> Result<TagsResponse> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to reach Ollama API: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Ollama API error ({}) while listing models", status));
        }

        response
            .json::<TagsResponse>()
            .await
            .map_err(|e| anyhow!("Failed to parse Ollama model list: {}", e))
    }

    /// Names of the locally available models, with explicit tags
    pub async fn local_model_names(&self) -> Result<HashSet<String>> {
        let tags = self.tags().await?;
        Ok(tags
            .models
            .into_iter()
            .map(|model| canonical_model_name(&model.name))
            .collect())
    }
}

/// Which Ollama model serves which language
#[derive(Debug, Clone)]
pub struct ModelRouting {
    default_model: String,
    language_models: BTreeMap<String, String>,
}

impl ModelRouting {
    /// Create a routing table
    ///
    /// Override keys may be any ISO 639 code; they are stored in 639-1 form.
    pub fn new(default_model: impl Into<String>, language_models: BTreeMap<String, String>) -> Self {
        let language_models = language_models
            .into_iter()
            .map(|(code, model)| {
                let key = language_catalog::normalize_code(&code).unwrap_or_else(|_| code.trim().to_lowercase());
                (key, model)
            })
            .collect();
        Self {
            default_model: default_model.into(),
            language_models,
        }
    }

    /// Model used for a language code
    pub fn model_for(&self, code: &str) -> &str {
        self.language_models
            .get(code)
            .map(String::as_str)
            .unwrap_or(self.default_model.as_str())
    }

    /// Models needed to serve a pair, without duplicates
    pub fn models_for_pair(&self, source: &str, target: &str) -> Vec<String> {
        let mut models = vec![self.model_for(source).to_string()];
        let target_model = self.model_for(target).to_string();
        if !models.contains(&target_model) {
            models.push(target_model);
        }
        models
    }
}

/// Engine creating handles on top of an Ollama server
#[derive(Debug, Clone)]
pub struct OllamaEngine {
    client: Arc<OllamaClient>,
    routing: Arc<ModelRouting>,
    temperature: f32,
}

impl OllamaEngine {
    /// Create an engine from explicit parts
    pub fn new(client: OllamaClient, routing: ModelRouting, temperature: f32) -> Self {
        Self {
            client: Arc::new(client),
            routing: Arc::new(routing),
            temperature,
        }
    }

    /// Create an engine from the engine configuration
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let client = OllamaClient::new(
            &config.endpoint,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        let routing = ModelRouting::new(config.default_model.clone(), config.language_models.clone());
        info!("Using Ollama engine at {} (default model {})", client.base_url(), config.default_model);
        Ok(Self::new(client, routing, config.temperature))
    }

    /// Model store backed by the same server
    pub fn model_store(&self) -> OllamaModelStore {
        OllamaModelStore {
            client: Arc::clone(&self.client),
            routing: Arc::clone(&self.routing),
        }
    }
}

impl TranslationEngine for OllamaEngine {
    fn create_translator(
        &self,
        source_language: &str,
        target_language: &str,
    ) -> Result<Arc<dyn EngineHandle>, EngineError> {
        let (source, target) = match (
            language_catalog::find_language(source_language),
            language_catalog::find_language(target_language),
        ) {
            (Some(source), Some(target)) => (source, target),
            _ => {
                return Err(EngineError::UnsupportedPair {
                    source_language: source_language.to_string(),
                    target_language: target_language.to_string(),
                });
            }
        };

        Ok(Arc::new(OllamaHandle {
            client: Arc::clone(&self.client),
            models: self.routing.models_for_pair(source.code, target.code),
            inference_model: self.routing.model_for(target.code).to_string(),
            source: *source,
            target: *target,
            temperature: self.temperature,
            closed: AtomicBool::new(false),
        }))
    }
}

/// Handle bound to one pair on an Ollama server
#[derive(Debug)]
pub struct OllamaHandle {
    client: Arc<OllamaClient>,
    models: Vec<String>,
    inference_model: String,
    source: LanguagePair,
    target: LanguagePair,
    temperature: f32,
    closed: AtomicBool,
}

impl OllamaHandle {
    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(EngineError::HandleClosed)
        } else {
            Ok(())
        }
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are a translation engine. Translate the user's text from {} to {}. \
             Reply with the translation only, without notes or quotes.",
            self.source.display_name, self.target.display_name
        )
    }
}

#[async_trait]
impl EngineHandle for OllamaHandle {
    fn source_language(&self) -> &str {
        self.source.code
    }

    fn target_language(&self) -> &str {
        self.target.code
    }

    async fn download_model_if_needed(
        &self,
        conditions: &DownloadConditions,
    ) -> Result<(), EngineError> {
        self.ensure_open()?;
        debug!(
            "Ollama pulls ignore network conditions (allow_cellular = {})",
            conditions.allow_cellular
        );

        let local = self
            .client
            .local_model_names()
            .await
            .map_err(|e| EngineError::DownloadFailed(e.to_string()))?;

        for model in &self.models {
            if local.contains(&canonical_model_name(model)) {
                debug!("Model '{}' already present", model);
                continue;
            }

            self.ensure_open()?;
            info!("Pulling model '{}'", model);
            let pulled = self
                .client
                .pull(model)
                .await
                .map_err(|e| EngineError::DownloadFailed(e.to_string()))?;
            if pulled.status != "success" {
                return Err(EngineError::DownloadFailed(format!(
                    "pull of '{}' ended with status '{}'",
                    model, pulled.status
                )));
            }
        }

        Ok(())
    }

    async fn translate(&self, text: &str) -> Result<String, EngineError> {
        self.ensure_open()?;

        let request = GenerationRequest::new(self.inference_model.clone(), text)
            .system(self.system_prompt())
            .temperature(self.temperature);

        let response = self
            .client
            .generate(&request)
            .await
            .map_err(|e| EngineError::InferenceFailed(e.to_string()))?;

        let translated = response.response.trim();
        if translated.is_empty() {
            return Err(EngineError::InferenceFailed(format!(
                "model '{}' returned an empty response",
                response.model
            )));
        }
        Ok(translated.to_string())
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("Closed Ollama handle for {} -> {}", self.source.code, self.target.code);
        }
    }
}

/// Model store listing the languages whose routed model is pulled
#[derive(Debug, Clone)]
pub struct OllamaModelStore {
    client: Arc<OllamaClient>,
    routing: Arc<ModelRouting>,
}

#[async_trait]
impl ModelStore for OllamaModelStore {
    async fn downloaded_models(&self) -> Result<HashSet<String>, EngineError> {
        let local = self
            .client
            .local_model_names()
            .await
            .map_err(|e| EngineError::StoreUnavailable(e.to_string()))?;

        Ok(language_catalog::supported_languages()
            .iter()
            .filter(|language| local.contains(&canonical_model_name(self.routing.model_for(language.code))))
            .map(|language| language.code.to_string())
            .collect())
    }
}
