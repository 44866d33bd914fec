use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::language_catalog;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Default source language code (ISO 639-1)
    pub source_language: String,

    /// Default target language code (ISO 639-1)
    pub target_language: String,

    /// Engine backend settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Translation coordinator settings
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Engine backend type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineBackend {
    // @backend: Local Ollama server
    #[default]
    Ollama,
    // @backend: In-process engine, no network
    Simulated,
}

impl EngineBackend {
    // @returns: Capitalized backend name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::Simulated => "Simulated",
        }
    }
}

impl std::fmt::Display for EngineBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::Simulated => write!(f, "simulated"),
        }
    }
}

impl std::str::FromStr for EngineBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "simulated" => Ok(Self::Simulated),
            _ => Err(anyhow!("Invalid engine backend: {}", s)),
        }
    }
}

/// Engine configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    /// Backend used to create engine handles
    #[serde(default)]
    pub backend: EngineBackend,

    /// Ollama service URL
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,

    /// Ollama model used for languages without an override
    #[serde(default = "default_ollama_model")]
    pub default_model: String,

    /// Per-language model overrides, keyed by ISO 639-1 code
    #[serde(default)]
    pub language_models: BTreeMap<String, String>,

    /// Timeout for generation and model listing requests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Temperature parameter for generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Simulated backend: languages whose model starts installed
    #[serde(default = "default_installed_languages")]
    pub installed_languages: Vec<String>,

    /// Simulated backend: duration of a model download
    #[serde(default = "default_download_delay_ms")]
    pub download_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: EngineBackend::default(),
            endpoint: default_ollama_endpoint(),
            default_model: default_ollama_model(),
            language_models: BTreeMap::new(),
            request_timeout_secs: default_request_timeout_secs(),
            temperature: default_temperature(),
            installed_languages: default_installed_languages(),
            download_delay_ms: default_download_delay_ms(),
        }
    }
}

/// What the coordinator does with its engine handle between calls
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HandlePolicy {
    /// Close the handle and create a new one on every call
    #[default]
    RecreateEachCall,
    /// Keep the handle while the language pair does not change
    CacheByPair,
}

/// What happens to a call made while another one is in flight
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Wait for the running call, in arrival order
    #[default]
    Queue,
    /// Fail immediately with a busy error
    Reject,
}

/// Translation coordinator configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CoordinatorConfig {
    /// Allow model downloads over cellular connections
    #[serde(default)]
    pub allow_cellular: bool,

    /// Model acquisition timeout in seconds (None disables it)
    #[serde(default = "default_acquisition_timeout_secs")]
    pub acquisition_timeout_secs: Option<u64>,

    /// Inference timeout in seconds (None disables it)
    #[serde(default = "default_inference_timeout_secs")]
    pub inference_timeout_secs: Option<u64>,

    /// Model store query timeout in seconds (None disables it)
    #[serde(default = "default_store_query_timeout_secs")]
    pub store_query_timeout_secs: Option<u64>,

    /// Engine handle reuse policy
    #[serde(default)]
    pub handle_policy: HandlePolicy,

    /// Overlapping call policy
    #[serde(default)]
    pub overlap_policy: OverlapPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            allow_cellular: false,
            acquisition_timeout_secs: default_acquisition_timeout_secs(),
            inference_timeout_secs: default_inference_timeout_secs(),
            store_query_timeout_secs: default_store_query_timeout_secs(),
            handle_policy: HandlePolicy::default(),
            overlap_policy: OverlapPolicy::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Model acquisition timeout
    pub fn acquisition_timeout(&self) -> Option<Duration> {
        self.acquisition_timeout_secs.map(Duration::from_secs)
    }

    /// Inference timeout
    pub fn inference_timeout(&self) -> Option<Duration> {
        self.inference_timeout_secs.map(Duration::from_secs)
    }

    /// Model store query timeout
    pub fn store_query_timeout(&self) -> Option<Duration> {
        self.store_query_timeout_secs.map(Duration::from_secs)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching filter for the `log` facade
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_temperature() -> f32 {
    0.2
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_installed_languages() -> Vec<String> {
    vec!["en".to_string()]
}

fn default_download_delay_ms() -> u64 {
    400
}

fn default_acquisition_timeout_secs() -> Option<u64> {
    Some(300)
}

fn default_inference_timeout_secs() -> Option<u64> {
    Some(60)
}

fn default_store_query_timeout_secs() -> Option<u64> {
    Some(10)
}

/// Config file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "conf.json";

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        language_catalog::resolve_language(&self.source_language)
            .context("Invalid source language")?;
        language_catalog::resolve_language(&self.target_language)
            .context("Invalid target language")?;

        if !(0.0..=1.0).contains(&self.engine.temperature) {
            return Err(anyhow!(
                "Temperature must be between 0.0 and 1.0, got {}",
                self.engine.temperature
            ));
        }

        match self.engine.backend {
            EngineBackend::Ollama => {
                if self.engine.endpoint.trim().is_empty() {
                    return Err(anyhow!("An endpoint is required for the Ollama backend"));
                }
                if self.engine.default_model.trim().is_empty() {
                    return Err(anyhow!("A default model is required for the Ollama backend"));
                }
                for (code, model) in &self.engine.language_models {
                    if !language_catalog::is_supported(code) {
                        return Err(anyhow!("Model override for unsupported language: {}", code));
                    }
                    if model.trim().is_empty() {
                        return Err(anyhow!("Empty model override for language: {}", code));
                    }
                }
            }
            EngineBackend::Simulated => {
                for code in &self.engine.installed_languages {
                    if !language_catalog::is_supported(code) {
                        return Err(anyhow!("Unsupported installed language: {}", code));
                    }
                }
            }
        }

        Ok(())
    }

    /// Config path used when none is given on the command line
    ///
    /// Prefers `conf.json` in the working directory, then the user's
    /// configuration directory.
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return local;
        }
        dirs::config_dir()
            .map(|dir| dir.join("lingopad").join(CONFIG_FILE_NAME))
            .unwrap_or(local)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save the configuration as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Load a configuration file, writing the defaults first if it is missing
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: "es".to_string(),
            engine: EngineConfig::default(),
            coordinator: CoordinatorConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
