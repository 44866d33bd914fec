use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::app_config::Config;
use crate::errors::AppError;
use crate::language_catalog::{self, LanguagePair};
use crate::translation::{DownloadProgress, ProgressPhase, TranslationCoordinator};

// @module: Application controller driving the coordinator from the CLI

/// Availability of one language's model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelStatus {
    /// Catalog entry
    pub language: LanguagePair,
    /// Whether its model is installed locally
    pub available: bool,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Coordinator owning the engine handle
    coordinator: Arc<TranslationCoordinator>,
    // @field: Draw a progress bar while models download
    show_progress: bool,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let coordinator = TranslationCoordinator::from_config(&config)
            .context("Failed to create the translation engine")?;
        let settings = coordinator.settings();
        info!(
            "Using {} engine ({:?} handles, {:?} overlapping calls)",
            config.engine.backend.display_name(),
            settings.handle_policy,
            settings.overlap_policy
        );
        Ok(Self::with_coordinator(config, Arc::new(coordinator)))
    }

    // @method: Create a controller around an existing coordinator
    pub fn with_coordinator(config: Config, coordinator: Arc<TranslationCoordinator>) -> Self {
        Self {
            config,
            coordinator,
            show_progress: true,
        }
    }

    /// Enable or disable the progress bar
    pub fn set_show_progress(&mut self, show_progress: bool) {
        self.show_progress = show_progress;
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Coordinator in use
    pub fn coordinator(&self) -> &Arc<TranslationCoordinator> {
        &self.coordinator
    }

    /// Translate text between two languages given as codes or names
    ///
    /// Only language resolution can fail. Translation failures are returned as
    /// the categorized message the coordinator produces.
    pub async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        match self.try_translate(text, source, target).await {
            Ok(translated) => Ok(translated),
            Err(AppError::Coordinator(e)) => {
                warn!("Translation {} -> {} failed: {}", source, target, e);
                Ok(e.to_string())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Translate text, keeping translation failures as errors
    pub async fn try_translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> std::result::Result<String, AppError> {
        let source = language_catalog::resolve_language(source)
            .map_err(|e| AppError::Config(format!("Invalid source language: {}", e)))?;
        let target = language_catalog::resolve_language(target)
            .map_err(|e| AppError::Config(format!("Invalid target language: {}", e)))?;

        info!("Translating from {} to {}", source.display_name, target.display_name);

        let follower = self
            .show_progress
            .then(|| follow_progress(self.coordinator.progress(), target));

        let result = self.coordinator.try_translate(text, source.code, target.code).await;

        if let Some((progress_bar, task)) = follower {
            task.abort();
            progress_bar.finish_and_clear();
        }

        Ok(result?)
    }

    /// Translate text with the configured default languages
    pub async fn translate_default(&self, text: &str) -> Result<String> {
        self.translate(text, &self.config.source_language, &self.config.target_language)
            .await
    }

    /// Like `translate_default`, keeping translation failures as errors
    pub async fn try_translate_default(&self, text: &str) -> std::result::Result<String, AppError> {
        self.try_translate(text, &self.config.source_language, &self.config.target_language)
            .await
    }

    /// Model availability for every supported language, in catalog order
    pub async fn model_report(&self) -> Vec<ModelStatus> {
        let installed = self.coordinator.downloaded_languages().await;
        language_catalog::supported_languages()
            .iter()
            .map(|language| ModelStatus {
                language: *language,
                available: installed.contains(&language),
            })
            .collect()
    }

    /// Release the engine handle before exiting
    pub fn shutdown(&self) {
        debug!("Shutting down controller");
        self.coordinator.release();
    }
}

/// Mirror the download progress on a terminal progress bar
fn follow_progress(
    mut progress: DownloadProgress,
    target: &LanguagePair,
) -> (ProgressBar, JoinHandle<()>) {
    let progress_bar = ProgressBar::new(100);
    let template_result = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{bar:40}] {percent}% {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(template_result.progress_chars("█▓▒░"));

    let label = format!("{} model", target.display_name);
    let pb = progress_bar.clone();
    let task = tokio::spawn(async move {
        while let Some(value) = progress.changed().await {
            pb.set_position((value * 100.0).round() as u64);
            match ProgressPhase::of(value) {
                ProgressPhase::InProgress => pb.set_message(format!("Downloading {}", label)),
                ProgressPhase::Complete => pb.set_message(format!("{} ready, translating", label)),
                ProgressPhase::Idle => pb.set_message(String::new()),
            }
        }
    });

    (progress_bar, task)
}
