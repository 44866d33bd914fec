/*!
 * Translation coordinator.
 *
 * Owns the engine handle and the progress observable, and runs each call
 * through the same sequence: bind a handle for the pair, acquire the pair's
 * model, run inference. Failures come back as values whose text starts with
 * their category, so a caller can always display the result.
 *
 * Calls go through a single request slot. Depending on `OverlapPolicy` a
 * second call waits for the slot or is rejected as busy; two calls never
 * share or tear down each other's handle mid-flight.
 */

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard, watch};

use crate::app_config::{Config, CoordinatorConfig, HandlePolicy, OverlapPolicy};
use crate::engine::{self, DownloadConditions, EngineHandle, ModelStore, TranslationEngine};
use crate::errors::{CoordinatorError, EngineError};
use crate::language_catalog::{self, LanguagePair};
use crate::translation::progress::{self, DownloadProgress, ProgressPublisher};
use crate::translation::request::TranslationRequest;

/// Where the coordinator is in a translation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// No call in flight
    Idle,
    /// Waiting for the pair's model
    AcquiringModel,
    /// Model present, inference about to start
    Acquired,
    /// Waiting for the engine's translation
    Translating,
}

/// The handle currently owned by the coordinator
#[derive(Debug)]
struct BoundHandle {
    source_language: String,
    target_language: String,
    handle: Arc<dyn EngineHandle>,
}

/// Sequences engine handle lifecycle, model acquisition and inference
#[derive(Debug)]
pub struct TranslationCoordinator {
    engine: Arc<dyn TranslationEngine>,
    model_store: Arc<dyn ModelStore>,
    settings: CoordinatorConfig,
    progress: ProgressPublisher,
    state: watch::Sender<CoordinatorState>,
    bound: Mutex<Option<BoundHandle>>,
    request_slot: AsyncMutex<()>,
    cancel_epoch: watch::Sender<u64>,
}

impl TranslationCoordinator {
    /// Create a coordinator over an engine and its model store
    pub fn new(
        engine: Arc<dyn TranslationEngine>,
        model_store: Arc<dyn ModelStore>,
        settings: CoordinatorConfig,
    ) -> Self {
        let (state, _) = watch::channel(CoordinatorState::Idle);
        let (cancel_epoch, _) = watch::channel(0);
        Self {
            engine,
            model_store,
            settings,
            progress: ProgressPublisher::new(),
            state,
            bound: Mutex::new(None),
            request_slot: AsyncMutex::new(()),
            cancel_epoch,
        }
    }

    /// Create a coordinator with the engine backend selected by the configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let (engine, model_store) = engine::build_backend(&config.engine)?;
        Ok(Self::new(engine, model_store, config.coordinator.clone()))
    }

    /// Settings this coordinator runs with
    pub fn settings(&self) -> &CoordinatorConfig {
        &self.settings
    }

    /// Observe the model download progress
    pub fn progress(&self) -> DownloadProgress {
        self.progress.subscribe()
    }

    /// Current state
    pub fn state(&self) -> CoordinatorState {
        *self.state.borrow()
    }

    /// Observe state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<CoordinatorState> {
        self.state.subscribe()
    }

    /// Whether a call is in flight
    pub fn is_busy(&self) -> bool {
        self.state() != CoordinatorState::Idle
    }

    /// Pair the live handle is bound to, if any
    pub fn bound_pair(&self) -> Option<(String, String)> {
        self.bound
            .lock()
            .as_ref()
            .map(|bound| (bound.source_language.clone(), bound.target_language.clone()))
    }

    /// Translate text, rendering any failure as a categorized message
    ///
    /// Never fails: errors come back as strings starting with
    /// "Download error", "Translation error" or "Service error".
    pub async fn translate(&self, text: &str, source_language: &str, target_language: &str) -> String {
        match self.try_translate(text, source_language, target_language).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!("Translation {} -> {} failed: {}", source_language, target_language, e);
                e.to_string()
            }
        }
    }

    /// Translate text, keeping failures as typed errors
    pub async fn try_translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, CoordinatorError> {
        let request = TranslationRequest::new(text, source_language, target_language);
        if let Some(unchanged) = request.passthrough() {
            debug!(
                "Nothing to translate for {} -> {}, returning input unchanged",
                source_language, target_language
            );
            return Ok(unchanged.to_string());
        }

        let mut cancel = self.cancel_epoch.subscribe();
        let _slot = self.claim_slot(&mut cancel).await?;

        let result = self.run(&request, &mut cancel).await;
        self.set_state(CoordinatorState::Idle);
        result
    }

    /// Best-effort check for a locally installed model
    ///
    /// Unsupported codes and model store failures report `false`.
    pub async fn is_model_available(&self, language_code: &str) -> bool {
        let Some(language) = language_catalog::find_language(language_code) else {
            debug!("'{}' is not a supported language", language_code);
            return false;
        };

        match self.query_model_store().await {
            Ok(models) => models.contains(language.code),
            Err(e) => {
                warn!("Could not check the model for '{}': {}", language.code, e);
                false
            }
        }
    }

    /// Supported languages whose model is installed, in catalog order
    ///
    /// Model store failures report no language.
    pub async fn downloaded_languages(&self) -> Vec<&'static LanguagePair> {
        match self.query_model_store().await {
            Ok(models) => language_catalog::supported_languages()
                .iter()
                .filter(|language| models.contains(language.code))
                .collect(),
            Err(e) => {
                warn!("Could not list downloaded models: {}", e);
                Vec::new()
            }
        }
    }

    /// Cancel in-flight and queued calls and close the held handle
    ///
    /// Does not wait for anything, so it is safe on shutdown paths. Calling it
    /// again has no effect; a later `translate` binds a fresh handle.
    pub fn release(&self) {
        self.cancel_epoch.send_modify(|epoch| *epoch = epoch.wrapping_add(1));

        let released = self.bound.lock().take();
        match released {
            Some(bound) => {
                bound.handle.close();
                info!(
                    "Released engine handle for {} -> {}",
                    bound.source_language, bound.target_language
                );
            }
            None => debug!("No engine handle to release"),
        }
    }

    async fn claim_slot(
        &self,
        cancel: &mut watch::Receiver<u64>,
    ) -> Result<AsyncMutexGuard<'_, ()>, CoordinatorError> {
        match self.settings.overlap_policy {
            OverlapPolicy::Reject => self.request_slot.try_lock().map_err(|_| {
                debug!("Rejecting translation call, another one is in flight");
                CoordinatorError::Busy
            }),
            OverlapPolicy::Queue => {
                // A release that lands while the slot frees up still wins.
                tokio::select! {
                    biased;
                    _ = cancel.changed() => Err(CoordinatorError::GeneralService(
                        "coordinator released while the call was queued".to_string(),
                    )),
                    slot = self.request_slot.lock() => Ok(slot),
                }
            }
        }
    }

    async fn run(
        &self,
        request: &TranslationRequest<'_>,
        cancel: &mut watch::Receiver<u64>,
    ) -> Result<String, CoordinatorError> {
        let handle = self.bind_handle(request)?;

        self.set_state(CoordinatorState::AcquiringModel);
        self.acquire_model(handle.as_ref(), cancel).await?;
        self.set_state(CoordinatorState::Acquired);

        self.set_state(CoordinatorState::Translating);
        let translated = guarded(
            self.settings.inference_timeout(),
            cancel,
            handle.translate(request.text),
        )
        .await
        .map_err(|e| {
            error!(
                "Inference for {} -> {} failed: {}",
                handle.source_language(),
                handle.target_language(),
                e
            );
            CoordinatorError::Inference(e)
        })?;

        info!(
            "Translated {} chars ({} -> {})",
            request.text.chars().count(),
            handle.source_language(),
            handle.target_language()
        );
        Ok(translated)
    }

    fn bind_handle(
        &self,
        request: &TranslationRequest<'_>,
    ) -> Result<Arc<dyn EngineHandle>, CoordinatorError> {
        let mut bound = self.bound.lock();

        if self.settings.handle_policy == HandlePolicy::CacheByPair {
            if let Some(current) = bound
                .as_ref()
                .filter(|current| request.is_for_pair(&current.source_language, &current.target_language))
            {
                debug!(
                    "Reusing engine handle for {} -> {}",
                    current.source_language, current.target_language
                );
                return Ok(Arc::clone(&current.handle));
            }
        }

        if let Some(previous) = bound.take() {
            debug!(
                "Closing engine handle for {} -> {}",
                previous.source_language, previous.target_language
            );
            previous.handle.close();
        }

        let handle = self
            .engine
            .create_translator(request.source_language, request.target_language)
            .map_err(|e| CoordinatorError::GeneralService(e.to_string()))?;

        debug!(
            "Bound engine handle to {} -> {}",
            handle.source_language(),
            handle.target_language()
        );
        *bound = Some(BoundHandle {
            source_language: handle.source_language().to_string(),
            target_language: handle.target_language().to_string(),
            handle: Arc::clone(&handle),
        });
        Ok(handle)
    }

    /// Publishes 0 then 0.1 before waiting on the engine, then 1 or 0.
    ///
    /// The reset to 0 lands right before 0.1 and readers usually only see
    /// the latter; it still guarantees no reader keeps the previous call's 1.
    async fn acquire_model(
        &self,
        handle: &dyn EngineHandle,
        cancel: &mut watch::Receiver<u64>,
    ) -> Result<(), CoordinatorError> {
        self.progress.publish(progress::IDLE);
        self.progress.publish(progress::ACQUISITION_STARTED);

        let conditions = DownloadConditions {
            allow_cellular: self.settings.allow_cellular,
        };
        debug!(
            "Acquiring model for {} -> {} ({:?})",
            handle.source_language(),
            handle.target_language(),
            conditions
        );

        match guarded(
            self.settings.acquisition_timeout(),
            cancel,
            handle.download_model_if_needed(&conditions),
        )
        .await
        {
            Ok(()) => {
                self.progress.publish(progress::COMPLETE);
                info!(
                    "Model ready for {} -> {}",
                    handle.source_language(),
                    handle.target_language()
                );
                Ok(())
            }
            Err(e) => {
                self.progress.publish(progress::IDLE);
                error!(
                    "Model acquisition for {} -> {} failed: {}",
                    handle.source_language(),
                    handle.target_language(),
                    e
                );
                Err(CoordinatorError::ModelAcquisition(e))
            }
        }
    }

    async fn query_model_store(&self) -> Result<HashSet<String>, EngineError> {
        let query = self.model_store.downloaded_models();
        match self.settings.store_query_timeout() {
            Some(limit) => tokio::time::timeout(limit, query)
                .await
                .unwrap_or(Err(EngineError::TimedOut(limit))),
            None => query.await,
        }
    }

    fn set_state(&self, state: CoordinatorState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!("Coordinator state {:?} -> {:?}", previous, state);
        }
    }
}

impl Drop for TranslationCoordinator {
    fn drop(&mut self) {
        self.release();
    }
}

/// Run an engine operation under an optional timeout, aborting on release
async fn guarded<T>(
    limit: Option<Duration>,
    cancel: &mut watch::Receiver<u64>,
    operation: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, EngineError> {
    let bounded = async {
        match limit {
            Some(limit) => match tokio::time::timeout(limit, operation).await {
                Ok(result) => result,
                Err(_) => Err(EngineError::TimedOut(limit)),
            },
            None => operation.await,
        }
    };

    tokio::select! {
        result = bounded => result,
        _ = cancel.changed() => Err(EngineError::Cancelled),
    }
}
