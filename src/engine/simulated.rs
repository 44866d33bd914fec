/*!
 * Simulated engine for tests and offline runs.
 *
 * The simulated engine never translates anything. It tags the input with the
 * bound pair (`[en-es] hello`) so callers can tell which handle produced a
 * result. Behaviors are scripted:
 * - `SimulatedEngine::working()` - downloads and translations succeed
 * - `SimulatedEngine::failing_downloads(reason)` - every download fails
 * - `SimulatedEngine::failing_inference(reason)` - every translation fails
 * - `SimulatedEngine::failing_creation(reason)` - no handle can be created
 *
 * A tracker records handle creation, closing and downloads so tests can
 * check the handle lifecycle.
 */

use async_trait::async_trait;
use log::debug;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::engine::{DownloadConditions, EngineHandle, ModelStore, TranslationEngine};
use crate::errors::EngineError;
use crate::language_catalog;

/// Behavior mode for the simulated engine
#[derive(Debug, Clone, PartialEq)]
pub enum SimulatedBehavior {
    /// Downloads and translations succeed
    Working,
    /// Every model download fails with the given reason
    DownloadFailing { reason: String },
    /// Every translation fails with the given reason
    InferenceFailing { reason: String },
    /// Handle creation fails with the given reason
    CreationFailing { reason: String },
}

/// Record of what the engine was asked to do
#[derive(Debug, Default)]
struct Tracker {
    created_pairs: Vec<(String, String)>,
    live_handles: usize,
    closed_handles: usize,
    downloads: usize,
    last_conditions: Option<DownloadConditions>,
}

#[derive(Debug)]
struct Shared {
    behavior: SimulatedBehavior,
    installed: RwLock<HashSet<String>>,
    tracker: Mutex<Tracker>,
    download_delay: Duration,
    inference_delay: Duration,
    download_gate: Option<Arc<Semaphore>>,
    cellular_network: bool,
    store_failure: Option<String>,
}

/// In-process engine with scripted behavior
#[derive(Debug, Clone)]
pub struct SimulatedEngine {
    shared: Arc<Shared>,
}

impl SimulatedEngine {
    /// Create a simulated engine with the specified behavior
    pub fn new(behavior: SimulatedBehavior) -> Self {
        Self {
            shared: Arc::new(Shared {
                behavior,
                installed: RwLock::new(HashSet::new()),
                tracker: Mutex::new(Tracker::default()),
                download_delay: Duration::ZERO,
                inference_delay: Duration::ZERO,
                download_gate: None,
                cellular_network: false,
                store_failure: None,
            }),
        }
    }

    /// Create an engine whose downloads and translations succeed
    pub fn working() -> Self {
        Self::new(SimulatedBehavior::Working)
    }

    /// Create an engine whose downloads always fail
    pub fn failing_downloads(reason: impl Into<String>) -> Self {
        Self::new(SimulatedBehavior::DownloadFailing { reason: reason.into() })
    }

    /// Create an engine whose translations always fail
    pub fn failing_inference(reason: impl Into<String>) -> Self {
        Self::new(SimulatedBehavior::InferenceFailing { reason: reason.into() })
    }

    /// Create an engine that cannot create handles
    pub fn failing_creation(reason: impl Into<String>) -> Self {
        Self::new(SimulatedBehavior::CreationFailing { reason: reason.into() })
    }

    fn configure(self, update: impl FnOnce(&mut Shared)) -> Self {
        let mut shared = Arc::try_unwrap(self.shared).unwrap_or_else(|shared| Shared {
            behavior: shared.behavior.clone(),
            installed: RwLock::new(shared.installed.read().clone()),
            tracker: Mutex::new(Tracker::default()),
            download_delay: shared.download_delay,
            inference_delay: shared.inference_delay,
            download_gate: shared.download_gate.clone(),
            cellular_network: shared.cellular_network,
            store_failure: shared.store_failure.clone(),
        });
        update(&mut shared);
        Self { shared: Arc::new(shared) }
    }

    /// Mark models as already installed
    ///
    /// Codes may be any ISO 639 form; they are stored in 639-1 form.
    pub fn with_installed<S: AsRef<str>>(self, codes: &[S]) -> Self {
        let codes: Vec<String> = codes
            .iter()
            .map(|code| {
                let code = code.as_ref();
                language_catalog::normalize_code(code).unwrap_or_else(|_| code.trim().to_lowercase())
            })
            .collect();
        self.configure(|shared| shared.installed.get_mut().extend(codes))
    }

    /// Delay each model download that actually has to fetch something
    pub fn with_download_delay(self, delay_ms: u64) -> Self {
        self.configure(|shared| shared.download_delay = Duration::from_millis(delay_ms))
    }

    /// Delay each translation
    pub fn with_inference_delay(self, delay_ms: u64) -> Self {
        self.configure(|shared| shared.inference_delay = Duration::from_millis(delay_ms))
    }

    /// Hold every download until a permit is added to the gate
    ///
    /// Each download consumes one permit.
    pub fn with_download_gate(self, gate: Arc<Semaphore>) -> Self {
        self.configure(|shared| shared.download_gate = Some(gate))
    }

    /// Pretend the device is on a cellular connection
    pub fn on_cellular_network(self) -> Self {
        self.configure(|shared| shared.cellular_network = true)
    }

    /// Make the model store fail every query
    pub fn with_failing_store(self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        self.configure(|shared| shared.store_failure = Some(reason))
    }

    /// Model store sharing this engine's installed models
    pub fn model_store(&self) -> SimulatedModelStore {
        SimulatedModelStore {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Pairs handles were created for, in order
    pub fn created_pairs(&self) -> Vec<(String, String)> {
        self.shared.tracker.lock().created_pairs.clone()
    }

    /// Number of handles created and not yet closed
    pub fn live_handles(&self) -> usize {
        self.shared.tracker.lock().live_handles
    }

    /// Number of handles closed
    pub fn closed_handles(&self) -> usize {
        self.shared.tracker.lock().closed_handles
    }

    /// Number of download requests received
    pub fn download_count(&self) -> usize {
        self.shared.tracker.lock().downloads
    }

    /// Conditions passed with the latest download request
    pub fn last_conditions(&self) -> Option<DownloadConditions> {
        self.shared.tracker.lock().last_conditions
    }

    /// Whether the model for a language is installed
    pub fn is_installed(&self, code: &str) -> bool {
        self.shared.installed.read().contains(code)
    }
}

impl TranslationEngine for SimulatedEngine {
    fn create_translator(
        &self,
        source_language: &str,
        target_language: &str,
    ) -> Result<Arc<dyn EngineHandle>, EngineError> {
        if let SimulatedBehavior::CreationFailing { reason } = &self.shared.behavior {
            return Err(EngineError::CreationFailed(reason.clone()));
        }

        let (source, target) = match (
            language_catalog::find_language(source_language),
            language_catalog::find_language(target_language),
        ) {
            (Some(source), Some(target)) => (source.code, target.code),
            _ => {
                return Err(EngineError::UnsupportedPair {
                    source_language: source_language.to_string(),
                    target_language: target_language.to_string(),
                });
            }
        };

        let mut tracker = self.shared.tracker.lock();
        tracker.created_pairs.push((source.to_string(), target.to_string()));
        tracker.live_handles += 1;
        debug!("Simulated handle created for {} -> {}", source, target);

        Ok(Arc::new(SimulatedHandle {
            source_language: source.to_string(),
            target_language: target.to_string(),
            shared: Arc::clone(&self.shared),
            closed: AtomicBool::new(false),
        }))
    }
}

/// Handle produced by `SimulatedEngine`
#[derive(Debug)]
pub struct SimulatedHandle {
    source_language: String,
    target_language: String,
    shared: Arc<Shared>,
    closed: AtomicBool,
}

impl SimulatedHandle {
    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(EngineError::HandleClosed)
        } else {
            Ok(())
        }
    }

    fn models_installed(&self) -> bool {
        let installed = self.shared.installed.read();
        installed.contains(&self.source_language) && installed.contains(&self.target_language)
    }
}

#[async_trait]
impl EngineHandle for SimulatedHandle {
    fn source_language(&self) -> &str {
        &self.source_language
    }

    fn target_language(&self) -> &str {
        &self.target_language
    }

    async fn download_model_if_needed(
        &self,
        conditions: &DownloadConditions,
    ) -> Result<(), EngineError> {
        self.ensure_open()?;
        {
            let mut tracker = self.shared.tracker.lock();
            tracker.downloads += 1;
            tracker.last_conditions = Some(*conditions);
        }

        if let Some(gate) = &self.shared.download_gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| EngineError::DownloadFailed("download gate closed".to_string()))?;
            permit.forget();
        }

        if let SimulatedBehavior::DownloadFailing { reason } = &self.shared.behavior {
            return Err(EngineError::DownloadFailed(reason.clone()));
        }

        if self.models_installed() {
            return Ok(());
        }

        if self.shared.cellular_network && !conditions.allow_cellular {
            return Err(EngineError::DownloadFailed(
                "waiting for Wi-Fi, cellular downloads are not allowed".to_string(),
            ));
        }

        if !self.shared.download_delay.is_zero() {
            tokio::time::sleep(self.shared.download_delay).await;
        }
        self.ensure_open()?;

        let mut installed = self.shared.installed.write();
        installed.insert(self.source_language.clone());
        installed.insert(self.target_language.clone());
        debug!(
            "Simulated models installed for {} -> {}",
            self.source_language, self.target_language
        );
        Ok(())
    }

    async fn translate(&self, text: &str) -> Result<String, EngineError> {
        self.ensure_open()?;

        if !self.models_installed() {
            return Err(EngineError::InferenceFailed(format!(
                "model for {} -> {} is not downloaded",
                self.source_language, self.target_language
            )));
        }

        if !self.shared.inference_delay.is_zero() {
            tokio::time::sleep(self.shared.inference_delay).await;
        }

        match &self.shared.behavior {
            SimulatedBehavior::InferenceFailing { reason } => {
                Err(EngineError::InferenceFailed(reason.clone()))
            }
            _ => Ok(format!(
                "[{}-{}] {}",
                self.source_language, self.target_language, text
            )),
        }
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let mut tracker = self.shared.tracker.lock();
            tracker.live_handles = tracker.live_handles.saturating_sub(1);
            tracker.closed_handles += 1;
            debug!(
                "Simulated handle closed for {} -> {}",
                self.source_language, self.target_language
            );
        }
    }
}

/// Model store view over a `SimulatedEngine`
#[derive(Debug, Clone)]
pub struct SimulatedModelStore {
    shared: Arc<Shared>,
}

#[async_trait]
impl ModelStore for SimulatedModelStore {
    async fn downloaded_models(&self) -> Result<HashSet<String>, EngineError> {
        if let Some(reason) = &self.shared.store_failure {
            return Err(EngineError::StoreUnavailable(reason.clone()));
        }
        Ok(self.shared.installed.read().clone())
    }
}
