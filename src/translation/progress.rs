/*!
 * Model download progress observable.
 *
 * The coordinator publishes a single value in `[0, 1]` on a watch channel;
 * any number of readers can observe it but none can write it.
 */

use tokio::sync::watch;

/// Nothing is downloading
pub const IDLE: f32 = 0.0;

/// A model acquisition has started
///
/// Engines do not report byte-level progress, so this is a coarse marker.
pub const ACQUISITION_STARTED: f32 = 0.1;

/// The model is present locally
pub const COMPLETE: f32 = 1.0;

/// Coarse reading of a progress value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    /// No acquisition running, or the last one failed
    Idle,
    /// An acquisition is running
    InProgress,
    /// The last acquisition succeeded
    Complete,
}

impl ProgressPhase {
    /// Phase of a raw progress value
    pub fn of(value: f32) -> Self {
        if value <= IDLE {
            Self::Idle
        } else if value >= COMPLETE {
            Self::Complete
        } else {
            Self::InProgress
        }
    }
}

/// Writing side, owned by the coordinator
#[derive(Debug)]
pub(crate) struct ProgressPublisher {
    tx: watch::Sender<f32>,
}

impl ProgressPublisher {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(IDLE);
        Self { tx }
    }

    pub(crate) fn publish(&self, value: f32) {
        self.tx.send_replace(value.clamp(IDLE, COMPLETE));
    }

    pub(crate) fn subscribe(&self) -> DownloadProgress {
        DownloadProgress {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read-only view of the download progress
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    rx: watch::Receiver<f32>,
}

impl DownloadProgress {
    /// Current value
    pub fn value(&self) -> f32 {
        *self.rx.borrow()
    }

    /// Current phase
    pub fn phase(&self) -> ProgressPhase {
        ProgressPhase::of(self.value())
    }

    /// Wait for the next published value
    ///
    /// Returns `None` once the coordinator is gone. Values published in
    /// quick succession may be coalesced into the latest one.
    pub async fn changed(&mut self) -> Option<f32> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    /// Wait until the value satisfies a predicate
    ///
    /// Returns `None` if the coordinator is dropped first.
    pub async fn wait_for(&mut self, mut predicate: impl FnMut(f32) -> bool) -> Option<f32> {
        self.rx
            .wait_for(|value| predicate(*value))
            .await
            .ok()
            .map(|value| *value)
    }
}
