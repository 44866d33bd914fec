/*!
 * Error types for the lingopad application.
 *
 * This module contains custom error types for the different layers of the
 * application, using the thiserror crate for ergonomic error definitions:
 * - `EngineError`: failures reported by a translation engine or model store
 * - `CoordinatorError`: the categories a translation call can fail with
 * - `AppError`: what the controller reports to the binary
 */

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when talking to a translation engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The engine cannot serve this language pair
    #[error("unsupported language pair: {source_language} -> {target_language}")]
    UnsupportedPair {
        /// Requested source language code
        source_language: String,
        /// Requested target language code
        target_language: String,
    },

    /// The engine handle could not be created
    #[error("engine creation failed: {0}")]
    CreationFailed(String),

    /// The model download or lookup failed
    #[error("model download failed: {0}")]
    DownloadFailed(String),

    /// The engine faulted while translating
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    /// The local model store could not be queried
    #[error("model store unavailable: {0}")]
    StoreUnavailable(String),

    /// The handle was closed before or during the operation
    #[error("engine handle is closed")]
    HandleClosed,

    /// The operation did not resolve in time
    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),

    /// The operation was cancelled by a release of the coordinator
    #[error("operation cancelled")]
    Cancelled,
}

/// Category of a failed translation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Model acquisition failed
    Download,
    /// Inference failed
    Translation,
    /// Anything else in the coordinated sequence
    Service,
}

impl ErrorCategory {
    /// Marker prefixed to the rendered error string
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Download => "Download error",
            Self::Translation => "Translation error",
            Self::Service => "Service error",
        }
    }
}

/// Errors a translation call can end with
///
/// The `Display` output always starts with the category marker, so the
/// rendered string can be shown in place of a translation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinatorError {
    /// Model acquisition failed, timed out or was cancelled
    #[error("Download error: {0}")]
    ModelAcquisition(EngineError),

    /// The engine produced a fault during translation
    #[error("Translation error: {0}")]
    Inference(EngineError),

    /// Any other fault, such as a failed engine creation
    #[error("Service error: {0}")]
    GeneralService(String),

    /// Another translation holds the request slot
    #[error("Service error: a translation is already in progress")]
    Busy,
}

impl CoordinatorError {
    /// Category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ModelAcquisition(_) => ErrorCategory::Download,
            Self::Inference(_) => ErrorCategory::Translation,
            Self::GeneralService(_) | Self::Busy => ErrorCategory::Service,
        }
    }
}

/// Application-level errors surfaced by the controller
#[derive(Error, Debug)]
pub enum AppError {
    /// A language or setting the controller could not use
    #[error("Configuration error: {0}")]
    Config(String),

    /// A translation call that failed
    #[error("{0}")]
    Coordinator(#[from] CoordinatorError),
}
