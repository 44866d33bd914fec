/*!
 * Translation coordination.
 *
 * - `coordinator`: engine handle lifecycle and the acquire-then-translate sequence
 * - `progress`: read-only model download progress observable
 * - `request`: the transient input of one translation call
 */

// Re-export main types for easier usage
pub use self::coordinator::{CoordinatorState, TranslationCoordinator};
pub use self::progress::{DownloadProgress, ProgressPhase};
pub use self::request::TranslationRequest;

// Submodules
pub mod coordinator;
pub mod progress;
pub mod request;
