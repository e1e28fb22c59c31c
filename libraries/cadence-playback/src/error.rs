//! Error types for playback management

use cadence_core::CadenceError;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The media backend refused to load a locator
    #[error("Failed to load {url}: {reason}")]
    Load { url: String, reason: String },

    /// A transport call on a bound resource failed
    #[error("Media backend error: {0}")]
    Backend(String),

    /// No resource is bound
    #[error("Nothing is loaded")]
    NothingBound,

    /// Resolving the active track failed
    #[error(transparent)]
    Catalog(#[from] CadenceError),

    /// The player controller task has stopped
    #[error("Player controller is not running")]
    ControllerClosed,
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
