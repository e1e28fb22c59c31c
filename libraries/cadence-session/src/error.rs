/// Session-layer errors
use cadence_core::CadenceError;
use cadence_playback::PlaybackError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] CadenceError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

impl SessionError {
    /// Message suitable for a toast
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Core(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
