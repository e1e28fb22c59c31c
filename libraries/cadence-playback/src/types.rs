//! Core types for playback management

use serde::{Deserialize, Serialize};

/// Format hint passed to the media backend when none is configured
pub const DEFAULT_FORMAT: &str = "mp3";

/// Playback engine state
///
/// `Idle -> Loading -> Playing <-> Paused`, and back to `Idle` on end,
/// unload, or load failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Nothing bound
    #[default]
    Idle,
    /// Bound, waiting for the backend to report the media is ready
    Loading,
    Playing,
    Paused,
}

/// Options handed to the backend for each load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Initial gain (0.0 - 1.0)
    pub volume: f32,
    /// Container/codec hint, e.g. `mp3`
    pub format: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            volume: 1.0,
            format: DEFAULT_FORMAT.to_string(),
        }
    }
}
