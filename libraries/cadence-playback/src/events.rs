//! Playback Events
//!
//! Emitted by the engine at state transitions and forwarded by the player
//! controller to subscribers.

use crate::types::PlaybackState;
use serde::{Deserialize, Serialize};

/// Events emitted by the playback system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Engine state changed
    StateChanged {
        /// The new state
        state: PlaybackState,
    },

    /// Audio started (first play after load, or resume)
    PlayStarted {
        /// Locator of the bound media
        url: String,
    },

    /// Audio paused by the user
    Paused { url: String },

    /// Media reached its end
    ///
    /// Emitted exactly once per completed play-through, never on pause or
    /// unload.
    PlaybackEnded { url: String },

    /// Volume changed
    VolumeChanged {
        /// New gain (0.0 - 1.0)
        level: f32,
        /// Whether audio is muted
        is_muted: bool,
    },

    /// Loading or resolving media failed
    Error {
        /// Error message
        message: String,
    },
}
