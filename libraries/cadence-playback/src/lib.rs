//! Cadence - Playback Management
//!
//! Platform-agnostic playback management for Cadence.
//!
//! This crate provides:
//! - Session-wide playlist state with wrap-around next/previous
//! - A playback engine state machine over one media binding at a time
//! - Volume control (0.0 - 1.0, mute with level memory)
//! - A player controller task that resolves the active track through the
//!   catalog and auto-advances when a track ends
//!
//! # Architecture
//!
//! `cadence-playback` does not decode audio. The platform supplies a
//! [`MediaBackend`]; [`SimulatedBackend`] is a timer-driven stand-in.
//!
//! # Example: Playlist State
//!
//! ```rust
//! use cadence_core::TrackId;
//! use cadence_playback::PlayerStore;
//!
//! let store = PlayerStore::new();
//! store.set_playlist(vec![TrackId::new("a"), TrackId::new("b")]);
//! store.set_active(TrackId::new("b"));
//!
//! // Wraps past the end
//! assert_eq!(store.next(), Some(TrackId::new("a")));
//! ```
//!
//! # Example: Player Controller
//!
//! ```rust,no_run
//! use cadence_playback::{
//!     LoadOptions, PlaybackEngine, PlayerController, PlayerStore, SimulatedBackend,
//! };
//! use cadence_core::{Notifier, TrackCatalog};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(catalog: Arc<dyn TrackCatalog>, notifier: Arc<dyn Notifier>) {
//! let backend = Arc::new(SimulatedBackend::new(Duration::from_secs(30)));
//! let engine = PlaybackEngine::new(backend, LoadOptions::default());
//! let store = PlayerStore::new();
//!
//! let player = PlayerController::spawn(
//!     engine,
//!     store.clone(),
//!     catalog,
//!     notifier,
//!     CancellationToken::new(),
//! );
//!
//! let mut events = player.events();
//! player.set_volume(0.5).await.ok();
//! # }
//! ```

mod backend;
mod controller;
mod engine;
mod error;
mod events;
mod playlist;
mod simulated;
pub mod types;
mod volume;

// Public exports
pub use backend::{MediaBackend, MediaHandle, MediaSignal, SignalSender, TaggedSignal};
pub use controller::{PlayerCommand, PlayerController, PlayerHandle, PlayerStatus};
pub use engine::PlaybackEngine;
pub use error::{PlaybackError, Result};
pub use events::PlaybackEvent;
pub use playlist::{PlayerStore, PlaylistState};
pub use simulated::SimulatedBackend;
pub use types::{LoadOptions, PlaybackState, DEFAULT_FORMAT};
pub use volume::Volume;
