//! Playback engine
//!
//! Wraps a single media backend binding and drives the
//! `Idle -> Loading -> Playing <-> Paused` state machine. Events are queued
//! and drained by the owner, the same way the controller polls them after
//! every step.

use crate::backend::{MediaBackend, MediaHandle, MediaSignal, SignalSender, TaggedSignal};
use crate::error::{PlaybackError, Result};
use crate::events::PlaybackEvent;
use crate::types::{LoadOptions, PlaybackState};
use crate::volume::Volume;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A bound media resource
///
/// Unloads the handle when dropped, so replacing or clearing the binding
/// always releases the backend resource.
struct Binding {
    generation: u64,
    url: String,
    handle: Box<dyn MediaHandle>,
}

impl Drop for Binding {
    fn drop(&mut self) {
        debug!(url = %self.url, generation = self.generation, "Unloading media");
        self.handle.unload();
    }
}

/// Playback engine over one media backend
pub struct PlaybackEngine {
    backend: Arc<dyn MediaBackend>,
    binding: Option<Binding>,
    state: PlaybackState,
    volume: Volume,
    format: String,

    /// Locator of the most recent bind, kept after unload for restart
    last_url: Option<String>,

    /// Incremented on every bind; signals from older generations are stale
    generation: u64,
    signal_tx: mpsc::UnboundedSender<TaggedSignal>,
    signal_rx: mpsc::UnboundedReceiver<TaggedSignal>,

    pending_events: Vec<PlaybackEvent>,
}

impl PlaybackEngine {
    /// Create an idle engine
    ///
    /// # Arguments
    /// * `options` - initial volume and format hint for every load
    pub fn new(backend: Arc<dyn MediaBackend>, options: LoadOptions) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            binding: None,
            state: PlaybackState::Idle,
            volume: Volume::new(options.volume),
            format: options.format,
            last_url: None,
            generation: 0,
            signal_tx,
            signal_rx,
            pending_events: Vec::new(),
        }
    }

    // ===== Lifecycle =====

    /// Bind `url` and start playing once the backend reports it loaded
    ///
    /// Any previous binding is released first. A synchronous load failure
    /// returns the engine to `Idle`, queues an `Error` event, and is also
    /// returned to the caller.
    pub fn bind_and_play(&mut self, url: &str) -> Result<()> {
        self.release();

        self.generation += 1;
        let generation = self.generation;
        self.last_url = Some(url.to_string());
        self.set_state(PlaybackState::Loading);

        let options = LoadOptions {
            volume: self.volume.level(),
            format: self.format.clone(),
        };
        let signals = SignalSender::new(generation, self.signal_tx.clone());

        match self.backend.load(url, &options, signals) {
            Ok(handle) => {
                debug!(url, generation, "Bound media");
                self.binding = Some(Binding {
                    generation,
                    url: url.to_string(),
                    handle,
                });
                Ok(())
            }
            Err(e) => {
                warn!(url, error = %e, "Media load failed");
                self.emit(PlaybackEvent::Error {
                    message: e.to_string(),
                });
                self.set_state(PlaybackState::Idle);
                Err(e)
            }
        }
    }

    /// Release the bound resource and return to `Idle`
    ///
    /// No-op when nothing is bound.
    pub fn unload(&mut self) {
        if self.release() {
            self.set_state(PlaybackState::Idle);
        }
    }

    /// Drop the binding without touching state; true if one existed
    fn release(&mut self) -> bool {
        self.binding.take().is_some()
    }

    // ===== Transport =====

    /// Pause when playing, resume when paused, restart when idle
    ///
    /// Ignored while loading or when nothing was ever bound.
    pub fn toggle_play_pause(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused => self.resume(),
            PlaybackState::Idle => match self.last_url.clone() {
                Some(url) => self.bind_and_play(&url),
                None => Ok(()),
            },
            PlaybackState::Loading => {
                debug!("Ignoring toggle while loading");
                Ok(())
            }
        }
    }

    /// Pause playback
    pub fn pause(&mut self) -> Result<()> {
        if self.state != PlaybackState::Playing {
            return Ok(());
        }
        let binding = self.binding.as_mut().ok_or(PlaybackError::NothingBound)?;
        binding.handle.pause()?;
        let url = binding.url.clone();

        self.set_state(PlaybackState::Paused);
        self.emit(PlaybackEvent::Paused { url });
        Ok(())
    }

    /// Resume paused playback
    pub fn resume(&mut self) -> Result<()> {
        if self.state != PlaybackState::Paused {
            return Ok(());
        }
        self.start_playing()
    }

    fn start_playing(&mut self) -> Result<()> {
        let binding = self.binding.as_mut().ok_or(PlaybackError::NothingBound)?;
        binding.handle.play()?;
        let url = binding.url.clone();

        self.set_state(PlaybackState::Playing);
        self.emit(PlaybackEvent::PlayStarted { url });
        Ok(())
    }

    // ===== Volume =====

    /// Set volume (clamped to 0.0 - 1.0; 0 is muted)
    pub fn set_volume(&mut self, level: f32) {
        self.volume.set_level(level);
        self.apply_volume();
    }

    /// Swap between silence and the last audible level
    pub fn toggle_mute(&mut self) {
        self.volume.toggle_mute();
        self.apply_volume();
    }

    fn apply_volume(&mut self) {
        let level = self.volume.level();
        if let Some(binding) = self.binding.as_mut() {
            binding.handle.set_volume(level);
        }
        self.emit(PlaybackEvent::VolumeChanged {
            level,
            is_muted: self.volume.is_muted(),
        });
    }

    pub fn volume(&self) -> f32 {
        self.volume.level()
    }

    pub fn is_muted(&self) -> bool {
        self.volume.is_muted()
    }

    // ===== Backend signals =====

    /// Wait for the next backend signal
    ///
    /// Cancel safe. Never returns `None` while the engine is alive, since
    /// it holds a sender itself.
    pub async fn recv_signal(&mut self) -> Option<TaggedSignal> {
        self.signal_rx.recv().await
    }

    /// Apply a backend signal
    ///
    /// Signals whose generation does not match the current binding are
    /// discarded.
    pub fn handle_signal(&mut self, tagged: TaggedSignal) {
        let current = self.binding.as_ref().map(|b| b.generation);
        if current != Some(tagged.generation) {
            debug!(
                generation = tagged.generation,
                current = ?current,
                signal = ?tagged.signal,
                "Discarding stale media signal"
            );
            return;
        }

        match tagged.signal {
            MediaSignal::Loaded => {
                if self.state == PlaybackState::Loading {
                    if let Err(e) = self.start_playing() {
                        self.fail(e.to_string());
                    }
                }
            }
            MediaSignal::Ended => {
                if matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
                    if let Some(binding) = self.binding.take() {
                        let url = binding.url.clone();
                        drop(binding);
                        self.set_state(PlaybackState::Idle);
                        self.emit(PlaybackEvent::PlaybackEnded { url });
                    }
                }
            }
            MediaSignal::Failed(message) => self.fail(message),
        }
    }

    fn fail(&mut self, message: String) {
        warn!(%message, "Media playback failed");
        self.release();
        self.emit(PlaybackEvent::Error { message });
        self.set_state(PlaybackState::Idle);
    }

    // ===== State Queries =====

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Locator of the current binding, if any
    pub fn current_url(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.url.as_str())
    }

    /// Current binding generation (0 before the first bind)
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ===== Events =====

    /// Take all queued events
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    fn emit(&mut self, event: PlaybackEvent) {
        self.pending_events.push(event);
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            self.state = state;
            self.emit(PlaybackEvent::StateChanged { state });
        }
    }
}
