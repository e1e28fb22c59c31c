//! Media backend abstraction
//!
//! A backend decodes and outputs one locator per handle. Handles report
//! asynchronous progress through a `SignalSender` that is tagged with the
//! binding generation it was issued for, so the engine can tell signals
//! of the current binding from leftovers of a replaced one.

use crate::error::Result;
use crate::types::LoadOptions;
use tokio::sync::mpsc;

/// Asynchronous progress reported by a media handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSignal {
    /// Media is ready to play
    Loaded,
    /// Playback reached the end of the media
    Ended,
    /// Loading or decoding failed
    Failed(String),
}

/// A signal together with the binding generation that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedSignal {
    pub generation: u64,
    pub signal: MediaSignal,
}

/// Sending half handed to a backend for one binding
#[derive(Debug, Clone)]
pub struct SignalSender {
    generation: u64,
    tx: mpsc::UnboundedSender<TaggedSignal>,
}

impl SignalSender {
    pub(crate) fn new(generation: u64, tx: mpsc::UnboundedSender<TaggedSignal>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report a signal; returns false once the engine is gone
    pub fn send(&self, signal: MediaSignal) -> bool {
        self.tx
            .send(TaggedSignal {
                generation: self.generation,
                signal,
            })
            .is_ok()
    }
}

/// Platform audio primitive
///
/// `load` binds a locator and returns immediately; readiness, completion,
/// and failure arrive later through `signals`.
pub trait MediaBackend: Send + Sync {
    fn load(
        &self,
        url: &str,
        options: &LoadOptions,
        signals: SignalSender,
    ) -> Result<Box<dyn MediaHandle>>;
}

/// Transport controls for one loaded locator
pub trait MediaHandle: Send {
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn set_volume(&mut self, volume: f32);

    /// Release the underlying resource. Must be idempotent.
    fn unload(&mut self);
}
