//! Timer-driven media backend
//!
//! "Plays" every locator for a fixed length using `tokio::time`, with no
//! audio output. Used by the command-line client and by tests, where a
//! paused clock makes track ends deterministic.

use crate::backend::{MediaBackend, MediaHandle, MediaSignal, SignalSender};
use crate::error::{PlaybackError, Result};
use crate::types::LoadOptions;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    Stopped,
    Playing,
    Paused,
    Unloaded,
}

/// Simulated backend with a fixed track length
#[derive(Debug)]
pub struct SimulatedBackend {
    track_length: Duration,
    load_delay: Duration,
    failing: Mutex<HashSet<String>>,
    loads: Arc<Mutex<Vec<String>>>,
    live: Arc<AtomicUsize>,
}

impl SimulatedBackend {
    pub fn new(track_length: Duration) -> Self {
        Self {
            track_length,
            load_delay: Duration::from_millis(10),
            failing: Mutex::new(HashSet::new()),
            loads: Arc::new(Mutex::new(Vec::new())),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Time between `load` and the `Loaded` signal
    pub fn with_load_delay(mut self, load_delay: Duration) -> Self {
        self.load_delay = load_delay;
        self
    }

    /// Make loads of `url` report `Failed` instead of `Loaded`
    pub fn fail_url(&self, url: impl Into<String>) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(url.into());
        }
    }

    /// Every locator loaded so far, in order
    pub fn loads(&self) -> Vec<String> {
        self.loads.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Number of handles not yet unloaded
    pub fn live_handles(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl MediaBackend for SimulatedBackend {
    fn load(
        &self,
        url: &str,
        options: &LoadOptions,
        signals: SignalSender,
    ) -> Result<Box<dyn MediaHandle>> {
        if url.is_empty() {
            return Err(PlaybackError::Load {
                url: String::new(),
                reason: "empty locator".to_string(),
            });
        }

        debug!(url, format = %options.format, volume = options.volume, "Simulating load");
        if let Ok(mut loads) = self.loads.lock() {
            loads.push(url.to_string());
        }
        self.live.fetch_add(1, Ordering::SeqCst);

        let fails = self
            .failing
            .lock()
            .map(|f| f.contains(url))
            .unwrap_or(false);
        let (control, transport) = watch::channel(Transport::Stopped);

        tokio::spawn(run_media(
            url.to_string(),
            self.load_delay,
            self.track_length,
            fails,
            transport,
            signals,
        ));

        Ok(Box::new(SimulatedHandle {
            control,
            live: self.live.clone(),
            unloaded: false,
        }))
    }
}

async fn run_media(
    url: String,
    load_delay: Duration,
    length: Duration,
    fails: bool,
    mut transport: watch::Receiver<Transport>,
    signals: SignalSender,
) {
    tokio::select! {
        () = tokio::time::sleep(load_delay) => {}
        _ = transport.wait_for(|t| *t == Transport::Unloaded) => return,
    }

    if fails {
        signals.send(MediaSignal::Failed(format!("Failed to load {url}")));
        return;
    }
    if !signals.send(MediaSignal::Loaded) {
        return;
    }

    let mut remaining = length;
    loop {
        let current = *transport.borrow_and_update();
        match current {
            Transport::Unloaded => return,
            Transport::Playing => {
                let started = Instant::now();
                tokio::select! {
                    () = tokio::time::sleep(remaining) => {
                        signals.send(MediaSignal::Ended);
                        return;
                    }
                    changed = transport.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        remaining = remaining.saturating_sub(started.elapsed());
                    }
                }
            }
            Transport::Stopped | Transport::Paused => {
                if transport.changed().await.is_err() {
                    return;
                }
            }
        }
    }
}

struct SimulatedHandle {
    control: watch::Sender<Transport>,
    live: Arc<AtomicUsize>,
    unloaded: bool,
}

impl MediaHandle for SimulatedHandle {
    fn play(&mut self) -> Result<()> {
        self.control.send_replace(Transport::Playing);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.control.send_replace(Transport::Paused);
        Ok(())
    }

    fn set_volume(&mut self, _volume: f32) {}

    fn unload(&mut self) {
        if !self.unloaded {
            self.unloaded = true;
            self.control.send_replace(Transport::Unloaded);
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for SimulatedHandle {
    fn drop(&mut self) {
        self.unload();
    }
}
