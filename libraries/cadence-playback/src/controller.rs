//! Player controller
//!
//! A single task owns the playback engine and reacts, in arrival order, to
//! playlist changes, media signals, catalog resolutions, and transport
//! commands. Callers talk to it through a cloneable [`PlayerHandle`].

use crate::engine::PlaybackEngine;
use crate::error::{PlaybackError, Result};
use crate::events::PlaybackEvent;
use crate::playlist::{PlayerStore, PlaylistState};
use crate::types::PlaybackState;
use cadence_core::{Notifier, Track, TrackCatalog, TrackId};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 64;

/// Transport commands accepted by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    TogglePlayPause,
    SetVolume(f32),
    ToggleMute,
}

/// Observable player status
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerStatus {
    pub state: PlaybackState,
    /// Track the engine is bound to (or resolving)
    pub active_id: Option<TrackId>,
    /// Resolved metadata of the bound track
    pub track: Option<Track>,
    pub volume: f32,
    pub muted: bool,
}

/// Result of resolving a track id through the catalog
struct Resolution {
    id: TrackId,
    result: cadence_core::Result<(Track, String)>,
}

/// Handle to a running player controller
///
/// The task stops when every clone is dropped, when the cancellation
/// token fires, or on [`PlayerHandle::shutdown`].
#[derive(Clone)]
pub struct PlayerHandle {
    commands: mpsc::Sender<PlayerCommand>,
    events: broadcast::Sender<PlaybackEvent>,
    status: watch::Receiver<PlayerStatus>,
    cancel: CancellationToken,
    task: Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl PlayerHandle {
    async fn send(&self, command: PlayerCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PlaybackError::ControllerClosed)
    }

    /// Pause, resume, or restart the bound track
    pub async fn toggle_play_pause(&self) -> Result<()> {
        self.send(PlayerCommand::TogglePlayPause).await
    }

    /// Set volume (clamped to 0.0 - 1.0)
    pub async fn set_volume(&self, level: f32) -> Result<()> {
        self.send(PlayerCommand::SetVolume(level)).await
    }

    pub async fn toggle_mute(&self) -> Result<()> {
        self.send(PlayerCommand::ToggleMute).await
    }

    /// Subscribe to playback events from now on
    pub fn events(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Latest published status
    pub fn status(&self) -> PlayerStatus {
        self.status.borrow().clone()
    }

    /// Status change notifications
    pub fn watch_status(&self) -> watch::Receiver<PlayerStatus> {
        self.status.clone()
    }

    /// Stop the controller task and unload the engine
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Player controller task failed");
            }
        }
    }
}

/// Owner of the playback engine
pub struct PlayerController {
    engine: PlaybackEngine,
    store: PlayerStore,
    catalog: Arc<dyn TrackCatalog>,
    notifier: Arc<dyn Notifier>,

    /// Track the engine is bound to or resolving
    current: Option<TrackId>,
    current_track: Option<Track>,
    /// Media URL of the current binding, once resolved
    current_url: Option<String>,
    resolving: Option<JoinHandle<()>>,
    resolutions_tx: mpsc::UnboundedSender<Resolution>,

    events: broadcast::Sender<PlaybackEvent>,
    status: watch::Sender<PlayerStatus>,
}

impl PlayerController {
    /// Start the controller task
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        engine: PlaybackEngine,
        store: PlayerStore,
        catalog: Arc<dyn TrackCatalog>,
        notifier: Arc<dyn Notifier>,
        cancel: CancellationToken,
    ) -> PlayerHandle {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (resolutions_tx, resolutions_rx) = mpsc::unbounded_channel();
        let (status, status_rx) = watch::channel(PlayerStatus {
            volume: engine.volume(),
            muted: engine.is_muted(),
            ..PlayerStatus::default()
        });

        let controller = Self {
            engine,
            store,
            catalog,
            notifier,
            current: None,
            current_track: None,
            current_url: None,
            resolving: None,
            resolutions_tx,
            events: events.clone(),
            status,
        };

        let task = tokio::spawn(controller.run(commands_rx, resolutions_rx, cancel.clone()));

        PlayerHandle {
            commands: commands_tx,
            events,
            status: status_rx,
            cancel,
            task: Arc::new(tokio::sync::Mutex::new(Some(task))),
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<PlayerCommand>,
        mut resolutions: mpsc::UnboundedReceiver<Resolution>,
        cancel: CancellationToken,
    ) {
        let mut playlist = self.store.subscribe();
        info!("Player controller started");

        // Pick up an active track set before the controller started
        let initial = playlist.borrow_and_update().clone();
        self.on_playlist_changed(&initial);

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,

                changed = playlist.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = playlist.borrow_and_update().clone();
                    self.on_playlist_changed(&snapshot);
                }

                Some(tagged) = self.engine.recv_signal() => {
                    self.engine.handle_signal(tagged);
                }

                Some(resolution) = resolutions.recv() => {
                    self.on_resolved(resolution);
                }

                command = commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },
            }

            self.flush();
        }

        if let Some(task) = self.resolving.take() {
            task.abort();
        }
        self.engine.unload();
        self.flush();
        info!("Player controller stopped");
    }

    fn on_playlist_changed(&mut self, snapshot: &PlaylistState) {
        match &snapshot.active_id {
            None => {
                if self.current.take().is_some() {
                    debug!("Active track cleared, unloading");
                }
                self.current_track = None;
                self.current_url = None;
                self.cancel_resolution();
                self.engine.unload();
            }
            Some(id) if self.current.as_ref() != Some(id) => self.resolve(id.clone()),
            Some(_) => {}
        }
    }

    /// Look up `id` in the background, superseding any pending lookup
    fn resolve(&mut self, id: TrackId) {
        self.cancel_resolution();
        self.current = Some(id.clone());
        self.current_track = None;
        self.current_url = None;
        // The previous track stops as soon as a new one is selected
        self.engine.unload();

        let catalog = self.catalog.clone();
        let tx = self.resolutions_tx.clone();
        debug!(track_id = %id, "Resolving active track");

        self.resolving = Some(tokio::spawn(async move {
            let result = match catalog.track(&id).await {
                Ok(track) => catalog.media_url(&track).map(|url| (track, url)),
                Err(e) => Err(e),
            };
            // Receiver only disappears when the controller has stopped
            let _ = tx.send(Resolution { id, result });
        }));
    }

    fn cancel_resolution(&mut self) {
        if let Some(task) = self.resolving.take() {
            task.abort();
        }
    }

    fn on_resolved(&mut self, resolution: Resolution) {
        if self.current.as_ref() != Some(&resolution.id) {
            debug!(track_id = %resolution.id, "Discarding stale resolution");
            return;
        }
        self.resolving = None;

        match resolution.result {
            Ok((track, url)) => {
                info!(track_id = %track.id, title = %track.title, "Playing track");
                self.current_track = Some(track);
                // Load failures are queued as engine events
                let _ = self.engine.bind_and_play(&url);
                self.current_url = Some(url);
            }
            Err(e) => {
                warn!(track_id = %resolution.id, error = %e, "Failed to resolve track");
                self.current_track = None;
                self.current_url = None;
                self.engine.unload();
                let _ = self.events.send(PlaybackEvent::Error {
                    message: e.user_message(),
                });
                self.notifier.error(&e.user_message());
            }
        }
    }

    fn on_command(&mut self, command: PlayerCommand) {
        debug!(?command, "Player command");
        let result = match command {
            PlayerCommand::TogglePlayPause if self.resolving.is_some() => {
                debug!("Track still resolving, ignoring toggle");
                Ok(())
            }
            PlayerCommand::TogglePlayPause => self.engine.toggle_play_pause(),
            PlayerCommand::SetVolume(level) => {
                self.engine.set_volume(level);
                Ok(())
            }
            PlayerCommand::ToggleMute => {
                self.engine.toggle_mute();
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!(error = %e, "Player command failed");
        }
    }

    /// Auto-advance after a completed play-through of the current track
    fn on_ended(&mut self, url: &str) {
        if self.current_url.as_deref() != Some(url) {
            debug!(url, "Ignoring end of a superseded track");
            return;
        }
        let Some(next) = self.store.next() else {
            debug!("Playlist empty, staying idle");
            return;
        };
        // Always rebind, even when the playlist wraps onto the same track
        self.resolve(next);
    }

    /// Publish queued engine events and the resulting status
    fn flush(&mut self) {
        for event in self.engine.drain_events() {
            match &event {
                PlaybackEvent::PlaybackEnded { url } => self.on_ended(url),
                PlaybackEvent::Error { message } => self.notifier.error(message),
                _ => {}
            }
            // No subscribers is fine
            let _ = self.events.send(event);
        }

        let status = PlayerStatus {
            state: self.engine.state(),
            active_id: self.current.clone(),
            track: self.current_track.clone(),
            volume: self.engine.volume(),
            muted: self.engine.is_muted(),
        };
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}
