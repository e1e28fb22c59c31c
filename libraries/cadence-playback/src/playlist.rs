//! Session-wide playlist state
//!
//! `PlayerStore` is a cloneable handle over a `watch` channel. Mutations are
//! synchronous and visible to every subscriber as soon as they return.

use cadence_core::TrackId;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Ordered track ids of the current playback context plus the active one
///
/// `active_id` is expected to be a member of `ids` but this is not
/// enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistState {
    pub ids: Vec<TrackId>,
    pub active_id: Option<TrackId>,
}

impl PlaylistState {
    fn position(&self) -> Option<usize> {
        let active = self.active_id.as_ref()?;
        self.ids.iter().position(|id| id == active)
    }

    /// Id after the active one, wrapping past the end
    ///
    /// Falls back to the first id when the active id is unset or not in the
    /// list. `None` only when the list is empty.
    pub fn next_id(&self) -> Option<&TrackId> {
        if self.ids.is_empty() {
            return None;
        }
        let index = self.position().map_or(0, |i| (i + 1) % self.ids.len());
        self.ids.get(index)
    }

    /// Id before the active one, wrapping past the start
    ///
    /// Falls back to the last id when the active id is unset or not in the
    /// list.
    pub fn previous_id(&self) -> Option<&TrackId> {
        let len = self.ids.len();
        if len == 0 {
            return None;
        }
        let index = match self.position() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.ids.get(index)
    }
}

/// Shared playlist container
#[derive(Debug, Clone)]
pub struct PlayerStore {
    state: Arc<watch::Sender<PlaylistState>>,
}

impl Default for PlayerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerStore {
    /// Create an empty store
    pub fn new() -> Self {
        let (state, _) = watch::channel(PlaylistState::default());
        Self {
            state: Arc::new(state),
        }
    }

    /// Set the active track; membership in `ids` is not checked
    pub fn set_active(&self, id: TrackId) {
        debug!(track_id = %id, "Setting active track");
        self.state.send_modify(|s| s.active_id = Some(id));
    }

    /// Replace the playlist wholesale, leaving the active id untouched
    pub fn set_playlist(&self, ids: Vec<TrackId>) {
        debug!(len = ids.len(), "Replacing playlist");
        self.state.send_modify(|s| s.ids = ids);
    }

    /// Clear both the playlist and the active id
    pub fn reset(&self) {
        debug!("Resetting playlist");
        self.state.send_modify(|s| *s = PlaylistState::default());
    }

    /// Advance to the next track, wrapping to the first
    ///
    /// Returns the new active id; no-op (returning `None`) on an empty list.
    pub fn next(&self) -> Option<TrackId> {
        self.advance(PlaylistState::next_id)
    }

    /// Step back to the previous track, wrapping to the last
    pub fn previous(&self) -> Option<TrackId> {
        self.advance(PlaylistState::previous_id)
    }

    fn advance(&self, pick: fn(&PlaylistState) -> Option<&TrackId>) -> Option<TrackId> {
        let mut chosen = None;
        self.state.send_if_modified(|s| match pick(s).cloned() {
            Some(id) => {
                s.active_id = Some(id.clone());
                chosen = Some(id);
                true
            }
            None => false,
        });
        chosen
    }

    /// Current state
    pub fn snapshot(&self) -> PlaylistState {
        self.state.borrow().clone()
    }

    pub fn active_id(&self) -> Option<TrackId> {
        self.state.borrow().active_id.clone()
    }

    /// Change notifications; the receiver starts at the current state
    pub fn subscribe(&self) -> watch::Receiver<PlaylistState> {
        self.state.subscribe()
    }
}
