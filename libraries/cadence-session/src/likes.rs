//! Like toggle for a single track
//!
//! Mirrors one row of the liked-songs table. Local state only changes after
//! the store confirms the write.

use crate::busy::InFlight;
use crate::dispatcher::{Gate, GatedDispatcher};
use crate::entitlement::EntitlementContext;
use crate::error::Result;
use cadence_core::{Navigator, Notifier, RecordStore, TrackId, UserId};
use cadence_storage::liked;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const LIKED_MESSAGE: &str = "Liked!";

/// Outcome of a toggle request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeOutcome {
    Liked,
    Unliked,
    /// Not signed in; the sign-in prompt was opened
    AuthRequired,
    /// Identity still unknown after the wait timed out
    Deferred,
    /// Another toggle is in flight
    Busy,
    /// The toggle was disposed while the request ran
    Cancelled,
    /// The store rejected the change; carries the user-facing message
    Failed(String),
}

pub struct LikeToggle {
    track_id: TrackId,
    dispatcher: GatedDispatcher,
    entitlement: EntitlementContext,
    store: Arc<dyn RecordStore>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    liked: watch::Sender<bool>,
    in_flight: AtomicBool,
    cancel: CancellationToken,
}

impl LikeToggle {
    pub fn new(
        track_id: TrackId,
        dispatcher: GatedDispatcher,
        entitlement: EntitlementContext,
        store: Arc<dyn RecordStore>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        cancel: CancellationToken,
    ) -> Self {
        let (liked, _) = watch::channel(false);
        Self {
            track_id,
            dispatcher,
            entitlement,
            store,
            navigator,
            notifier,
            liked,
            in_flight: AtomicBool::new(false),
            cancel,
        }
    }

    pub fn track_id(&self) -> &TrackId {
        &self.track_id
    }

    pub fn is_liked(&self) -> bool {
        *self.liked.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.liked.subscribe()
    }

    /// Whether a toggle is currently running
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Fetch the current membership for the signed-in user
    ///
    /// Anonymous users always see the track as not liked.
    pub async fn load(&self) -> Result<bool> {
        let Some(user_id) = self.entitlement.snapshot().user_id().cloned() else {
            self.liked.send_replace(false);
            return Ok(false);
        };

        let liked = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Ok(self.is_liked()),
            liked = liked::is_liked(self.store.as_ref(), &user_id, &self.track_id) => liked?,
        };

        self.liked.send_replace(liked);
        Ok(liked)
    }

    /// Keep the liked flag in step with the signed-in user
    ///
    /// Reloads whenever the user id changes, so a sign-out or user switch
    /// never shows the previous user's flag. Returns once disposed.
    pub async fn follow_identity(&self) {
        let mut snapshots = self.entitlement.subscribe();
        let mut loaded_for: Option<Option<UserId>> = None;

        loop {
            let user_id = snapshots.borrow_and_update().user_id().cloned();
            if loaded_for.as_ref() != Some(&user_id) {
                if let Err(e) = self.load().await {
                    warn!(track_id = %self.track_id, error = %e, "Failed to load like state");
                }
                loaded_for = Some(user_id);
            }

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return,
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }
    }

    /// Like the track if it is not liked, otherwise unlike it
    pub async fn toggle(&self) -> LikeOutcome {
        let Some(_in_flight) = InFlight::acquire(&self.in_flight) else {
            return LikeOutcome::Busy;
        };

        let user_id = match self.dispatcher.gate(false).await {
            Gate::Allowed(user_id) => user_id,
            Gate::AuthRequired => return LikeOutcome::AuthRequired,
            Gate::SubscriptionRequired | Gate::Deferred => return LikeOutcome::Deferred,
        };

        let result = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                debug!(track_id = %self.track_id, "Like toggle cancelled");
                return LikeOutcome::Cancelled;
            }
            result = self.flip(&user_id) => result,
        };

        let outcome = match result {
            Ok(true) => {
                self.liked.send_replace(true);
                self.notifier.success(LIKED_MESSAGE);
                LikeOutcome::Liked
            }
            Ok(false) => {
                self.liked.send_replace(false);
                LikeOutcome::Unliked
            }
            Err(e) => {
                warn!(track_id = %self.track_id, error = %e, "Failed to toggle like");
                let message = e.user_message();
                self.notifier.error(&message);
                LikeOutcome::Failed(message)
            }
        };

        self.navigator.refresh();
        outcome
    }

    /// Returns the new membership
    async fn flip(&self, user_id: &UserId) -> cadence_core::Result<bool> {
        let store = self.store.as_ref();
        if liked::is_liked(store, user_id, &self.track_id).await? {
            liked::unlike(store, user_id, &self.track_id).await?;
            Ok(false)
        } else {
            liked::like(store, user_id, &self.track_id).await?;
            Ok(true)
        }
    }

    /// Cancel any in-flight request
    pub fn dispose(&self) {
        self.cancel.cancel();
    }
}

impl Drop for LikeToggle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
