//! Gated action dispatcher
//!
//! Decides whether a user action may proceed given the current
//! entitlement. Unmet requirements open the matching prompt instead of
//! failing.

use crate::entitlement::{EntitlementContext, Identity};
use crate::prompts::Prompts;
use cadence_core::{TrackId, UserId};
use cadence_playback::PlayerStore;
use std::time::Duration;
use tracing::{debug, info};

/// Which actions require an active subscription
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    pub require_subscription_for_playback: bool,
    pub require_subscription_for_uploads: bool,
}

/// Outcome of an entitlement check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// Proceed on behalf of this user
    Allowed(UserId),
    /// Not signed in; the sign-in prompt was opened
    AuthRequired,
    /// Signed in without a subscription; the subscribe prompt was opened
    SubscriptionRequired,
    /// Entitlement was still unknown when the wait timed out
    Deferred,
}

/// Outcome of a play request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    AuthRequired,
    SubscriptionRequired,
    Deferred,
}

impl From<Gate> for PlayOutcome {
    fn from(gate: Gate) -> Self {
        match gate {
            Gate::Allowed(_) => PlayOutcome::Started,
            Gate::AuthRequired => PlayOutcome::AuthRequired,
            Gate::SubscriptionRequired => PlayOutcome::SubscriptionRequired,
            Gate::Deferred => PlayOutcome::Deferred,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatedDispatcher {
    entitlement: EntitlementContext,
    prompts: Prompts,
    player: PlayerStore,
    policy: AccessPolicy,
    timeout: Duration,
}

impl GatedDispatcher {
    pub fn new(
        entitlement: EntitlementContext,
        prompts: Prompts,
        player: PlayerStore,
        policy: AccessPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            entitlement,
            prompts,
            player,
            policy,
            timeout,
        }
    }

    pub fn policy(&self) -> AccessPolicy {
        self.policy
    }

    /// Check entitlement, opening a prompt when a requirement is unmet
    ///
    /// Waits up to the configured timeout while entitlement is unknown.
    pub async fn gate(&self, needs_subscription: bool) -> Gate {
        let Some(snapshot) = self
            .entitlement
            .resolved(needs_subscription, self.timeout)
            .await
        else {
            info!("Entitlement unresolved, deferring action");
            return Gate::Deferred;
        };

        let subscribed = snapshot.has_subscription();
        let user_id = match snapshot.identity {
            Identity::SignedIn(user_id) => user_id,
            Identity::Anonymous | Identity::Unknown => {
                self.prompts.auth.open();
                return Gate::AuthRequired;
            }
        };

        if needs_subscription && !subscribed {
            self.prompts.subscribe.open();
            return Gate::SubscriptionRequired;
        }

        Gate::Allowed(user_id)
    }

    /// Play `track` with `list` as the new playback context
    ///
    /// Leaves the playlist untouched unless the gate allows the action.
    pub async fn request_play(&self, track: &TrackId, list: &[TrackId]) -> PlayOutcome {
        let gate = self
            .gate(self.policy.require_subscription_for_playback)
            .await;

        if let Gate::Allowed(user_id) = &gate {
            debug!(user_id = %user_id, track_id = %track, len = list.len(), "Starting playback");
            self.player.set_active(track.clone());
            self.player.set_playlist(list.to_vec());
        }

        gate.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entitlement::{EntitlementSnapshot, SubscriptionState};
    use cadence_core::{Subscription, SubscriptionStatus};
    use cadence_playback::PlaylistState;

    fn dispatcher(policy: AccessPolicy) -> (GatedDispatcher, EntitlementContext, Prompts, PlayerStore) {
        let entitlement = EntitlementContext::new();
        let prompts = Prompts::default();
        let player = PlayerStore::new();
        let dispatcher = GatedDispatcher::new(
            entitlement.clone(),
            prompts.clone(),
            player.clone(),
            policy,
            Duration::from_secs(5),
        );
        (dispatcher, entitlement, prompts, player)
    }

    fn signed_in(subscription: SubscriptionState) -> EntitlementSnapshot {
        EntitlementSnapshot {
            identity: Identity::SignedIn(UserId::new("u1")),
            details: None,
            subscription,
        }
    }

    fn list() -> Vec<TrackId> {
        vec![TrackId::new("x"), TrackId::new("y")]
    }

    #[tokio::test]
    async fn anonymous_play_opens_auth_prompt() {
        let (dispatcher, entitlement, prompts, player) = dispatcher(AccessPolicy::default());
        entitlement.publish(EntitlementSnapshot::anonymous());

        let outcome = dispatcher.request_play(&TrackId::new("x"), &list()).await;

        assert_eq!(outcome, PlayOutcome::AuthRequired);
        assert!(prompts.auth.is_open());
        assert_eq!(player.snapshot(), PlaylistState::default());
    }

    #[tokio::test]
    async fn missing_subscription_opens_subscribe_prompt_when_required() {
        let (dispatcher, entitlement, prompts, player) = dispatcher(AccessPolicy {
            require_subscription_for_playback: true,
            ..AccessPolicy::default()
        });
        entitlement.publish(signed_in(SubscriptionState::None));

        let outcome = dispatcher.request_play(&TrackId::new("x"), &list()).await;

        assert_eq!(outcome, PlayOutcome::SubscriptionRequired);
        assert!(prompts.subscribe.is_open());
        assert!(!prompts.auth.is_open());
        assert_eq!(player.snapshot(), PlaylistState::default());
    }

    #[tokio::test]
    async fn signed_in_play_sets_active_and_playlist() {
        let (dispatcher, entitlement, prompts, player) = dispatcher(AccessPolicy::default());
        entitlement.publish(signed_in(SubscriptionState::None));

        let outcome = dispatcher.request_play(&TrackId::new("y"), &list()).await;

        assert_eq!(outcome, PlayOutcome::Started);
        assert!(prompts.open_prompts().is_empty());
        assert_eq!(
            player.snapshot(),
            PlaylistState {
                ids: list(),
                active_id: Some(TrackId::new("y")),
            }
        );
    }

    #[tokio::test]
    async fn subscribed_user_passes_subscription_gate() {
        let (dispatcher, entitlement, _prompts, _player) = dispatcher(AccessPolicy {
            require_subscription_for_playback: true,
            ..AccessPolicy::default()
        });
        entitlement.publish(signed_in(SubscriptionState::Active(Subscription {
            id: "sub".to_string(),
            user_id: UserId::new("u1"),
            status: SubscriptionStatus::Trialing,
            price_id: None,
            current_period_end: None,
        })));

        let outcome = dispatcher.request_play(&TrackId::new("x"), &list()).await;
        assert_eq!(outcome, PlayOutcome::Started);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_entitlement_defers_after_timeout() {
        let (dispatcher, _entitlement, prompts, player) = dispatcher(AccessPolicy::default());

        let outcome = dispatcher.request_play(&TrackId::new("x"), &list()).await;

        assert_eq!(outcome, PlayOutcome::Deferred);
        assert!(prompts.open_prompts().is_empty());
        assert_eq!(player.snapshot(), PlaylistState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn gate_waits_for_late_resolution() {
        let (dispatcher, entitlement, _prompts, player) = dispatcher(AccessPolicy::default());

        let publisher = entitlement.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            publisher.publish(signed_in(SubscriptionState::Unknown));
        });

        let outcome = dispatcher.request_play(&TrackId::new("x"), &list()).await;
        assert_eq!(outcome, PlayOutcome::Started);
        assert_eq!(player.active_id(), Some(TrackId::new("x")));
    }
}
