//! Entitlement context
//!
//! Tracks who is signed in and whether they hold an active subscription.
//! Both halves start `Unknown` and are resolved by a loader task that
//! follows the identity provider.

use cadence_core::{
    IdentityProvider, RecordStore, SessionState, Subscription, UserDetails, UserId,
};
use cadence_storage::users;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Who the current user is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Identity {
    /// The identity provider has not decided yet
    #[default]
    Unknown,
    Anonymous,
    SignedIn(UserId),
}

/// Paid entitlement of the current user
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SubscriptionState {
    /// Not loaded yet
    #[default]
    Unknown,
    None,
    Active(Subscription),
}

/// Point-in-time view of identity and subscription
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntitlementSnapshot {
    pub identity: Identity,
    pub details: Option<UserDetails>,
    pub subscription: SubscriptionState,
}

impl EntitlementSnapshot {
    pub fn anonymous() -> Self {
        Self {
            identity: Identity::Anonymous,
            details: None,
            subscription: SubscriptionState::None,
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match &self.identity {
            Identity::SignedIn(id) => Some(id),
            _ => None,
        }
    }

    pub fn has_subscription(&self) -> bool {
        matches!(self.subscription, SubscriptionState::Active(_))
    }

    /// Whether identity is decided
    pub fn identity_known(&self) -> bool {
        self.identity != Identity::Unknown
    }

    /// Whether identity and (for signed-in users) subscription are decided
    pub fn is_resolved(&self) -> bool {
        match self.identity {
            Identity::Unknown => false,
            Identity::Anonymous => true,
            Identity::SignedIn(_) => self.subscription != SubscriptionState::Unknown,
        }
    }
}

/// Shared, observable entitlement state
#[derive(Debug, Clone)]
pub struct EntitlementContext {
    state: Arc<watch::Sender<EntitlementSnapshot>>,
}

impl Default for EntitlementContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EntitlementContext {
    /// Create a context with everything `Unknown`
    pub fn new() -> Self {
        let (state, _) = watch::channel(EntitlementSnapshot::default());
        Self {
            state: Arc::new(state),
        }
    }

    pub fn snapshot(&self) -> EntitlementSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EntitlementSnapshot> {
        self.state.subscribe()
    }

    /// Replace the current snapshot
    pub fn publish(&self, snapshot: EntitlementSnapshot) {
        self.state.send_replace(snapshot);
    }

    /// Wait until the parts a decision needs are known
    ///
    /// Returns `None` if that takes longer than `timeout`.
    pub async fn resolved(
        &self,
        needs_subscription: bool,
        timeout: Duration,
    ) -> Option<EntitlementSnapshot> {
        let mut rx = self.state.subscribe();
        let wait = rx.wait_for(|s| {
            if needs_subscription {
                s.is_resolved()
            } else {
                s.identity_known()
            }
        });

        let result = match tokio::time::timeout(timeout, wait).await {
            Ok(Ok(snapshot)) => Some(snapshot.clone()),
            Ok(Err(_)) => None,
            Err(_) => {
                debug!(?timeout, "Entitlement still unknown after timeout");
                None
            }
        };
        result
    }
}

/// Compute the snapshot for an identity state
///
/// Profile and subscription lookups run concurrently; a failed lookup is
/// logged and treated as absent.
pub async fn load_snapshot(store: &dyn RecordStore, state: &SessionState) -> EntitlementSnapshot {
    let session = match state {
        SessionState::Loading => return EntitlementSnapshot::default(),
        SessionState::SignedOut => return EntitlementSnapshot::anonymous(),
        SessionState::SignedIn(session) => session,
    };
    let user_id = &session.user_id;

    let (details, subscription) = tokio::join!(
        users::details(store, user_id),
        users::active_subscription(store, user_id)
    );

    let details = details.unwrap_or_else(|e| {
        warn!(user_id = %user_id, error = %e, "Failed to load user details");
        None
    });
    let subscription = match subscription {
        Ok(Some(subscription)) => SubscriptionState::Active(subscription),
        Ok(None) => SubscriptionState::None,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Failed to load subscription");
            SubscriptionState::None
        }
    };

    EntitlementSnapshot {
        identity: Identity::SignedIn(user_id.clone()),
        details,
        subscription,
    }
}

/// Keep `context` in sync with `identity` until cancelled
pub fn spawn_loader(
    context: EntitlementContext,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn RecordStore>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut rx = identity.subscribe();

        loop {
            let state = rx.borrow_and_update().clone();

            if let SessionState::SignedIn(session) = &state {
                // Identity is known right away; subscription follows
                context.publish(EntitlementSnapshot {
                    identity: Identity::SignedIn(session.user_id.clone()),
                    details: None,
                    subscription: SubscriptionState::Unknown,
                });
            }

            let snapshot = tokio::select! {
                () = cancel.cancelled() => return,
                snapshot = load_snapshot(store.as_ref(), &state) => snapshot,
            };

            // A newer identity arrived while loading; its pass will publish
            if !rx.has_changed().unwrap_or(false) {
                info!(
                    signed_in = snapshot.user_id().is_some(),
                    subscribed = snapshot.has_subscription(),
                    "Entitlement updated"
                );
                context.publish(snapshot);
            }

            tokio::select! {
                () = cancel.cancelled() => return,
                changed = rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{AuthSession, SubscriptionStatus};
    use cadence_storage::{LocalIdentity, MemoryRecordStore};

    fn signed_in(user: &str) -> SessionState {
        SessionState::SignedIn(AuthSession {
            user_id: UserId::new(user),
            email: None,
            access_token: "token".to_string(),
        })
    }

    #[tokio::test]
    async fn snapshot_for_signed_out_is_anonymous() {
        let store = MemoryRecordStore::new();
        let snapshot = load_snapshot(&store, &SessionState::SignedOut).await;
        assert_eq!(snapshot, EntitlementSnapshot::anonymous());
        assert!(snapshot.is_resolved());
    }

    #[tokio::test]
    async fn snapshot_loads_active_subscription() {
        let store = MemoryRecordStore::new();
        users::upsert_subscription(
            &store,
            &Subscription {
                id: "sub_1".to_string(),
                user_id: UserId::new("u1"),
                status: SubscriptionStatus::Active,
                price_id: None,
                current_period_end: None,
            },
        )
        .await
        .unwrap();

        let snapshot = load_snapshot(&store, &signed_in("u1")).await;
        assert!(snapshot.has_subscription());
        assert_eq!(snapshot.user_id(), Some(&UserId::new("u1")));
    }

    #[tokio::test]
    async fn lookup_failures_degrade_to_absent() {
        let store = MemoryRecordStore::new();
        store.set_offline(true);

        let snapshot = load_snapshot(&store, &signed_in("u1")).await;
        assert_eq!(snapshot.subscription, SubscriptionState::None);
        assert!(snapshot.details.is_none());
        assert!(snapshot.is_resolved());
    }

    #[tokio::test(start_paused = true)]
    async fn resolved_times_out_while_unknown() {
        let context = EntitlementContext::new();
        assert!(context
            .resolved(false, Duration::from_millis(100))
            .await
            .is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn loader_follows_identity() {
        let context = EntitlementContext::new();
        let identity = Arc::new(LocalIdentity::new());
        let store = Arc::new(MemoryRecordStore::new());
        let cancel = CancellationToken::new();
        let task = spawn_loader(context.clone(), identity.clone(), store, cancel.clone());

        identity.set_signed_out();
        let snapshot = context.resolved(true, Duration::from_secs(1)).await.unwrap();
        assert_eq!(snapshot.identity, Identity::Anonymous);

        identity.sign_in_as(UserId::new("u1"), None);
        let mut rx = context.subscribe();
        rx.wait_for(|s| s.user_id().is_some() && s.is_resolved())
            .await
            .unwrap();
        assert_eq!(context.snapshot().subscription, SubscriptionState::None);

        cancel.cancel();
        task.await.unwrap();
    }
}
