//! Local identity provider
//!
//! Holds the session in a `watch` channel. Starts in `Loading` until a
//! sign-in or sign-out is recorded, matching a provider that is still
//! restoring a persisted session.

use async_trait::async_trait;
use cadence_core::{
    error::Result, AuthSession, IdentityProvider, SessionState, UserId,
};
use tokio::sync::watch;
use tracing::info;

#[derive(Debug)]
pub struct LocalIdentity {
    state: watch::Sender<SessionState>,
}

impl Default for LocalIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalIdentity {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self { state }
    }

    /// Record an authenticated session
    pub fn sign_in(&self, session: AuthSession) {
        info!(user_id = %session.user_id, "Signed in");
        self.state.send_replace(SessionState::SignedIn(session));
    }

    /// Sign in with a generated access token
    pub fn sign_in_as(&self, user_id: UserId, email: Option<String>) {
        self.sign_in(AuthSession {
            user_id,
            email,
            access_token: uuid::Uuid::new_v4().to_string(),
        });
    }

    /// Resolve a `Loading` provider to signed out
    pub fn set_signed_out(&self) {
        self.state.send_replace(SessionState::SignedOut);
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    async fn sign_out(&self) -> Result<()> {
        if let Some(session) = self.state.borrow().session() {
            info!(user_id = %session.user_id, "Signed out");
        }
        self.set_signed_out();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_loading_and_notifies_subscribers() {
        let identity = LocalIdentity::new();
        let mut rx = identity.subscribe();
        assert_eq!(*rx.borrow(), SessionState::Loading);

        identity.sign_in_as(UserId::new("u1"), None);
        rx.changed().await.unwrap();
        assert_eq!(
            rx.borrow().session().map(|s| s.user_id.clone()),
            Some(UserId::new("u1"))
        );

        identity.sign_out().await.unwrap();
        assert_eq!(identity.current(), SessionState::SignedOut);
    }
}
