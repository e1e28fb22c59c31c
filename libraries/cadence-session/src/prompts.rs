//! Prompt visibility stores
//!
//! One boolean per prompt (sign-in, subscribe, upload), observable so a
//! surface can render it.

use cadence_core::{IdentityProvider, Navigator, SessionState};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Auth,
    Subscribe,
    Upload,
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PromptKind::Auth => "auth",
            PromptKind::Subscribe => "subscribe",
            PromptKind::Upload => "upload",
        };
        f.write_str(name)
    }
}

/// Visibility of a single prompt
#[derive(Debug, Clone)]
pub struct PromptStore {
    kind: PromptKind,
    open: Arc<watch::Sender<bool>>,
}

impl PromptStore {
    pub fn new(kind: PromptKind) -> Self {
        let (open, _) = watch::channel(false);
        Self {
            kind,
            open: Arc::new(open),
        }
    }

    pub fn kind(&self) -> PromptKind {
        self.kind
    }

    pub fn open(&self) {
        debug!(prompt = %self.kind, "Opening prompt");
        self.open.send_replace(true);
    }

    pub fn close(&self) {
        self.open.send_replace(false);
    }

    pub fn is_open(&self) -> bool {
        *self.open.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.open.subscribe()
    }
}

/// All prompts of a session
#[derive(Debug, Clone)]
pub struct Prompts {
    pub auth: PromptStore,
    pub subscribe: PromptStore,
    pub upload: PromptStore,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            auth: PromptStore::new(PromptKind::Auth),
            subscribe: PromptStore::new(PromptKind::Subscribe),
            upload: PromptStore::new(PromptKind::Upload),
        }
    }
}

impl Prompts {
    pub fn get(&self, kind: PromptKind) -> &PromptStore {
        match kind {
            PromptKind::Auth => &self.auth,
            PromptKind::Subscribe => &self.subscribe,
            PromptKind::Upload => &self.upload,
        }
    }

    /// Currently open prompts
    pub fn open_prompts(&self) -> Vec<PromptKind> {
        [PromptKind::Auth, PromptKind::Subscribe, PromptKind::Upload]
            .into_iter()
            .filter(|kind| self.get(*kind).is_open())
            .collect()
    }
}

/// Close the sign-in prompt and refresh once a session appears
pub fn spawn_auth_watcher(
    auth: PromptStore,
    identity: Arc<dyn IdentityProvider>,
    navigator: Arc<dyn Navigator>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut rx = identity.subscribe();
        let mut was_signed_in = matches!(*rx.borrow_and_update(), SessionState::SignedIn(_));
        if was_signed_in {
            auth.close();
        }

        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                changed = rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }

            let signed_in = matches!(*rx.borrow_and_update(), SessionState::SignedIn(_));
            if signed_in && !was_signed_in {
                debug!("Session started, closing sign-in prompt");
                navigator.refresh();
                auth.close();
            }
            was_signed_in = signed_in;
        }
    })
}
