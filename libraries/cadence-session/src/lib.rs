//! Cadence - Session
//!
//! Everything between the user's actions and the playback/storage layers:
//! - Entitlement context (identity + subscription, each possibly unknown)
//! - Gated action dispatch: play, like, upload open the right prompt when
//!   the user may not act
//! - Like toggles, debounced search, and the upload pipeline
//! - Configuration via `cadence.toml` and `CADENCE_*` variables
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_core::TrackId;
//! use cadence_session::{open_storage, Collaborators, PlayOutcome, Session, SessionConfig};
//! # use cadence_core::{IdentityProvider, Navigator, Notifier};
//! # use cadence_playback::SimulatedBackend;
//! # use std::sync::Arc;
//! # use std::time::Duration;
//!
//! # async fn example(
//! #     identity: Arc<dyn IdentityProvider>,
//! #     navigator: Arc<dyn Navigator>,
//! #     notifier: Arc<dyn Notifier>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::load(None)?;
//! let (store, blobs) = open_storage(&config.storage).await?;
//!
//! let session = Session::start(
//!     config,
//!     Collaborators {
//!         store,
//!         blobs,
//!         identity,
//!         backend: Arc::new(SimulatedBackend::new(Duration::from_secs(30))),
//!         navigator,
//!         notifier,
//!     },
//! )?;
//!
//! let list = [TrackId::new("a"), TrackId::new("b")];
//! if session.request_play(&list[0], &list).await == PlayOutcome::AuthRequired {
//!     assert!(session.prompts().auth.is_open());
//! }
//! session.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod busy;
pub mod config;
mod dispatcher;
mod entitlement;
mod error;
mod likes;
mod prompts;
mod search;
mod session;
mod upload;

#[cfg(test)]
mod test_support;

pub use config::SessionConfig;
pub use dispatcher::{AccessPolicy, Gate, GatedDispatcher, PlayOutcome};
pub use entitlement::{
    load_snapshot, spawn_loader, EntitlementContext, EntitlementSnapshot, Identity,
    SubscriptionState,
};
pub use error::{Result, SessionError};
pub use likes::{LikeOutcome, LikeToggle};
pub use prompts::{spawn_auth_watcher, PromptKind, PromptStore, Prompts};
pub use search::{search_href, SearchController, SEARCH_PATH, TITLE_PARAM};
pub use session::{open_storage, Collaborators, Session};
pub use upload::{UploadForm, UploadOutcome, Uploader};
