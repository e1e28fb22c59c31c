//! Session wiring
//!
//! A [`Session`] owns every shared container (playlist, entitlement,
//! prompts) and background task of one application session, and hands out
//! the per-view controllers.

use crate::config::{SessionConfig, StorageSettings};
use crate::dispatcher::{AccessPolicy, GatedDispatcher, PlayOutcome};
use crate::entitlement::{spawn_loader, EntitlementContext};
use crate::error::Result;
use crate::likes::LikeToggle;
use crate::prompts::{spawn_auth_watcher, Prompts};
use crate::search::SearchController;
use crate::upload::Uploader;
use cadence_core::{
    BlobStorage, CadenceError, IdentityProvider, Navigator, Notifier, RecordStore, Track,
    TrackCatalog, TrackId, IMAGES_BUCKET, SONGS_BUCKET,
};
use cadence_playback::{
    LoadOptions, MediaBackend, PlaybackEngine, PlayerController, PlayerHandle, PlayerStore,
};
use cadence_storage::{
    create_pool, liked, run_migrations, FileBlobStorage, MemoryBlobStorage, MemoryRecordStore,
    SqliteRecordStore, StoreCatalog,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const LOGGED_OUT: &str = "Logged out!";

/// External services a session talks to
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn RecordStore>,
    pub blobs: Arc<dyn BlobStorage>,
    pub identity: Arc<dyn IdentityProvider>,
    pub backend: Arc<dyn MediaBackend>,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
}

/// Open the record store and blob storage named by `settings`
///
/// Falls back to in-memory implementations for unset locations.
pub async fn open_storage(
    settings: &StorageSettings,
) -> Result<(Arc<dyn RecordStore>, Arc<dyn BlobStorage>)> {
    let store: Arc<dyn RecordStore> = match &settings.database_url {
        Some(url) => {
            let pool = create_pool(url).await.map_err(CadenceError::from)?;
            run_migrations(&pool).await.map_err(CadenceError::from)?;
            Arc::new(SqliteRecordStore::new(pool))
        }
        None => Arc::new(MemoryRecordStore::new()),
    };

    let blobs: Arc<dyn BlobStorage> = match &settings.blob_dir {
        Some(dir) => {
            let blobs = FileBlobStorage::new(dir.clone(), settings.public_base_url.clone());
            blobs.initialize(&[SONGS_BUCKET, IMAGES_BUCKET]).await?;
            Arc::new(blobs)
        }
        None => Arc::new(MemoryBlobStorage::new(settings.public_base_url.clone())),
    };

    Ok((store, blobs))
}

pub struct Session {
    config: SessionConfig,
    collaborators: Collaborators,
    catalog: Arc<dyn TrackCatalog>,
    playlist: PlayerStore,
    player: PlayerHandle,
    entitlement: EntitlementContext,
    prompts: Prompts,
    dispatcher: GatedDispatcher,
    tasks: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl Session {
    /// Validate `config` and start the session's background tasks
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: SessionConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let cancel = CancellationToken::new();

        let catalog: Arc<dyn TrackCatalog> = Arc::new(StoreCatalog::new(
            collaborators.store.clone(),
            collaborators.blobs.clone(),
        ));

        let engine = PlaybackEngine::new(
            collaborators.backend.clone(),
            LoadOptions {
                volume: config.playback.initial_volume,
                format: config.playback.format.clone(),
            },
        );
        let playlist = PlayerStore::new();
        let player = PlayerController::spawn(
            engine,
            playlist.clone(),
            catalog.clone(),
            collaborators.notifier.clone(),
            cancel.child_token(),
        );

        let entitlement = EntitlementContext::new();
        let prompts = Prompts::default();
        let tasks = vec![
            spawn_loader(
                entitlement.clone(),
                collaborators.identity.clone(),
                collaborators.store.clone(),
                cancel.child_token(),
            ),
            spawn_auth_watcher(
                prompts.auth.clone(),
                collaborators.identity.clone(),
                collaborators.navigator.clone(),
                cancel.child_token(),
            ),
        ];

        let dispatcher = GatedDispatcher::new(
            entitlement.clone(),
            prompts.clone(),
            playlist.clone(),
            AccessPolicy {
                require_subscription_for_playback: config.access.require_subscription_for_playback,
                require_subscription_for_uploads: config.access.require_subscription_for_uploads,
            },
            config.entitlement_timeout(),
        );

        info!("Session started");
        Ok(Self {
            config,
            collaborators,
            catalog,
            playlist,
            player,
            entitlement,
            prompts,
            dispatcher,
            tasks,
            cancel,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.collaborators.store
    }

    pub fn catalog(&self) -> &Arc<dyn TrackCatalog> {
        &self.catalog
    }

    /// Playlist state shared with the player controller
    pub fn playlist(&self) -> &PlayerStore {
        &self.playlist
    }

    pub fn player(&self) -> &PlayerHandle {
        &self.player
    }

    pub fn entitlement(&self) -> &EntitlementContext {
        &self.entitlement
    }

    pub fn prompts(&self) -> &Prompts {
        &self.prompts
    }

    pub fn dispatcher(&self) -> &GatedDispatcher {
        &self.dispatcher
    }

    /// Play `track` with `list` as the playback context
    pub async fn request_play(&self, track: &TrackId, list: &[TrackId]) -> PlayOutcome {
        self.dispatcher.request_play(track, list).await
    }

    /// Like toggle for `track_id`, cancelled with the session
    pub fn like_toggle(&self, track_id: TrackId) -> LikeToggle {
        LikeToggle::new(
            track_id,
            self.dispatcher.clone(),
            self.entitlement.clone(),
            self.collaborators.store.clone(),
            self.collaborators.navigator.clone(),
            self.collaborators.notifier.clone(),
            self.cancel.child_token(),
        )
    }

    /// Debounced search input, cancelled with the session
    pub fn search(&self) -> SearchController {
        SearchController::new(
            self.collaborators.navigator.clone(),
            self.config.quiet_period(),
            self.cancel.child_token(),
        )
    }

    pub fn uploader(&self) -> Uploader {
        Uploader::new(
            self.dispatcher.clone(),
            self.collaborators.store.clone(),
            self.collaborators.blobs.clone(),
            self.collaborators.navigator.clone(),
            self.collaborators.notifier.clone(),
            self.prompts.upload.clone(),
        )
    }

    /// Songs liked by the signed-in user; empty when anonymous
    pub async fn liked_songs(&self) -> Vec<Track> {
        match self.entitlement.snapshot().user_id() {
            Some(user_id) => liked::list(self.collaborators.store.as_ref(), user_id).await,
            None => Vec::new(),
        }
    }

    /// End the identity session and stop playback
    ///
    /// The playlist is reset and navigation refreshed even when the
    /// identity provider reports an error.
    pub async fn sign_out(&self) -> Result<()> {
        let result = self.collaborators.identity.sign_out().await;

        self.playlist.reset();
        self.collaborators.navigator.refresh();

        match result {
            Ok(()) => {
                self.collaborators.notifier.success(LOGGED_OUT);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Sign-out failed");
                self.collaborators.notifier.error(&e.user_message());
                Err(e.into())
            }
        }
    }

    /// Stop every background task and unload the player
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.player.shutdown().await;
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Session task failed");
            }
        }
        info!("Session stopped");
    }
}
