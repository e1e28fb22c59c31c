//! Song upload pipeline
//!
//! Stores the audio and artwork blobs, then inserts the song row. Any
//! failing step is reported and aborts the remaining steps.

use crate::busy::InFlight;
use crate::dispatcher::{Gate, GatedDispatcher};
use crate::prompts::PromptStore;
use cadence_core::{
    BlobStorage, NewTrack, Navigator, Notifier, RecordStore, Track, IMAGES_BUCKET, SONGS_BUCKET,
};
use cadence_storage::songs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const MISSING_FIELDS: &str = "Missing fields";
const SONG_UPLOAD_FAILED: &str = "Failed song upload";
const IMAGE_UPLOAD_FAILED: &str = "Failed image upload";
const SONG_CREATED: &str = "Song created!";

/// Contents of the upload form
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub title: String,
    pub author: String,
    pub song: Option<Vec<u8>>,
    pub image: Option<Vec<u8>>,
}

impl UploadForm {
    /// Title, author, audio and artwork, if every field is filled in
    fn into_parts(self) -> Option<(String, String, Vec<u8>, Vec<u8>)> {
        if self.title.trim().is_empty() || self.author.trim().is_empty() {
            return None;
        }
        match (self.song, self.image) {
            (Some(song), Some(image)) if !song.is_empty() && !image.is_empty() => {
                Some((self.title, self.author, song, image))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Created(Track),
    AuthRequired,
    SubscriptionRequired,
    Deferred,
    /// Another submission is in flight
    Busy,
    /// A required field was empty
    Invalid,
    /// A step failed; carries the message shown to the user
    Failed(String),
}

/// Object keys for one submission
fn object_keys(title: &str, uid: &str) -> (String, String) {
    (format!("song-{title}-{uid}"), format!("image-{title}-{uid}"))
}

pub struct Uploader {
    dispatcher: GatedDispatcher,
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStorage>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    prompt: PromptStore,
    busy: AtomicBool,
}

impl Uploader {
    pub fn new(
        dispatcher: GatedDispatcher,
        store: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStorage>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        prompt: PromptStore,
    ) -> Self {
        Self {
            dispatcher,
            store,
            blobs,
            navigator,
            notifier,
            prompt,
            busy: AtomicBool::new(false),
        }
    }

    fn needs_subscription(&self) -> bool {
        self.dispatcher.policy().require_subscription_for_uploads
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Open the upload prompt if the user may upload
    pub async fn open(&self) -> Gate {
        let gate = self.dispatcher.gate(self.needs_subscription()).await;
        if matches!(gate, Gate::Allowed(_)) {
            self.prompt.open();
        }
        gate
    }

    pub async fn submit(&self, form: UploadForm) -> UploadOutcome {
        let Some(_busy) = InFlight::acquire(&self.busy) else {
            return UploadOutcome::Busy;
        };
        self.run(form).await
    }

    async fn run(&self, form: UploadForm) -> UploadOutcome {
        let user_id = match self.dispatcher.gate(self.needs_subscription()).await {
            Gate::Allowed(user_id) => user_id,
            Gate::AuthRequired => return UploadOutcome::AuthRequired,
            Gate::SubscriptionRequired => return UploadOutcome::SubscriptionRequired,
            Gate::Deferred => return UploadOutcome::Deferred,
        };

        let Some((title, author, song, image)) = form.into_parts() else {
            self.notifier.error(MISSING_FIELDS);
            return UploadOutcome::Invalid;
        };

        let uid = Uuid::new_v4().simple().to_string();
        let (song_key, image_key) = object_keys(&title, &uid);

        let song_path = match self.blobs.upload(SONGS_BUCKET, &song_key, song).await {
            Ok(path) => path,
            Err(e) => {
                warn!(key = %song_key, error = %e, "Song upload failed");
                return self.fail(SONG_UPLOAD_FAILED);
            }
        };

        let image_path = match self.blobs.upload(IMAGES_BUCKET, &image_key, image).await {
            Ok(path) => path,
            Err(e) => {
                warn!(key = %image_key, error = %e, "Image upload failed");
                return self.fail(IMAGE_UPLOAD_FAILED);
            }
        };

        let new_track = NewTrack {
            user_id,
            title,
            author,
            song_path,
            image_path,
        };
        let track = match songs::create(self.store.as_ref(), new_track).await {
            Ok(track) => track,
            Err(e) => {
                warn!(error = %e, "Failed to insert song");
                return self.fail(&e.user_message());
            }
        };

        info!(track_id = %track.id, title = %track.title, "Song uploaded");
        self.navigator.refresh();
        self.notifier.success(SONG_CREATED);
        self.prompt.close();
        UploadOutcome::Created(track)
    }

    fn fail(&self, message: &str) -> UploadOutcome {
        self.notifier.error(message);
        UploadOutcome::Failed(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::AccessPolicy;
    use crate::entitlement::{EntitlementContext, EntitlementSnapshot, Identity, SubscriptionState};
    use crate::prompts::Prompts;
    use crate::test_support::{MockNotifier, RecordingNavigator};
    use cadence_core::UserId;
    use cadence_playback::PlayerStore;
    use cadence_storage::{MemoryBlobStorage, MemoryRecordStore};
    use std::time::Duration;

    struct Fixture {
        uploader: Uploader,
        entitlement: EntitlementContext,
        prompts: Prompts,
        store: Arc<MemoryRecordStore>,
        blobs: Arc<MemoryBlobStorage>,
        navigator: Arc<RecordingNavigator>,
    }

    fn fixture(notifier: MockNotifier, policy: AccessPolicy) -> Fixture {
        let entitlement = EntitlementContext::new();
        let prompts = Prompts::default();
        let dispatcher = GatedDispatcher::new(
            entitlement.clone(),
            prompts.clone(),
            PlayerStore::new(),
            policy,
            Duration::from_secs(1),
        );
        let store = Arc::new(MemoryRecordStore::new());
        let blobs = Arc::new(MemoryBlobStorage::new("http://cdn"));
        let navigator = Arc::new(RecordingNavigator::default());
        let uploader = Uploader::new(
            dispatcher,
            store.clone(),
            blobs.clone(),
            navigator.clone(),
            Arc::new(notifier),
            prompts.upload.clone(),
        );
        Fixture {
            uploader,
            entitlement,
            prompts,
            store,
            blobs,
            navigator,
        }
    }

    fn sign_in(entitlement: &EntitlementContext) {
        entitlement.publish(EntitlementSnapshot {
            identity: Identity::SignedIn(UserId::new("u1")),
            details: None,
            subscription: SubscriptionState::None,
        });
    }

    fn form() -> UploadForm {
        UploadForm {
            title: "Dawn".to_string(),
            author: "Lark".to_string(),
            song: Some(vec![1, 2, 3]),
            image: Some(vec![4, 5]),
        }
    }

    #[test]
    fn keys_carry_title_and_uid() {
        assert_eq!(
            object_keys("Dawn", "abc"),
            ("song-Dawn-abc".to_string(), "image-Dawn-abc".to_string())
        );
    }

    #[tokio::test]
    async fn successful_upload_creates_song() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_success()
            .withf(|message| message == "Song created!")
            .times(1)
            .return_const(());
        notifier.expect_error().never();
        let f = fixture(notifier, AccessPolicy::default());
        sign_in(&f.entitlement);
        f.prompts.upload.open();

        let UploadOutcome::Created(track) = f.uploader.submit(form()).await else {
            panic!("upload did not complete");
        };

        assert_eq!(track.user_id, UserId::new("u1"));
        assert!(track.song_path.starts_with("song-Dawn-"));
        assert!(track.image_path.starts_with("image-Dawn-"));
        assert_eq!(
            f.blobs.get(SONGS_BUCKET, &track.song_path).await,
            Some(vec![1, 2, 3])
        );
        assert_eq!(f.blobs.count(IMAGES_BUCKET).await, 1);
        assert_eq!(songs::all(f.store.as_ref()).await.unwrap(), vec![track]);
        assert!(!f.prompts.upload.is_open());
        assert_eq!(f.navigator.refreshes(), 1);
        assert!(!f.uploader.is_busy());
    }

    #[tokio::test]
    async fn missing_artwork_is_rejected() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_error()
            .withf(|message| message == "Missing fields")
            .times(1)
            .return_const(());
        let f = fixture(notifier, AccessPolicy::default());
        sign_in(&f.entitlement);

        let outcome = f
            .uploader
            .submit(UploadForm {
                image: None,
                ..form()
            })
            .await;

        assert_eq!(outcome, UploadOutcome::Invalid);
        assert_eq!(f.blobs.count(SONGS_BUCKET).await, 0);
    }

    #[tokio::test]
    async fn blob_failure_aborts_before_insert() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_error()
            .withf(|message| message == "Failed song upload")
            .times(1)
            .return_const(());
        notifier.expect_success().never();
        let f = fixture(notifier, AccessPolicy::default());
        sign_in(&f.entitlement);
        f.blobs.set_offline(true);

        let outcome = f.uploader.submit(form()).await;

        assert_eq!(outcome, UploadOutcome::Failed("Failed song upload".to_string()));
        assert!(songs::all(f.store.as_ref()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_reports_store_message() {
        let mut notifier = MockNotifier::new();
        notifier.expect_error().times(1).return_const(());
        notifier.expect_success().never();
        let f = fixture(notifier, AccessPolicy::default());
        sign_in(&f.entitlement);
        f.store.set_offline(true);

        let outcome = f.uploader.submit(form()).await;

        assert!(matches!(outcome, UploadOutcome::Failed(_)));
        assert_eq!(f.blobs.count(SONGS_BUCKET).await, 1);
        assert_eq!(f.navigator.refreshes(), 0);
    }

    #[tokio::test]
    async fn anonymous_upload_opens_auth_prompt() {
        let f = fixture(MockNotifier::new(), AccessPolicy::default());
        f.entitlement.publish(EntitlementSnapshot::anonymous());

        assert_eq!(f.uploader.submit(form()).await, UploadOutcome::AuthRequired);
        assert!(f.prompts.auth.is_open());
        assert_eq!(f.blobs.count(SONGS_BUCKET).await, 0);
    }

    #[tokio::test]
    async fn subscription_policy_gates_uploads() {
        let f = fixture(
            MockNotifier::new(),
            AccessPolicy {
                require_subscription_for_uploads: true,
                ..AccessPolicy::default()
            },
        );
        sign_in(&f.entitlement);

        assert_eq!(f.uploader.open().await, Gate::SubscriptionRequired);
        assert!(f.prompts.subscribe.is_open());
        assert!(!f.prompts.upload.is_open());
    }

    #[tokio::test]
    async fn open_shows_upload_prompt_for_signed_in_user() {
        let f = fixture(MockNotifier::new(), AccessPolicy::default());
        sign_in(&f.entitlement);

        assert_eq!(f.uploader.open().await, Gate::Allowed(UserId::new("u1")));
        assert!(f.prompts.upload.is_open());
    }
}
