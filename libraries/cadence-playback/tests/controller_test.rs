//! Player controller integration tests
//!
//! Runs the controller over the simulated backend and an in-memory catalog
//! with a paused clock, so track ends happen as soon as the runtime idles.

use async_trait::async_trait;
use cadence_core::{
    query::encode, Notifier, RecordStore, Table, Track, TrackCatalog, TrackId, UserId,
};
use cadence_playback::{
    LoadOptions, PlaybackEngine, PlaybackError, PlaybackEvent, PlaybackState, PlayerController,
    PlayerHandle, PlayerStatus, PlayerStore, SimulatedBackend,
};
use cadence_storage::{MemoryBlobStorage, MemoryRecordStore, StoreCatalog};
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const TRACK_LENGTH: Duration = Duration::from_secs(180);

#[derive(Default)]
struct RecordingNotifier {
    errors: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn success(&self, _message: &str) {}

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

struct Harness {
    store: PlayerStore,
    player: PlayerHandle,
    backend: Arc<SimulatedBackend>,
    notifier: Arc<RecordingNotifier>,
}

fn url(id: &str) -> String {
    format!("http://cdn/storage/v1/object/public/songs/song-{id}")
}

/// Catalog whose lookups take `delay`
struct SlowCatalog {
    inner: StoreCatalog,
    delay: Duration,
}

#[async_trait]
impl TrackCatalog for SlowCatalog {
    async fn track(&self, id: &TrackId) -> cadence_core::Result<Track> {
        tokio::time::sleep(self.delay).await;
        self.inner.track(id).await
    }

    fn media_url(&self, track: &Track) -> cadence_core::Result<String> {
        self.inner.media_url(track)
    }

    fn artwork_url(&self, track: &Track) -> cadence_core::Result<String> {
        self.inner.artwork_url(track)
    }
}

async fn harness(ids: &[&str]) -> Harness {
    harness_with(ids, TRACK_LENGTH, Duration::ZERO).await
}

async fn harness_with(ids: &[&str], track_length: Duration, lookup_delay: Duration) -> Harness {
    let records = Arc::new(MemoryRecordStore::new());
    for id in ids {
        let track = Track {
            id: TrackId::new(*id),
            user_id: UserId::new("uploader"),
            title: format!("Title {id}"),
            author: "Artist".to_string(),
            song_path: format!("song-{id}"),
            image_path: format!("image-{id}"),
            created_at: Utc::now(),
        };
        records
            .insert(Table::Songs, encode(&track).unwrap())
            .await
            .unwrap();
    }

    let catalog = Arc::new(SlowCatalog {
        inner: StoreCatalog::new(records, Arc::new(MemoryBlobStorage::new("http://cdn"))),
        delay: lookup_delay,
    });
    let backend = Arc::new(SimulatedBackend::new(track_length));
    let notifier = Arc::new(RecordingNotifier::default());
    let store = PlayerStore::new();

    let engine = PlaybackEngine::new(backend.clone(), LoadOptions::default());
    let player = PlayerController::spawn(
        engine,
        store.clone(),
        catalog,
        notifier.clone(),
        CancellationToken::new(),
    );

    Harness {
        store,
        player,
        backend,
        notifier,
    }
}

fn ids(names: &[&str]) -> Vec<TrackId> {
    names.iter().map(|n| TrackId::new(*n)).collect()
}

async fn wait_for(player: &PlayerHandle, pred: impl FnMut(&PlayerStatus) -> bool) {
    let mut rx = player.watch_status();
    tokio::time::timeout(Duration::from_secs(3600), rx.wait_for(pred))
        .await
        .expect("timed out waiting for player status")
        .expect("player status channel closed");
}

fn playing(id: &str) -> impl FnMut(&PlayerStatus) -> bool + '_ {
    move |s| s.state == PlaybackState::Playing && s.active_id == Some(TrackId::new(id))
}

#[tokio::test(start_paused = true)]
async fn plays_active_track_then_auto_advances() {
    let h = harness(&["a", "b"]).await;
    let mut events = h.player.events();

    h.store.set_playlist(ids(&["a", "b"]));
    h.store.set_active(TrackId::new("a"));

    wait_for(&h.player, playing("a")).await;
    assert_eq!(
        h.player.status().track.map(|t| t.title),
        Some("Title a".to_string())
    );

    wait_for(&h.player, playing("b")).await;
    assert_eq!(h.store.active_id(), Some(TrackId::new("b")));
    assert_eq!(h.backend.loads(), vec![url("a"), url("b")]);

    let mut ended = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let PlaybackEvent::PlaybackEnded { url } = event {
            ended.push(url);
        }
    }
    assert_eq!(ended, vec![url("a")]);
}

#[tokio::test(start_paused = true)]
async fn changing_active_track_rebinds_single_resource() {
    let h = harness(&["a", "b"]).await;
    h.store.set_playlist(ids(&["a", "b"]));
    h.store.set_active(TrackId::new("a"));
    wait_for(&h.player, playing("a")).await;

    h.store.set_active(TrackId::new("b"));
    wait_for(&h.player, playing("b")).await;

    assert_eq!(h.backend.live_handles(), 1);
}

#[tokio::test(start_paused = true)]
async fn superseded_selection_is_never_loaded() {
    let h = harness(&["a", "b"]).await;
    h.store.set_active(TrackId::new("a"));
    h.store.set_active(TrackId::new("b"));

    wait_for(&h.player, playing("b")).await;
    assert_eq!(h.backend.loads(), vec![url("b")]);
}

#[tokio::test(start_paused = true)]
async fn track_ending_during_lookup_keeps_new_selection() {
    let h = harness_with(&["a", "b", "c"], Duration::from_secs(10), Duration::from_secs(5)).await;
    let mut events = h.player.events();
    h.store.set_playlist(ids(&["a", "b", "c"]));
    h.store.set_active(TrackId::new("a"));
    wait_for(&h.player, playing("a")).await;

    // "a" would end while "b" is still being looked up
    tokio::time::sleep(Duration::from_secs(8)).await;
    h.store.set_active(TrackId::new("b"));
    wait_for(&h.player, |s| {
        s.state == PlaybackState::Idle && s.active_id == Some(TrackId::new("b"))
    })
    .await;
    assert_eq!(h.backend.live_handles(), 0);

    wait_for(&h.player, playing("b")).await;
    assert_eq!(h.store.active_id(), Some(TrackId::new("b")));
    assert_eq!(h.backend.loads(), vec![url("a"), url("b")]);

    while let Ok(event) = events.try_recv() {
        assert!(
            !matches!(&event, PlaybackEvent::PlaybackEnded { url: ended } if *ended == url("a")),
            "superseded track reported an end: {event:?}"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn reset_unloads_engine() {
    let h = harness(&["a"]).await;
    h.store.set_playlist(ids(&["a"]));
    h.store.set_active(TrackId::new("a"));
    wait_for(&h.player, playing("a")).await;

    h.store.reset();
    wait_for(&h.player, |s| s.state == PlaybackState::Idle && s.active_id.is_none()).await;

    assert_eq!(h.backend.live_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn toggle_pauses_and_resumes() {
    let h = harness(&["a"]).await;
    h.store.set_playlist(ids(&["a"]));
    h.store.set_active(TrackId::new("a"));
    wait_for(&h.player, playing("a")).await;

    h.player.toggle_play_pause().await.unwrap();
    wait_for(&h.player, |s| s.state == PlaybackState::Paused).await;

    // Paused tracks never end on their own
    tokio::time::sleep(TRACK_LENGTH * 2).await;
    assert_eq!(h.player.status().state, PlaybackState::Paused);
    assert_eq!(h.backend.loads().len(), 1);

    h.player.toggle_play_pause().await.unwrap();
    wait_for(&h.player, playing("a")).await;
}

#[tokio::test(start_paused = true)]
async fn single_track_playlist_repeats() {
    let h = harness(&["a"]).await;
    h.store.set_playlist(ids(&["a"]));
    h.store.set_active(TrackId::new("a"));
    wait_for(&h.player, playing("a")).await;

    tokio::time::timeout(Duration::from_secs(3600), async {
        while h.backend.loads().len() < 2 {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(h.backend.loads(), vec![url("a"), url("a")]);
}

#[tokio::test(start_paused = true)]
async fn empty_playlist_stays_idle_after_end() {
    let h = harness(&["a"]).await;
    h.store.set_active(TrackId::new("a"));
    wait_for(&h.player, playing("a")).await;
    wait_for(&h.player, |s| s.state == PlaybackState::Idle).await;

    tokio::time::sleep(TRACK_LENGTH * 3).await;
    assert_eq!(h.backend.loads().len(), 1);
    assert_eq!(h.player.status().state, PlaybackState::Idle);
}

#[tokio::test(start_paused = true)]
async fn unknown_track_is_reported() {
    let h = harness(&[]).await;
    let mut events = h.player.events();
    h.store.set_active(TrackId::new("ghost"));

    let event = tokio::time::timeout(Duration::from_secs(60), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, PlaybackEvent::Error { .. }));
    assert_eq!(h.notifier.errors.lock().unwrap().len(), 1);
    assert!(h.backend.loads().is_empty());
}

#[tokio::test(start_paused = true)]
async fn load_failure_goes_idle_and_notifies() {
    let h = harness(&["a"]).await;
    h.backend.fail_url(url("a"));
    h.store.set_active(TrackId::new("a"));

    wait_for(&h.player, |s| s.state == PlaybackState::Loading).await;
    wait_for(&h.player, |s| s.state == PlaybackState::Idle).await;

    let errors = h.notifier.errors.lock().unwrap().clone();
    assert_eq!(errors, vec![format!("Failed to load {}", url("a"))]);
    assert_eq!(h.backend.live_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn volume_commands_update_status() {
    let h = harness(&[]).await;

    h.player.set_volume(0.25).await.unwrap();
    wait_for(&h.player, |s| s.volume == 0.25).await;

    h.player.toggle_mute().await.unwrap();
    wait_for(&h.player, |s| s.muted && s.volume == 0.0).await;

    h.player.toggle_mute().await.unwrap();
    wait_for(&h.player, |s| !s.muted && s.volume == 0.25).await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_unloads_and_closes_commands() {
    let h = harness(&["a"]).await;
    h.store.set_active(TrackId::new("a"));
    wait_for(&h.player, playing("a")).await;

    h.player.shutdown().await;

    assert_eq!(h.backend.live_handles(), 0);
    assert!(matches!(
        h.player.toggle_play_pause().await,
        Err(PlaybackError::ControllerClosed)
    ));
}
