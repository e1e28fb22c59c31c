//! Track catalog backed by a record store and blob storage

use crate::songs;
use async_trait::async_trait;
use cadence_core::{
    error::Result, BlobStorage, RecordStore, Track, TrackCatalog, TrackId, IMAGES_BUCKET,
    SONGS_BUCKET,
};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Resolves track ids through the `songs` table
///
/// Keeps the most recently resolved track, so repeated lookups of the
/// active track (player, artwork, like button) hit the store once.
pub struct StoreCatalog {
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStorage>,
    last: Mutex<Option<Track>>,
}

impl StoreCatalog {
    pub fn new(store: Arc<dyn RecordStore>, blobs: Arc<dyn BlobStorage>) -> Self {
        Self {
            store,
            blobs,
            last: Mutex::new(None),
        }
    }

    fn cached(&self, id: &TrackId) -> Option<Track> {
        let last = self.last.lock().ok()?;
        last.as_ref().filter(|t| t.id == *id).cloned()
    }

    fn remember(&self, track: &Track) {
        if let Ok(mut last) = self.last.lock() {
            *last = Some(track.clone());
        }
    }
}

#[async_trait]
impl TrackCatalog for StoreCatalog {
    async fn track(&self, id: &TrackId) -> Result<Track> {
        if let Some(track) = self.cached(id) {
            return Ok(track);
        }

        debug!(track_id = %id, "Resolving track");
        let track = songs::by_id(self.store.as_ref(), id).await?;
        self.remember(&track);
        Ok(track)
    }

    fn media_url(&self, track: &Track) -> Result<String> {
        self.blobs.public_url(SONGS_BUCKET, &track.song_path)
    }

    fn artwork_url(&self, track: &Track) -> Result<String> {
        self.blobs.public_url(IMAGES_BUCKET, &track.image_path)
    }
}
