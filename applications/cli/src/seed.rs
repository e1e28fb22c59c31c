//! Catalog seeding from a JSON file
//!
//! The file holds an array of songs:
//!
//! ```json
//! [{ "id": "dawn", "title": "Dawn", "author": "Lark",
//!    "song_path": "song-dawn", "image_path": "image-dawn" }]
//! ```
//!
//! Earlier entries are treated as older uploads.

use anyhow::Context;
use cadence_core::{query::encode, RecordStore, Table, Track, TrackId, UserId};
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

const SEED_OWNER: &str = "catalog";

#[derive(Debug, Deserialize)]
struct SeedTrack {
    #[serde(default)]
    id: Option<String>,
    title: String,
    author: String,
    song_path: String,
    image_path: String,
    #[serde(default)]
    user_id: Option<String>,
}

fn into_tracks(seeds: Vec<SeedTrack>) -> Vec<Track> {
    let now = Utc::now();
    let count = seeds.len();

    seeds
        .into_iter()
        .enumerate()
        .map(|(index, seed)| Track {
            id: seed.id.map_or_else(TrackId::generate, TrackId::new),
            user_id: UserId::new(seed.user_id.unwrap_or_else(|| SEED_OWNER.to_string())),
            title: seed.title,
            author: seed.author,
            song_path: seed.song_path,
            image_path: seed.image_path,
            created_at: now - Duration::seconds((count - index) as i64),
        })
        .collect()
}

/// Insert every song in `path`; returns how many were added
pub async fn seed_catalog(store: &dyn RecordStore, path: &Path) -> anyhow::Result<usize> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    let seeds: Vec<SeedTrack> = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid catalog {}", path.display()))?;

    let tracks = into_tracks(seeds);
    for track in &tracks {
        store.upsert(Table::Songs, encode(track)?).await?;
    }

    info!(count = tracks.len(), path = %path.display(), "Seeded catalog");
    Ok(tracks.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_storage::{songs, MemoryRecordStore};
    use std::io::Write;

    #[tokio::test]
    async fn seeds_in_file_order_as_oldest_first() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id": "a", "title": "First", "author": "X", "song_path": "song-a", "image_path": "image-a"}},
                {{"id": "b", "title": "Second", "author": "Y", "song_path": "song-b", "image_path": "image-b"}}
            ]"#
        )
        .unwrap();

        let store = MemoryRecordStore::new();
        assert_eq!(seed_catalog(&store, file.path()).await.unwrap(), 2);

        let titles: Vec<String> = songs::all(&store)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["Second", "First"]);
    }

    #[tokio::test]
    async fn invalid_json_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let store = MemoryRecordStore::new();
        let err = seed_catalog(&store, file.path()).await.unwrap_err();
        assert!(err.to_string().starts_with("Invalid catalog"));
    }
}
