//! Song catalog types

use super::ids::{TrackId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Blob bucket holding uploaded audio files
pub const SONGS_BUCKET: &str = "songs";

/// Blob bucket holding uploaded artwork
pub const IMAGES_BUCKET: &str = "images";

/// A song in the catalog
///
/// Immutable once fetched. Paths are blob storage paths, not URLs; the
/// catalog accessor turns them into playable locators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    /// Uploader
    pub user_id: UserId,
    pub title: String,
    pub author: String,
    /// Path of the audio file in the `songs` bucket
    pub song_path: String,
    /// Path of the artwork in the `images` bucket
    pub image_path: String,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Data for creating a new song row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrack {
    pub user_id: UserId,
    pub title: String,
    pub author: String,
    pub song_path: String,
    pub image_path: String,
}

impl NewTrack {
    /// Assign an id and creation time, producing the stored row
    pub fn into_track(self, id: TrackId, created_at: DateTime<Utc>) -> Track {
        Track {
            id,
            user_id: self.user_id,
            title: self.title,
            author: self.author,
            song_path: self.song_path,
            image_path: self.image_path,
            created_at,
        }
    }
}

/// Membership row of the `liked_songs` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikedSong {
    pub user_id: UserId,
    pub song_id: TrackId,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTime<Utc>,
}
