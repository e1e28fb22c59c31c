use cadence_core::{
    error::Result,
    query::{decode, encode, Filter},
    LikedSong, RecordStore, Table, Track, TrackId, UserId,
};
use chrono::Utc;
use tracing::{debug, warn};

fn membership(user_id: &UserId, track_id: &TrackId) -> Filter {
    Filter::new()
        .eq("user_id", user_id.as_str())
        .eq("song_id", track_id.as_str())
}

/// Whether `user_id` has liked `track_id`
pub async fn is_liked(store: &dyn RecordStore, user_id: &UserId, track_id: &TrackId) -> Result<bool> {
    Ok(store
        .find_one(Table::LikedSongs, &membership(user_id, track_id))
        .await?
        .is_some())
}

/// Add `track_id` to the user's liked songs
///
/// # Errors
/// Returns `CadenceError::Duplicate` if the song is already liked
pub async fn like(store: &dyn RecordStore, user_id: &UserId, track_id: &TrackId) -> Result<()> {
    let row = LikedSong {
        user_id: user_id.clone(),
        song_id: track_id.clone(),
        created_at: Utc::now(),
    };
    store.insert(Table::LikedSongs, encode(&row)?).await?;

    debug!(user_id = %user_id, track_id = %track_id, "Liked song");
    Ok(())
}

/// Remove `track_id` from the user's liked songs
///
/// Returns whether a membership row was removed.
pub async fn unlike(store: &dyn RecordStore, user_id: &UserId, track_id: &TrackId) -> Result<bool> {
    let removed = store
        .delete(Table::LikedSongs, &membership(user_id, track_id))
        .await?;

    debug!(user_id = %user_id, track_id = %track_id, removed, "Unliked song");
    Ok(removed > 0)
}

/// Songs liked by `user_id`, most recently liked first
///
/// Lookup failures are logged and produce an empty list.
pub async fn list(store: &dyn RecordStore, user_id: &UserId) -> Vec<Track> {
    match try_list(store, user_id).await {
        Ok(tracks) => tracks,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Failed to load liked songs");
            Vec::new()
        }
    }
}

async fn try_list(store: &dyn RecordStore, user_id: &UserId) -> Result<Vec<Track>> {
    let likes = store
        .find(
            Table::LikedSongs,
            &Filter::new()
                .eq("user_id", user_id.as_str())
                .order_by("created_at", false),
        )
        .await?
        .into_iter()
        .map(decode::<LikedSong>)
        .collect::<Result<Vec<_>>>()?;

    if likes.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<TrackId> = likes.into_iter().map(|l| l.song_id).collect();
    crate::songs::by_ids(store, &ids).await
}
