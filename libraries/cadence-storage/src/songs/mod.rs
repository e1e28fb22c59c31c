use cadence_core::{
    error::{CadenceError, Result},
    query::{decode, encode, Filter},
    NewTrack, RecordStore, Table, Track, TrackId, UserId,
};
use chrono::Utc;
use tracing::debug;

fn newest_first(filter: Filter) -> Filter {
    filter.order_by("created_at", false)
}

async fn fetch(store: &dyn RecordStore, filter: Filter) -> Result<Vec<Track>> {
    store
        .find(Table::Songs, &filter)
        .await?
        .into_iter()
        .map(decode)
        .collect()
}

/// Every song in the catalog, newest first
pub async fn all(store: &dyn RecordStore) -> Result<Vec<Track>> {
    fetch(store, newest_first(Filter::new())).await
}

/// Songs whose title contains `title` (case-insensitive), newest first
///
/// An empty title returns the whole catalog.
pub async fn by_title(store: &dyn RecordStore, title: &str) -> Result<Vec<Track>> {
    if title.is_empty() {
        return all(store).await;
    }
    fetch(store, newest_first(Filter::new().ilike("title", title))).await
}

/// Songs uploaded by `user_id`, newest first
pub async fn by_user(store: &dyn RecordStore, user_id: &UserId) -> Result<Vec<Track>> {
    fetch(
        store,
        newest_first(Filter::new().eq("user_id", user_id.as_str())),
    )
    .await
}

/// Get song by ID
pub async fn by_id(store: &dyn RecordStore, id: &TrackId) -> Result<Track> {
    let row = store
        .find_one(Table::Songs, &Filter::new().eq("id", id.as_str()))
        .await?
        .ok_or_else(|| CadenceError::not_found("song", id.as_str()))?;
    decode(row)
}

/// Songs with the given ids, in the order of `ids`
///
/// Ids without a row are skipped.
pub async fn by_ids(store: &dyn RecordStore, ids: &[TrackId]) -> Result<Vec<Track>> {
    let rows = store
        .find(
            Table::Songs,
            &Filter::new().in_list("id", ids.iter().map(TrackId::as_str)),
        )
        .await?;
    let mut tracks = rows
        .into_iter()
        .map(decode::<Track>)
        .collect::<Result<Vec<_>>>()?;

    tracks.sort_by_key(|t| ids.iter().position(|id| *id == t.id));
    Ok(tracks)
}

/// Insert a new song row, assigning an id and creation time
pub async fn create(store: &dyn RecordStore, new_track: NewTrack) -> Result<Track> {
    let track = new_track.into_track(TrackId::generate(), Utc::now());
    store.insert(Table::Songs, encode(&track)?).await?;

    debug!(track_id = %track.id, title = %track.title, "Created song");
    Ok(track)
}
