/// Collaborator traits for Cadence
///
/// Everything the session and playback crates need from the outside world
/// is expressed here, so each can be replaced by an in-memory fake in tests.
use crate::error::Result;
use crate::query::{Filter, Row, Table};
use crate::types::{SessionState, Track, TrackId};
use async_trait::async_trait;
use tokio::sync::watch;

/// Record store trait
///
/// Implementers provide table-oriented reads and writes over JSON rows.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Rows of `table` matching `filter`
    async fn find(&self, table: Table, filter: &Filter) -> Result<Vec<Row>>;

    /// Insert a new row
    ///
    /// # Errors
    /// Returns `CadenceError::Duplicate` if a row with the same key exists
    async fn insert(&self, table: Table, row: Row) -> Result<()>;

    /// Insert a row or replace the row with the same key
    async fn upsert(&self, table: Table, row: Row) -> Result<()>;

    /// Delete every row matching `filter`, returning how many were removed
    async fn delete(&self, table: Table, filter: &Filter) -> Result<usize>;

    /// First row matching `filter`, if any
    async fn find_one(&self, table: Table, filter: &Filter) -> Result<Option<Row>> {
        let rows = self.find(table, &filter.clone().limit(1)).await?;
        Ok(rows.into_iter().next())
    }
}

/// Identity/session provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current state (may still be `Loading`)
    fn current(&self) -> SessionState;

    /// Change notifications; the receiver starts at the current state
    fn subscribe(&self) -> watch::Receiver<SessionState>;

    /// End the current session
    async fn sign_out(&self) -> Result<()>;
}

/// Blob storage for uploaded media
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `bytes` under `key` in `bucket`, returning the stored path
    ///
    /// Never overwrites an existing object.
    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> Result<String>;

    /// Publicly reachable locator for a stored path
    fn public_url(&self, bucket: &str, path: &str) -> Result<String>;
}

/// Track catalog accessor
///
/// Resolves a track identifier to metadata and playable locators.
#[async_trait]
pub trait TrackCatalog: Send + Sync {
    /// Metadata for `id`
    async fn track(&self, id: &TrackId) -> Result<Track>;

    /// Playable media URL for `track`
    fn media_url(&self, track: &Track) -> Result<String>;

    /// Artwork URL for `track`
    fn artwork_url(&self, track: &Track) -> Result<String>;
}

/// Navigation surface (router)
pub trait Navigator: Send + Sync {
    /// Navigate to `path` with the given query parameters
    fn navigate(&self, path: &str, query: &[(&str, &str)]);

    /// Re-fetch data for the current location
    fn refresh(&self);
}

/// Transient user-facing notifications (toasts)
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);

    fn error(&self, message: &str);
}
