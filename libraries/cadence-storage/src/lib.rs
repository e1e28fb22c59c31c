//! Cadence Storage
//!
//! Record store implementations, blob storage, and catalog queries for
//! Cadence.
//!
//! # Architecture
//!
//! - **Record stores**: `SqliteRecordStore` (persistent, JSON rows in
//!   `SQLite`) and `MemoryRecordStore` (tests and demos)
//! - **Blob storage**: `FileBlobStorage` and `MemoryBlobStorage`
//! - **Vertical Slicing**: `songs`, `liked`, and `users` own their queries
//! - **Catalog**: `StoreCatalog` resolves track ids to metadata and URLs
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_storage::{create_pool, run_migrations, songs, SqliteRecordStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://cadence.db").await?;
//! run_migrations(&pool).await?;
//!
//! let store = SqliteRecordStore::new(pool);
//! let newest_first = songs::all(&store).await?;
//! # Ok(())
//! # }
//! ```

mod blobs;
mod catalog;
mod error;
mod identity;
mod memory;
mod sqlite;

// Vertical slices
pub mod liked;
pub mod songs;
pub mod users;

pub use blobs::{FileBlobStorage, MemoryBlobStorage};
pub use catalog::StoreCatalog;
pub use error::StorageError;
pub use identity::LocalIdentity;
pub use memory::MemoryRecordStore;
pub use sqlite::SqliteRecordStore;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;
use tracing::debug;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// This should be called once when the application starts to ensure
/// the database schema is up to date.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), StorageError> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| StorageError::Migration(e.to_string()))
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://cadence.db>`)
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, StorageError> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    debug!(url = %database_url, "Creating SQLite pool");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

    debug!("SQLite pool created");

    Ok(pool)
}
