/// Storage-specific errors
use cadence_core::CadenceError;
use thiserror::Error;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection error
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Row is missing a primary key column
    #[error("Row for {table} is missing key column(s)")]
    MissingKey { table: &'static str },

    /// Database error from `SQLx`
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for CadenceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::MissingKey { .. } => CadenceError::invalid_input(err.to_string()),
            StorageError::Serialization(e) => CadenceError::Serialization(e),
            StorageError::Io(e) => CadenceError::Io(e),
            other => CadenceError::store(other.to_string()),
        }
    }
}
