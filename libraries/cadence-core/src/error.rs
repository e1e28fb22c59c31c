/// Core error types for Cadence
use thiserror::Error;

/// Result type alias using `CadenceError`
pub type Result<T> = std::result::Result<T, CadenceError>;

/// Core error type for Cadence
#[derive(Error, Debug)]
pub enum CadenceError {
    /// Record store failure (network or database)
    #[error("Store error: {0}")]
    Store(String),

    /// Blob storage failure
    #[error("Blob storage error: {0}")]
    Blob(String),

    /// Identity provider failure
    #[error("Identity error: {0}")]
    Identity(String),

    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A row with the same key already exists
    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    /// Action requires a signed-in user
    #[error("Not signed in")]
    NotSignedIn,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CadenceError {
    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a blob storage error
    pub fn blob(msg: impl Into<String>) -> Self {
        Self::Blob(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Message suitable for a transient user-facing notification
    ///
    /// Store and blob errors carry the collaborator's own message, which is
    /// what the user sees.
    pub fn user_message(&self) -> String {
        match self {
            Self::Store(msg) | Self::Blob(msg) | Self::Identity(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = CadenceError::not_found("Song", "abc");
        assert_eq!(err.to_string(), "Song not found: abc");
    }

    #[test]
    fn user_message_strips_prefix_for_store_errors() {
        let err = CadenceError::store("connection reset");
        assert_eq!(err.user_message(), "connection reset");
        assert_eq!(err.to_string(), "Store error: connection reset");
    }
}
