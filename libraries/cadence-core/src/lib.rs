//! Cadence Core
//!
//! Platform-agnostic core types, collaborator traits, and error handling for
//! Cadence.
//!
//! This crate provides the foundational building blocks shared by the
//! storage, playback, and session crates.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `UserDetails`, `Subscription`, `LikedSong`
//! - **Query Model**: `Table`, `Filter`, and JSON `Row`s for the record store
//! - **Collaborator Traits**: `RecordStore`, `IdentityProvider`, `BlobStorage`,
//!   `TrackCatalog`, `Navigator`, `Notifier`
//! - **Error Handling**: Unified `CadenceError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use cadence_core::query::{Filter, Table};
//! use cadence_core::types::{TrackId, UserId};
//!
//! let user = UserId::new("user-1");
//! let track = TrackId::new("track-1");
//!
//! // Membership lookup in the liked songs table
//! let filter = Filter::new()
//!     .eq("user_id", user.as_str())
//!     .eq("song_id", track.as_str());
//!
//! assert_eq!(Table::LikedSongs.as_str(), "liked_songs");
//! assert_eq!(filter.conditions().len(), 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod query;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{CadenceError, Result};
pub use query::{Filter, Row, Table};
pub use traits::{
    BlobStorage, IdentityProvider, Navigator, Notifier, RecordStore, TrackCatalog,
};

pub use types::{
    AuthSession, LikedSong, NewTrack, SessionState, Subscription, SubscriptionStatus, Track,
    TrackId, UserDetails, UserId, IMAGES_BUCKET, SONGS_BUCKET,
};
