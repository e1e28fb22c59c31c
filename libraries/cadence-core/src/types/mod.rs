mod account;
mod ids;
pub(crate) mod timestamp;
mod track;

pub use account::{AuthSession, SessionState, Subscription, SubscriptionStatus, UserDetails};
pub use ids::{TrackId, UserId};
pub use track::{LikedSong, NewTrack, Track, IMAGES_BUCKET, SONGS_BUCKET};
