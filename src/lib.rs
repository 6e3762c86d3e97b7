//! Short-video feed over Emby/Jellyfin and Plex media servers.

pub mod backends;
pub mod config;
pub mod credentials;
pub mod feed;
pub mod models;
pub mod session;

pub use backends::{MediaClient, create_client};
pub use config::Config;
pub use feed::{FeedController, FeedHandle, FeedState};
pub use session::Session;
