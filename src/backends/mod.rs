pub mod emby;
pub mod errors;
pub mod favorites;
pub(crate) mod http;
pub mod naming;
pub mod orientation;
pub mod paging;
pub mod plex;
pub mod traits;

// Re-export commonly used types
pub use emby::EmbyClient;
pub use errors::{BackendError, BackendResult};
pub use favorites::{FavoritesNaming, FavoritesScope};
pub use paging::PagingPolicy;
pub use plex::PlexClient;
pub use traits::{MediaClient, VideoQuery};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::models::{ServerProfile, ServerType};

/// Image sizing shared by both backends' URL builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageOptions {
    #[serde(default = "default_max_width")]
    pub max_width: u32,

    #[serde(default = "default_plex_width")]
    pub plex_width: u32,

    #[serde(default = "default_plex_height")]
    pub plex_height: u32,

    #[serde(default = "default_quality")]
    pub quality: u32,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
            plex_width: default_plex_width(),
            plex_height: default_plex_height(),
            quality: default_quality(),
        }
    }
}

fn default_max_width() -> u32 { 800 }
fn default_plex_width() -> u32 { 800 }
fn default_plex_height() -> u32 { 1200 }
fn default_quality() -> u32 { 90 }

/// Settings every client is built with.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub paging: PagingPolicy,
    pub favorites: FavoritesNaming,
    /// Upper bound on items read from one favorites playlist.
    pub favorites_fetch_limit: u32,
    pub images: ImageOptions,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            paging: PagingPolicy::default(),
            favorites: FavoritesNaming::default(),
            favorites_fetch_limit: 2000,
            images: ImageOptions::default(),
        }
    }
}

/// Builds the client matching the profile's server type.
pub fn create_client(
    profile: ServerProfile,
    options: ClientOptions,
) -> BackendResult<Arc<dyn MediaClient>> {
    let client: Arc<dyn MediaClient> = match profile.server_type {
        ServerType::Emby => Arc::new(EmbyClient::new(profile, options)?),
        ServerType::Plex => Arc::new(PlexClient::new(profile, options)?),
    };
    Ok(client)
}

/// Logs in against `url` and returns the resulting profile. For Plex the
/// credential is a pre-issued token.
pub async fn authenticate(
    server_type: ServerType,
    url: &str,
    username: &str,
    credential: &str,
    options: ClientOptions,
) -> BackendResult<ServerProfile> {
    if url.trim().is_empty() {
        return Err(BackendError::InvalidProfile("Server URL is empty".to_string()));
    }

    info!("Logging in to {} server at {}", server_type, url);
    let client = create_client(ServerProfile::unauthenticated(url, server_type), options)?;
    client.authenticate(username, credential).await
}
