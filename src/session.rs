use std::sync::Arc;
use tracing::info;

use crate::backends::{self, MediaClient};
use crate::config::{Config, FeedConfig};
use crate::feed::{FeedController, FeedError, FeedHandle};
use crate::models::{ServerProfile, ServerType};

/// One logged-in server: its profile, the client built from it and the feed
/// driving that client. Rebuilt whole on every login.
#[derive(Debug)]
pub struct Session {
    profile: ServerProfile,
    client: Arc<dyn MediaClient>,
    feed: FeedHandle,
}

impl Session {
    /// Authenticates and starts a feed. For Plex `credential` is a token.
    pub async fn login(
        server_type: ServerType,
        url: &str,
        username: &str,
        credential: &str,
        config: &Config,
    ) -> Result<Self, FeedError> {
        let profile = backends::authenticate(
            server_type,
            url,
            username,
            credential,
            config.client_options(),
        )
        .await
        .map_err(FeedError::Auth)?;

        info!("Logged in to {} as {}", profile.server_type, profile.username);
        Self::resume(profile, config)
    }

    /// Starts a feed for a profile obtained earlier.
    pub fn resume(profile: ServerProfile, config: &Config) -> Result<Self, FeedError> {
        if !profile.is_authenticated() {
            return Err(FeedError::Auth(backends::BackendError::InvalidProfile(
                "Profile has no token".to_string(),
            )));
        }
        let client =
            backends::create_client(profile.clone(), config.client_options()).map_err(FeedError::Auth)?;
        Ok(Self::with_client(profile, client, &config.feed))
    }

    pub fn with_client(
        profile: ServerProfile,
        client: Arc<dyn MediaClient>,
        feed_config: &FeedConfig,
    ) -> Self {
        let feed = FeedController::spawn(Arc::clone(&client), feed_config);
        Self {
            profile,
            client,
            feed,
        }
    }

    pub fn profile(&self) -> &ServerProfile {
        &self.profile
    }

    pub fn client(&self) -> &Arc<dyn MediaClient> {
        &self.client
    }

    pub fn feed(&self) -> &FeedHandle {
        &self.feed
    }

    /// Clears the feed and drops the profile and client.
    pub async fn logout(self) {
        info!("Logging out of {}", self.profile.base_url());
        self.feed.shutdown().await;
    }
}
