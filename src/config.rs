use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::backends::{ClientOptions, FavoritesNaming, ImageOptions, PagingPolicy};
use crate::credentials;
use crate::models::{FeedType, OrientationMode, ServerProfile};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub favorites: FavoritesNaming,

    #[serde(default)]
    pub images: ImageOptions,

    /// Last logged-in server, used by the binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: u32,

    #[serde(default = "default_max_fill_rounds")]
    pub max_fill_rounds: u32,

    #[serde(default = "default_favorites_fetch_limit")]
    pub favorites_fetch_limit: u32,

    /// Items left before the end of the feed that trigger the next page.
    #[serde(default = "default_prefetch_threshold")]
    pub prefetch_threshold: usize,

    #[serde(default)]
    pub default_feed_type: FeedType,

    #[serde(default)]
    pub default_orientation: OrientationMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Seconds.
    #[serde(default = "default_timeout")]
    pub connection_timeout: u64,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            info!("No config file found, using defaults");
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);
        let contents = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        info!("Config loaded successfully");
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure config directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents).context("Failed to write config file")?;

        debug!("Config saved to {:?}", path);
        Ok(())
    }

    /// Remembers the profile of a successful login. The token goes to the
    /// system keyring; the file only keeps the rest of the profile.
    pub fn set_server(&mut self, profile: Option<ServerProfile>) -> Result<()> {
        if let Some(old) = &self.server {
            if profile.as_ref().map(credentials::token_key) != Some(credentials::token_key(old)) {
                credentials::delete_token(old);
            }
        }
        if let Some(profile) = &profile {
            credentials::store_token(profile).context("Failed to store server token")?;
        }
        self.server = profile;
        self.save()
    }

    /// The saved profile with its token read back from the keyring. The
    /// token stays empty when the keyring has none.
    pub fn saved_server(&self) -> Option<ServerProfile> {
        let mut profile = self.server.clone()?;
        match credentials::load_token(&profile) {
            Ok(token) => profile.token = token,
            Err(e) => warn!("No stored token for {}: {}", profile.base_url(), e),
        }
        Some(profile)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_secs(self.network.connection_timeout),
            paging: PagingPolicy {
                overfetch_factor: self.feed.overfetch_factor,
                max_fill_rounds: self.feed.max_fill_rounds,
            },
            favorites: self.favorites.clone(),
            favorites_fetch_limit: self.feed.favorites_fetch_limit,
            images: self.images,
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join("reeltok").join("config.toml"))
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            overfetch_factor: default_overfetch_factor(),
            max_fill_rounds: default_max_fill_rounds(),
            favorites_fetch_limit: default_favorites_fetch_limit(),
            prefetch_threshold: default_prefetch_threshold(),
            default_feed_type: FeedType::default(),
            default_orientation: OrientationMode::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connection_timeout: default_timeout(),
        }
    }
}

// Default value functions
fn default_page_size() -> usize { 20 }
fn default_overfetch_factor() -> u32 { 2 }
fn default_max_fill_rounds() -> u32 { 3 }
fn default_favorites_fetch_limit() -> u32 { 2000 }
fn default_prefetch_threshold() -> usize { 2 }
fn default_timeout() -> u64 { 30 }
