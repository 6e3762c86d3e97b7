mod identifiers;

pub use identifiers::{LibraryId, MediaItemId, PlaylistId, UserId};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

/// 100-nanosecond ticks, the unit Emby reports runtimes and positions in.
pub const TICKS_PER_SECOND: u64 = 10_000_000;
pub const TICKS_PER_MILLISECOND: u64 = 10_000;

/// Ids favorited within the currently selected scope.
pub type FavoritesSet = HashSet<MediaItemId>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    /// Emby and Jellyfin servers.
    Emby,
    Plex,
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerType::Emby => write!(f, "Emby"),
            ServerType::Plex => write!(f, "Plex"),
        }
    }
}

/// Connection details for one logged-in server. Created at login and
/// replaced whole on the next login; never mutated in place.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerProfile {
    pub url: String,
    pub username: String,
    pub user_id: UserId,
    /// Kept in the system keyring, never in the config file.
    #[serde(skip)]
    pub token: String,
    pub server_type: ServerType,
}

impl fmt::Debug for ServerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerProfile")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .field("server_type", &self.server_type)
            .finish()
    }
}

impl ServerProfile {
    /// Profile used only to reach the login endpoint.
    pub fn unauthenticated(url: impl Into<String>, server_type: ServerType) -> Self {
        Self {
            url: url.into(),
            username: String::new(),
            user_id: UserId::new(""),
            token: String::new(),
            server_type,
        }
    }

    /// Server URL without the trailing slash.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    pub fn is_authenticated(&self) -> bool {
        !self.token.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub id: LibraryId,
    pub name: String,
    pub collection_type: Option<String>,
}

/// How a library's root is listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryKind {
    /// TV libraries: only top-level series at the root.
    Episodic,
    /// Folder libraries keep their directory structure.
    Folders,
    /// Everything else: leaf videos only.
    Generic,
}

impl Library {
    pub fn new(id: impl Into<LibraryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            collection_type: None,
        }
    }

    pub fn with_collection_type(mut self, collection_type: impl Into<String>) -> Self {
        self.collection_type = Some(collection_type.into());
        self
    }

    pub fn kind(&self) -> LibraryKind {
        match self
            .collection_type
            .as_deref()
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("tvshows") | Some("show") => LibraryKind::Episodic,
            Some("folders") => LibraryKind::Folders,
            _ => LibraryKind::Generic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Video,
    Series,
    Season,
    Folder,
    BoxSet,
}

impl ItemKind {
    /// Navigable groupings whose children are fetched by parent id.
    pub fn is_container(self) -> bool {
        !matches!(self, ItemKind::Video)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub is_favorite: bool,
    pub play_count: u32,
    pub played: bool,
    pub position_ticks: u64,
    pub last_played_at: Option<DateTime<Utc>>,
}

impl PlaybackState {
    pub fn position(&self) -> Duration {
        ticks_to_duration(self.position_ticks)
    }

    pub fn is_in_progress(&self) -> bool {
        self.position_ticks > 0
    }
}

/// Backend-specific locator (for example a Plex media part path). Only the
/// client that produced it reads it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendLocator(String);

impl BackendLocator {
    pub(crate) fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub id: MediaItemId,
    pub name: String,
    pub kind: ItemKind,
    pub overview: Option<String>,
    pub production_year: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub runtime_ticks: Option<u64>,
    pub image_tag: Option<String>,
    pub playback: PlaybackState,
    pub locator: Option<BackendLocator>,
}

impl NormalizedItem {
    pub fn new(id: impl Into<MediaItemId>, name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            overview: None,
            production_year: None,
            width: None,
            height: None,
            runtime_ticks: None,
            image_tag: None,
            playback: PlaybackState::default(),
            locator: None,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Known, non-zero width and height.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }

    pub fn runtime(&self) -> Option<Duration> {
        self.runtime_ticks.map(ticks_to_duration)
    }
}

pub fn ticks_to_duration(ticks: u64) -> Duration {
    Duration::from_nanos(ticks.saturating_mul(100))
}

/// One level of drill-down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavFrame {
    pub parent_id: MediaItemId,
    pub title: String,
}

impl NavFrame {
    pub fn new(parent_id: impl Into<MediaItemId>, title: impl Into<String>) -> Self {
        Self {
            parent_id: parent_id.into(),
            title: title.into(),
        }
    }
}

/// One page of a feed. `next_skip` is the skip to send on the following
/// non-reset call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PagedResponse {
    pub items: Vec<NormalizedItem>,
    pub next_skip: u64,
    pub total_count: u64,
}

impl PagedResponse {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_more(&self) -> bool {
        self.next_skip < self.total_count
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    #[default]
    Latest,
    Random,
    Favorites,
}

impl FeedType {
    /// Feeds paged against the backend rather than sliced client-side.
    pub fn is_backend_paged(self) -> bool {
        matches!(self, FeedType::Latest | FeedType::Random)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationMode {
    #[default]
    Vertical,
    Horizontal,
    Both,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    #[default]
    Primary,
    Backdrop,
}

impl ImageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageKind::Primary => "Primary",
            ImageKind::Backdrop => "Backdrop",
        }
    }
}
