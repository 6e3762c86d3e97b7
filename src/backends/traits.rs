use async_trait::async_trait;

use super::errors::BackendResult;
use super::favorites::FavoritesScope;
use crate::models::{
    FavoritesSet, FeedType, ImageKind, Library, MediaItemId, NormalizedItem, OrientationMode,
    PagedResponse, ServerProfile, ServerType,
};

/// Parameters of one `get_videos` call.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoQuery {
    /// Top of the navigation stack; `None` at the library root.
    pub parent_id: Option<MediaItemId>,
    pub library: Option<Library>,
    pub feed_type: FeedType,
    pub skip: u64,
    pub limit: usize,
    pub orientation: OrientationMode,
}

impl VideoQuery {
    pub fn new(feed_type: FeedType, limit: usize) -> Self {
        Self {
            parent_id: None,
            library: None,
            feed_type,
            skip: 0,
            limit,
            orientation: OrientationMode::Both,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<MediaItemId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_library(mut self, library: Library) -> Self {
        self.library = Some(library);
        self
    }

    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_orientation(mut self, orientation: OrientationMode) -> Self {
        self.orientation = orientation;
        self
    }
}

/// Uniform contract over one media server protocol. Implementations own a
/// `ServerProfile` and never share mutable state with each other.
#[async_trait]
pub trait MediaClient: Send + Sync + std::fmt::Debug {
    fn profile(&self) -> &ServerProfile;

    fn server_type(&self) -> ServerType {
        self.profile().server_type
    }

    /// Exchanges credentials for a profile. Plex takes a pre-issued token as
    /// `credential`. Never retried.
    async fn authenticate(&self, username: &str, credential: &str)
    -> BackendResult<ServerProfile>;

    async fn get_libraries(&self) -> BackendResult<Vec<Library>>;

    async fn get_videos(&self, query: &VideoQuery) -> BackendResult<PagedResponse>;

    /// Fully authorized playback URL. Pure: no network access.
    fn video_url(&self, item: &NormalizedItem) -> String;

    /// Image URL, or an empty string when there is no tag.
    fn image_url(&self, item_id: &MediaItemId, tag: Option<&str>, kind: ImageKind) -> String;

    /// Members of the scope's favorites playlist. A missing playlist is an
    /// empty set; reading never creates one.
    async fn get_favorites(&self, scope: &FavoritesScope) -> BackendResult<FavoritesSet>;

    /// Adds (`currently_favorite == false`) or removes the item, creating the
    /// playlist on first add.
    async fn toggle_favorite(
        &self,
        item_id: &MediaItemId,
        currently_favorite: bool,
        scope: &FavoritesScope,
    ) -> BackendResult<()>;
}
