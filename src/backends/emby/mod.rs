//! Emby and Jellyfin servers.

mod api;

pub use api::EmbyApi;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use self::api::{EmbyItem, IMAGE_TYPES, ITEM_FIELDS};
use super::ClientOptions;
use super::errors::{BackendError, BackendResult};
use super::favorites::FavoritesScope;
use super::http;
use super::naming;
use super::paging::{self, RawPage};
use super::traits::{MediaClient, VideoQuery};
use crate::models::{
    BackendLocator, FavoritesSet, FeedType, ImageKind, ItemKind, Library, LibraryKind,
    MediaItemId, NormalizedItem, PagedResponse, PlaybackState, PlaylistId, ServerProfile,
    ServerType, UserId,
};

const LEAF_TYPES: &str = "Movie,Video,Episode";
const FOLDER_LIBRARY_TYPES: &str = "Movie,Video,Episode,Folder,BoxSet";
const EPISODIC_TYPES: &str = "Series";

pub struct EmbyClient {
    profile: ServerProfile,
    api: EmbyApi,
    options: ClientOptions,
}

impl std::fmt::Debug for EmbyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbyClient")
            .field("profile", &self.profile)
            .finish()
    }
}

impl EmbyClient {
    pub fn new(profile: ServerProfile, options: ClientOptions) -> BackendResult<Self> {
        if profile.server_type != ServerType::Emby {
            return Err(BackendError::InvalidProfile(format!(
                "{} profile handed to the Emby client",
                profile.server_type
            )));
        }

        let http = super::http::build_client(options.timeout)?;
        let api = EmbyApi::new(
            http,
            profile.base_url(),
            &profile.token,
            profile.user_id.clone(),
        );

        Ok(Self {
            profile,
            api,
            options,
        })
    }

    fn playlist_name(&self, scope: &FavoritesScope) -> String {
        self.options
            .favorites
            .playlist_name(scope, ServerType::Emby)
    }

    async fn favorites_playlist(&self, scope: &FavoritesScope) -> BackendResult<Option<PlaylistId>> {
        let name = self.playlist_name(scope);
        let playlist = self.api.find_playlist(&name).await?;
        debug!("Favorites playlist '{}': {:?}", name, playlist);
        Ok(playlist)
    }

    async fn favorites_page(&self, query: &VideoQuery) -> BackendResult<PagedResponse> {
        let scope = FavoritesScope::for_library(query.library.as_ref());
        let playlist = match self.favorites_playlist(&scope).await? {
            Some(id) => self
                .api
                .get_playlist_items(&id, self.options.favorites_fetch_limit)
                .await?
                .into_iter()
                .map(to_normalized)
                .collect(),
            None => Vec::new(),
        };

        Ok(paging::slice_favorites(
            playlist,
            query.orientation,
            query.skip,
            query.limit,
        ))
    }

    async fn listing_page(&self, query: &VideoQuery) -> BackendResult<PagedResponse> {
        let base_params = listing_params(query);

        paging::fill_page(
            query.skip,
            query.limit,
            query.orientation,
            self.options.paging,
            |skip, size| {
                let mut params = base_params.clone();
                params.push(("StartIndex", skip.to_string()));
                params.push(("Limit", size.to_string()));
                async move {
                    let response = self.api.get_items(&params).await?;
                    Ok(RawPage {
                        items: response.items.into_iter().map(to_normalized).collect(),
                        total_count: response.total_record_count,
                    })
                }
            },
        )
        .await
    }
}

/// Query parameters for a latest/random listing, without the window.
fn listing_params(query: &VideoQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("Fields", ITEM_FIELDS.to_string()),
        ("EnableImageTypes", IMAGE_TYPES.to_string()),
    ];

    if let Some(parent_id) = &query.parent_id {
        // Folder contents, one level deep, whatever their type.
        params.push(("ParentId", parent_id.to_string()));
        params.push(("Recursive", "false".to_string()));
        params.push(("SortBy", "SortName".to_string()));
        return params;
    }

    let include = match &query.library {
        Some(library) => {
            params.push(("ParentId", library.id.to_string()));
            match library.kind() {
                LibraryKind::Episodic => EPISODIC_TYPES,
                LibraryKind::Folders => FOLDER_LIBRARY_TYPES,
                LibraryKind::Generic => LEAF_TYPES,
            }
        }
        None => LEAF_TYPES,
    };
    params.push(("IncludeItemTypes", include.to_string()));
    params.push(("Recursive", "true".to_string()));
    let sort_by = match query.feed_type {
        FeedType::Random => "Random",
        _ => "DateCreated",
    };
    params.push(("SortBy", sort_by.to_string()));
    params.push(("SortOrder", "Descending".to_string()));
    params
}

fn item_kind(item: &EmbyItem) -> ItemKind {
    match item.item_type.as_deref() {
        Some("Series") => ItemKind::Series,
        Some("Season") => ItemKind::Season,
        Some("BoxSet") => ItemKind::BoxSet,
        Some("Folder") | Some("CollectionFolder") | Some("Playlist") => ItemKind::Folder,
        Some("Movie") | Some("Video") | Some("Episode") | Some("MusicVideo") | Some("Trailer") => {
            ItemKind::Video
        }
        _ if item.is_folder => ItemKind::Folder,
        _ => ItemKind::Video,
    }
}

/// Item dimensions, falling back to the first video stream.
fn dimensions(item: &EmbyItem) -> (Option<u32>, Option<u32>) {
    if item.width.is_some() && item.height.is_some() {
        return (item.width, item.height);
    }
    item.media_sources
        .iter()
        .flat_map(|source| source.media_streams.iter())
        .find(|stream| stream.stream_type.as_deref() == Some("Video"))
        .map(|stream| (stream.width, stream.height))
        .unwrap_or((item.width, item.height))
}

fn to_normalized(item: EmbyItem) -> NormalizedItem {
    let kind = item_kind(&item);
    let (width, height) = dimensions(&item);
    let name = if item.item_type.as_deref() == Some("Episode") {
        naming::episode_name(
            item.parent_index_number,
            item.index_number,
            item.name.as_deref().unwrap_or_default(),
        )
    } else {
        naming::display_name(item.name)
    };

    let playback = item
        .user_data
        .map(|ud| PlaybackState {
            is_favorite: ud.is_favorite,
            play_count: ud.play_count,
            played: ud.played,
            position_ticks: ud.playback_position_ticks.unwrap_or(0),
            last_played_at: ud
                .last_played_date
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        })
        .unwrap_or_default();

    NormalizedItem {
        id: MediaItemId::new(item.id),
        name,
        kind,
        overview: item.overview,
        production_year: item.production_year,
        width,
        height,
        runtime_ticks: item.run_time_ticks,
        image_tag: item.image_tags.primary,
        playback,
        locator: item.playlist_item_id.map(BackendLocator::new),
    }
}

#[async_trait]
impl MediaClient for EmbyClient {
    fn profile(&self) -> &ServerProfile {
        &self.profile
    }

    async fn authenticate(
        &self,
        username: &str,
        credential: &str,
    ) -> BackendResult<ServerProfile> {
        let auth = self.api.authenticate(username, credential).await?;
        Ok(ServerProfile {
            url: self.profile.url.clone(),
            username: auth.user.name,
            user_id: UserId::new(auth.user.id),
            token: auth.access_token,
            server_type: ServerType::Emby,
        })
    }

    async fn get_libraries(&self) -> BackendResult<Vec<Library>> {
        let views = self.api.get_views().await?;
        Ok(views
            .into_iter()
            .map(|view| Library {
                id: view.id.into(),
                name: view.name,
                collection_type: view.collection_type,
            })
            .collect())
    }

    async fn get_videos(&self, query: &VideoQuery) -> BackendResult<PagedResponse> {
        debug!(
            "get_videos: feed={:?} parent={:?} library={:?} skip={} limit={}",
            query.feed_type,
            query.parent_id,
            query.library.as_ref().map(|l| &l.name),
            query.skip,
            query.limit
        );

        match query.feed_type {
            FeedType::Favorites => self.favorites_page(query).await,
            FeedType::Latest | FeedType::Random => self.listing_page(query).await,
        }
    }

    fn video_url(&self, item: &NormalizedItem) -> String {
        http::endpoint_url(
            self.profile.base_url(),
            &format!("/Videos/{}/stream.mp4", item.id),
            &[("Static", "true"), ("api_key", self.profile.token.as_str())],
        )
    }

    fn image_url(&self, item_id: &MediaItemId, tag: Option<&str>, kind: ImageKind) -> String {
        let Some(tag) = tag.filter(|t| !t.is_empty()) else {
            return String::new();
        };
        let images = &self.options.images;
        http::endpoint_url(
            self.profile.base_url(),
            &format!("/Items/{}/Images/{}", item_id, kind.as_str()),
            &[
                ("maxWidth", images.max_width.to_string().as_str()),
                ("tag", tag),
                ("quality", images.quality.to_string().as_str()),
            ],
        )
    }

    async fn get_favorites(&self, scope: &FavoritesScope) -> BackendResult<FavoritesSet> {
        let Some(playlist) = self.favorites_playlist(scope).await? else {
            return Ok(FavoritesSet::new());
        };
        let items = self
            .api
            .get_playlist_items(&playlist, self.options.favorites_fetch_limit)
            .await?;
        Ok(items.into_iter().map(|i| MediaItemId::new(i.id)).collect())
    }

    async fn toggle_favorite(
        &self,
        item_id: &MediaItemId,
        currently_favorite: bool,
        scope: &FavoritesScope,
    ) -> BackendResult<()> {
        let existing = self.favorites_playlist(scope).await?;

        if !currently_favorite {
            let playlist = match existing {
                Some(id) => id,
                None => self.api.create_playlist(&self.playlist_name(scope)).await?,
            };
            self.api.add_to_playlist(&playlist, item_id).await?;
            info!("Added {} to favorites ({})", item_id, scope);
            return Ok(());
        }

        let Some(playlist) = existing else {
            warn!("No favorites playlist for {}, nothing to remove", scope);
            return Ok(());
        };

        // Removal goes by membership entry id, looked up fresh every time.
        let entry = self
            .api
            .get_playlist_items(&playlist, self.options.favorites_fetch_limit)
            .await?
            .into_iter()
            .find(|i| i.id == item_id.as_str())
            .and_then(|i| i.playlist_item_id);

        match entry {
            Some(entry_id) => {
                self.api.remove_from_playlist(&playlist, &entry_id).await?;
                info!("Removed {} from favorites ({})", item_id, scope);
            }
            None => warn!("{} is not in the favorites playlist for {}", item_id, scope),
        }
        Ok(())
    }
}
