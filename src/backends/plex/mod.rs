//! Plex Media Server.

mod api;

pub use api::PlexApi;

use async_trait::async_trait;
use chrono::DateTime;
use tracing::{debug, info, warn};

use self::api::{PlexMetadata, TYPE_MOVIE, TYPE_SHOW};
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
    ServerType, TICKS_PER_MILLISECOND, UserId,
};

/// Machine identifier used when the server does not report one.
const FALLBACK_MACHINE_ID: &str = "1";
const DEFAULT_USERNAME: &str = "Plex User";

pub struct PlexClient {
    profile: ServerProfile,
    api: PlexApi,
    options: ClientOptions,
}

impl std::fmt::Debug for PlexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlexClient")
            .field("profile", &self.profile)
            .finish()
    }
}

impl PlexClient {
    pub fn new(profile: ServerProfile, options: ClientOptions) -> BackendResult<Self> {
        if profile.server_type != ServerType::Plex {
            return Err(BackendError::InvalidProfile(format!(
                "{} profile handed to the Plex client",
                profile.server_type
            )));
        }

        let http = super::http::build_client(options.timeout)?;
        let api = PlexApi::new(http, profile.base_url(), &profile.token);

        Ok(Self {
            profile,
            api,
            options,
        })
    }

    fn playlist_title(&self, scope: &FavoritesScope) -> String {
        self.options
            .favorites
            .playlist_name(scope, ServerType::Plex)
    }

    /// Server identity for playlist item URIs. The profile's user id holds
    /// it after a normal login; anything else is looked up, then defaulted.
    async fn machine_identifier(&self) -> String {
        let user_id = self.profile.user_id.as_str();
        if !user_id.is_empty() && user_id != FALLBACK_MACHINE_ID {
            return user_id.to_string();
        }

        match self.api.identity().await {
            Ok(Some(id)) => id,
            Ok(None) => FALLBACK_MACHINE_ID.to_string(),
            Err(e) => {
                warn!("Could not resolve machine identifier: {}", e);
                FALLBACK_MACHINE_ID.to_string()
            }
        }
    }

    async fn item_uri(&self, item_id: &MediaItemId) -> String {
        format!(
            "server://{}/com.plexapp.plugins.library/library/metadata/{}",
            self.machine_identifier().await,
            item_id
        )
    }

    async fn favorites_page(&self, query: &VideoQuery) -> BackendResult<PagedResponse> {
        let scope = FavoritesScope::for_library(query.library.as_ref());
        let title = self.playlist_title(&scope);
        let Some(playlist) = self.api.find_playlist(&title).await? else {
            debug!("No favorites playlist '{}'", title);
            return Ok(PagedResponse::empty());
        };

        let items = self
            .api
            .playlist_items(&playlist, self.options.favorites_fetch_limit)
            .await?
            .into_iter()
            .map(to_normalized)
            .collect();

        Ok(paging::slice_favorites(
            items,
            query.orientation,
            query.skip,
            query.limit,
        ))
    }

    async fn listing_page(&self, query: &VideoQuery) -> BackendResult<PagedResponse> {
        let listing = match listing_target(query) {
            Some(listing) => listing,
            None => {
                debug!("No library selected, nothing to list at the root");
                return Ok(PagedResponse::empty());
            }
        };

        paging::fill_page(
            query.skip,
            query.limit,
            query.orientation,
            self.options.paging,
            |start, size| {
                let listing = listing.clone();
                async move {
                    let container = match listing {
                        Listing::Children(parent_id) => {
                            self.api.children(&parent_id, start, size).await?
                        }
                        Listing::Section {
                            section_id,
                            sort,
                            type_filter,
                        } => {
                            self.api
                                .section_items(&section_id, sort, type_filter, start, size)
                                .await?
                        }
                    };
                    let total_count = container.total();
                    Ok(RawPage {
                        items: container.metadata.into_iter().map(to_normalized).collect(),
                        total_count,
                    })
                }
            },
        )
        .await
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Listing {
    Children(String),
    Section {
        section_id: String,
        sort: &'static str,
        type_filter: Option<u8>,
    },
}

/// Where a latest/random query reads from. `None` at the root when no
/// library is selected or the library is not a video section.
fn listing_target(query: &VideoQuery) -> Option<Listing> {
    let library = query.library.as_ref();

    // The library's own id as parent means its root.
    let parent = query
        .parent_id
        .as_ref()
        .filter(|parent| library.is_none_or(|lib| parent.as_str() != lib.id.as_str()));

    if let Some(parent) = parent {
        return Some(Listing::Children(parent.to_string()));
    }

    let library = library?;
    if !is_video_section(library.collection_type.as_deref()) {
        return None;
    }
    let sort = match query.feed_type {
        FeedType::Random => "random",
        _ => "addedAt:desc",
    };
    Some(Listing::Section {
        section_id: library.id.to_string(),
        sort,
        type_filter: section_type_filter(library),
    })
}

/// Music and photo sections hold nothing the feed can play.
fn is_video_section(section_type: Option<&str>) -> bool {
    matches!(section_type, None | Some("movie") | Some("show"))
}

fn section_type_filter(library: &Library) -> Option<u8> {
    match library.kind() {
        LibraryKind::Episodic => Some(TYPE_SHOW),
        _ if library.collection_type.as_deref() == Some("movie") => Some(TYPE_MOVIE),
        _ => None,
    }
}

fn item_kind(item_type: Option<&str>) -> ItemKind {
    match item_type {
        Some("show") => ItemKind::Series,
        Some("season") => ItemKind::Season,
        Some("collection") => ItemKind::BoxSet,
        Some("folder") | Some("playlist") => ItemKind::Folder,
        _ => ItemKind::Video,
    }
}

fn to_normalized(item: PlexMetadata) -> NormalizedItem {
    let kind = item_kind(item.item_type.as_deref());
    let name = if item.item_type.as_deref() == Some("episode") {
        naming::episode_name(
            item.parent_index,
            item.index,
            item.title.as_deref().unwrap_or_default(),
        )
    } else {
        naming::display_name(item.title)
    };

    let media = item.media.into_iter().next();
    let (width, height) = media
        .as_ref()
        .map(|m| (m.width, m.height))
        .unwrap_or((None, None));
    let locator = media
        .and_then(|m| m.parts.into_iter().next())
        .and_then(|part| part.key)
        .map(BackendLocator::new);

    let play_count = item.view_count.unwrap_or(0);
    let playback = PlaybackState {
        // Membership comes from the favorites set, never from the item.
        is_favorite: false,
        play_count,
        played: play_count > 0,
        position_ticks: item.view_offset.unwrap_or(0) * TICKS_PER_MILLISECOND,
        last_played_at: item
            .last_viewed_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
    };

    NormalizedItem {
        id: MediaItemId::new(item.rating_key),
        name,
        kind,
        overview: item.summary,
        production_year: item.year,
        width,
        height,
        runtime_ticks: item.duration.map(|ms| ms * TICKS_PER_MILLISECOND),
        image_tag: item.thumb,
        playback,
        locator,
    }
}

#[async_trait]
impl MediaClient for PlexClient {
    fn profile(&self) -> &ServerProfile {
        &self.profile
    }

    async fn authenticate(
        &self,
        username: &str,
        credential: &str,
    ) -> BackendResult<ServerProfile> {
        info!("Connecting to Plex at {}", self.profile.base_url());
        let machine_id = self
            .api
            .with_token(credential)
            .identity()
            .await
            .map_err(BackendError::into_auth)?;

        let username = if username.trim().is_empty() {
            DEFAULT_USERNAME.to_string()
        } else {
            username.to_string()
        };
        info!("Connected to Plex as {}", username);

        Ok(ServerProfile {
            url: self.profile.url.clone(),
            username,
            user_id: UserId::new(machine_id.unwrap_or_else(|| FALLBACK_MACHINE_ID.to_string())),
            token: credential.to_string(),
            server_type: ServerType::Plex,
        })
    }

    async fn get_libraries(&self) -> BackendResult<Vec<Library>> {
        let sections = self.api.sections().await?;
        Ok(sections
            .into_iter()
            .filter(|section| {
                let video = is_video_section(section.section_type.as_deref());
                if !video {
                    debug!("Skipping non-video section '{}'", section.title);
                }
                video
            })
            .map(|section| Library {
                id: section.key.into(),
                name: section.title,
                collection_type: section.section_type,
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
        let base = self.profile.base_url();
        let token = self.profile.token.as_str();
        if let Some(part) = &item.locator {
            return http::endpoint_url(base, part.as_str(), &[("X-Plex-Token", token)]);
        }

        let path = format!("/library/metadata/{}", item.id);
        http::endpoint_url(
            base,
            "/video/:/transcode/universal/start",
            &[
                ("path", path.as_str()),
                ("mediaIndex", "0"),
                ("partIndex", "0"),
                ("protocol", "hls"),
                ("offset", "0"),
                ("fastSeek", "1"),
                ("directPlay", "0"),
                ("directStream", "1"),
                ("subtitleSize", "100"),
                ("audioBoost", "100"),
                ("X-Plex-Token", token),
            ],
        )
    }

    fn image_url(&self, item_id: &MediaItemId, tag: Option<&str>, kind: ImageKind) -> String {
        let Some(tag) = tag.filter(|t| !t.is_empty()) else {
            return String::new();
        };

        let path = if tag.starts_with('/') {
            tag.to_string()
        } else {
            let variant = match kind {
                ImageKind::Primary => "thumb",
                ImageKind::Backdrop => "art",
            };
            format!("/library/metadata/{}/{}", item_id, variant)
        };

        let images = &self.options.images;
        http::endpoint_url(
            self.profile.base_url(),
            "/photo/:/transcode",
            &[
                ("url", path.as_str()),
                ("width", images.plex_width.to_string().as_str()),
                ("height", images.plex_height.to_string().as_str()),
                ("X-Plex-Token", self.profile.token.as_str()),
            ],
        )
    }

    async fn get_favorites(&self, scope: &FavoritesScope) -> BackendResult<FavoritesSet> {
        let title = self.playlist_title(scope);
        let Some(playlist) = self.api.find_playlist(&title).await? else {
            return Ok(FavoritesSet::new());
        };
        let items = self
            .api
            .playlist_items(&playlist, self.options.favorites_fetch_limit)
            .await?;
        Ok(items
            .into_iter()
            .map(|item| MediaItemId::new(item.rating_key))
            .collect())
    }

    async fn toggle_favorite(
        &self,
        item_id: &MediaItemId,
        currently_favorite: bool,
        scope: &FavoritesScope,
    ) -> BackendResult<()> {
        let title = self.playlist_title(scope);
        let playlist: Option<PlaylistId> = self.api.find_playlist(&title).await?;

        if !currently_favorite {
            let uri = self.item_uri(item_id).await;
            match playlist {
                Some(playlist) => self.api.add_to_playlist(&playlist, &uri).await?,
                None => self.api.create_playlist(&title, &uri).await?,
            }
            info!("Added {} to favorites ({})", item_id, scope);
            return Ok(());
        }

        let Some(playlist) = playlist else {
            warn!("No favorites playlist '{}', nothing to remove", title);
            return Ok(());
        };

        let entry = self
            .api
            .playlist_items(&playlist, self.options.favorites_fetch_limit)
            .await?
            .into_iter()
            .find(|item| item.rating_key == item_id.as_str())
            .and_then(|item| item.playlist_item_id);

        match entry {
            Some(entry_id) => {
                self.api.remove_from_playlist(&playlist, &entry_id).await?;
                info!("Removed {} from favorites ({})", item_id, scope);
            }
            None => warn!("{} is not in favorites playlist '{}'", item_id, title),
        }
        Ok(())
    }
}
