use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::backends::errors::{BackendError, BackendResult};
use crate::backends::http;
use crate::models::{MediaItemId, PlaylistId, UserId};

const EMBY_CLIENT_NAME: &str = "ReelTok";
const EMBY_CLIENT_VERSION: &str = "0.1.0";
const EMBY_DEVICE_NAME: &str = "ReelTok";

/// Fields requested for every item listing.
pub(super) const ITEM_FIELDS: &str =
    "MediaSources,Width,Height,Overview,UserData,SeriesName,ParentIndexNumber,IndexNumber";
const PLAYLIST_FIELDS: &str = "MediaSources,Width,Height,Overview,UserData";
pub(super) const IMAGE_TYPES: &str = "Primary,Backdrop,Banner,Thumb";

/// Raw Emby/Jellyfin REST calls. Query strings are built here; reshaping
/// into the shared model happens in the parent module.
#[derive(Clone)]
pub struct EmbyApi {
    client: Client,
    base_url: String,
    token: String,
    user_id: UserId,
    device_id: String,
}

impl std::fmt::Debug for EmbyApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbyApi")
            .field("base_url", &self.base_url)
            .field("user_id", &self.user_id)
            .field("device_id", &self.device_id)
            .finish()
    }
}

impl EmbyApi {
    pub fn new(client: Client, base_url: &str, token: &str, user_id: UserId) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            user_id,
            device_id: Uuid::new_v4().to_string(),
        }
    }

    fn auth_header(&self) -> String {
        let mut header = format!(
            r#"MediaBrowser Client="{}", Device="{}", DeviceId="{}", Version="{}""#,
            EMBY_CLIENT_NAME, EMBY_DEVICE_NAME, self.device_id, EMBY_CLIENT_VERSION
        );
        if !self.token.is_empty() {
            header.push_str(&format!(r#", Token="{}""#, self.token));
        }
        header
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorized(self.client.get(self.url(path)))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorized(self.client.post(self.url(path)))
    }

    fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorized(self.client.delete(self.url(path)))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header("X-Emby-Authorization", self.auth_header());
        if self.token.is_empty() {
            request
        } else {
            request.header("X-Emby-Token", &self.token)
        }
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> BackendResult<AuthResponse> {
        info!("Authenticating with Emby at {}", self.base_url);

        let request = self
            .post("/Users/AuthenticateByName")
            .header("Content-Type", "application/json")
            .json(&AuthRequest {
                username: username.to_string(),
                pw: password.to_string(),
            });

        let auth: AuthResponse = http::get_json(request, "emby_authenticate")
            .await
            .map_err(BackendError::into_auth)?;

        if auth.access_token.is_empty() || auth.user.id.is_empty() {
            return Err(BackendError::Authentication {
                status: None,
                message: "Login response carried no token or user id".to_string(),
            });
        }

        info!("Authenticated with Emby as user: {}", auth.user.name);
        Ok(auth)
    }

    pub async fn get_views(&self) -> BackendResult<Vec<EmbyView>> {
        let path = format!("/Users/{}/Views", self.user_id);
        let views: ViewsResponse = http::get_json(self.get(&path), "emby_get_views").await?;
        info!("Found {} libraries", views.items.len());
        Ok(views.items)
    }

    pub async fn get_items(&self, params: &[(&str, String)]) -> BackendResult<ItemsResponse> {
        let path = format!("/Users/{}/Items", self.user_id);
        debug!("Fetching items with params: {:?}", params);
        http::get_json(self.get(&path).query(params), "emby_get_items").await
    }

    pub async fn find_playlist(&self, name: &str) -> BackendResult<Option<PlaylistId>> {
        let params = [
            ("IncludeItemTypes", "Playlist".to_string()),
            ("Recursive", "true".to_string()),
        ];
        let path = format!("/Users/{}/Items", self.user_id);
        let response: ItemsResponse =
            http::get_json(self.get(&path).query(&params), "emby_find_playlist").await?;

        Ok(response
            .items
            .into_iter()
            .find(|item| item.name.as_deref() == Some(name))
            .map(|item| PlaylistId::new(item.id)))
    }

    pub async fn create_playlist(&self, name: &str) -> BackendResult<PlaylistId> {
        info!("Creating favorites playlist '{}'", name);
        let params = [("Name", name.to_string()), ("UserId", self.user_id.to_string())];
        let created: CreatedPlaylist =
            http::get_json(self.post("/Playlists").query(&params), "emby_create_playlist").await?;
        Ok(PlaylistId::new(created.id))
    }

    pub async fn get_playlist_items(
        &self,
        playlist_id: &PlaylistId,
        limit: u32,
    ) -> BackendResult<Vec<EmbyItem>> {
        let path = format!("/Playlists/{}/Items", playlist_id);
        let params = [
            ("UserId", self.user_id.to_string()),
            ("Fields", PLAYLIST_FIELDS.to_string()),
            ("Limit", limit.to_string()),
        ];
        let response: ItemsResponse =
            http::get_json(self.get(&path).query(&params), "emby_get_playlist_items").await?;
        Ok(response.items)
    }

    pub async fn add_to_playlist(
        &self,
        playlist_id: &PlaylistId,
        item_id: &MediaItemId,
    ) -> BackendResult<()> {
        let path = format!("/Playlists/{}/Items", playlist_id);
        let params = [
            ("Ids", item_id.to_string()),
            ("UserId", self.user_id.to_string()),
        ];
        http::send(self.post(&path).query(&params), "emby_add_to_playlist").await?;
        Ok(())
    }

    pub async fn remove_from_playlist(
        &self,
        playlist_id: &PlaylistId,
        entry_id: &str,
    ) -> BackendResult<()> {
        let path = format!("/Playlists/{}/Items", playlist_id);
        let params = [("EntryIds", entry_id.to_string())];
        http::send(self.delete(&path).query(&params), "emby_remove_from_playlist").await?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AuthRequest {
    username: String,
    pw: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthResponse {
    pub user: EmbyUser,
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmbyUser {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ViewsResponse {
    #[serde(default)]
    items: Vec<EmbyView>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmbyView {
    pub id: String,
    pub name: String,
    pub collection_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemsResponse {
    #[serde(default)]
    pub items: Vec<EmbyItem>,
    #[serde(default)]
    pub total_record_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreatedPlaylist {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmbyItem {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "Type")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub is_folder: bool,
    pub overview: Option<String>,
    pub production_year: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub run_time_ticks: Option<u64>,
    pub index_number: Option<u32>,
    pub parent_index_number: Option<u32>,
    #[serde(default)]
    pub image_tags: ImageTags,
    pub user_data: Option<UserData>,
    /// Membership entry id, present on playlist listings only.
    pub playlist_item_id: Option<String>,
    #[serde(default)]
    pub media_sources: Vec<MediaSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageTags {
    pub primary: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserData {
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub played: bool,
    #[serde(default)]
    pub play_count: u32,
    pub last_played_date: Option<String>,
    pub playback_position_ticks: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaSource {
    #[serde(default)]
    pub media_streams: Vec<MediaStream>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaStream {
    #[serde(rename = "Type")]
    pub stream_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}
