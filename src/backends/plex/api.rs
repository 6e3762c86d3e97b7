use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info};

use crate::backends::errors::BackendResult;
use crate::backends::http;
use crate::models::PlaylistId;

pub const PLEX_PRODUCT: &str = "ReelTok";
pub const PLEX_VERSION: &str = "0.1.0";
pub const PLEX_CLIENT_IDENTIFIER: &str = "reeltok-feed";
pub const PLEX_PLATFORM: &str = "Linux";

/// Section listing `type` filter for top-level shows.
pub(super) const TYPE_SHOW: u8 = 2;
/// Section listing `type` filter for movies.
pub(super) const TYPE_MOVIE: u8 = 1;

/// Raw Plex Media Server calls.
#[derive(Clone)]
pub struct PlexApi {
    client: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for PlexApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlexApi")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl PlexApi {
    pub fn new(client: Client, base_url: &str, token: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// Same server and HTTP client, different token.
    pub fn with_token(&self, token: &str) -> Self {
        Self::new(self.client.clone(), &self.base_url, token)
    }

    /// Every request carries the JSON accept header, client identification
    /// and the token.
    fn standard_headers(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Accept", "application/json")
            .header("X-Plex-Client-Identifier", PLEX_CLIENT_IDENTIFIER)
            .header("X-Plex-Product", PLEX_PRODUCT)
            .header("X-Plex-Version", PLEX_VERSION)
            .header("X-Plex-Platform", PLEX_PLATFORM)
            .header("X-Plex-Token", &self.token)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.standard_headers(self.client.get(self.url(path)))
    }

    pub async fn identity(&self) -> BackendResult<Option<String>> {
        let response: IdentityResponse = http::get_json(self.get("/identity"), "plex_identity").await?;
        Ok(response
            .media_container
            .machine_identifier
            .filter(|id| !id.is_empty()))
    }

    pub async fn sections(&self) -> BackendResult<Vec<PlexDirectory>> {
        let response: SectionsResponse =
            http::get_json(self.get("/library/sections"), "plex_sections").await?;
        info!("Found {} library sections", response.media_container.directory.len());
        Ok(response.media_container.directory)
    }

    pub async fn section_items(
        &self,
        section_id: &str,
        sort: &str,
        type_filter: Option<u8>,
        start: u64,
        size: usize,
    ) -> BackendResult<MetadataContainer> {
        let path = format!("/library/sections/{}/all", section_id);
        let mut params = vec![
            ("sort", sort.to_string()),
            ("X-Plex-Container-Start", start.to_string()),
            ("X-Plex-Container-Size", size.to_string()),
        ];
        if let Some(type_filter) = type_filter {
            params.push(("type", type_filter.to_string()));
        }
        debug!("Fetching section {} with params: {:?}", section_id, params);

        let response: MetadataResponse =
            http::get_json(self.get(&path).query(&params), "plex_section_items").await?;
        Ok(response.media_container)
    }

    pub async fn children(
        &self,
        parent_id: &str,
        start: u64,
        size: usize,
    ) -> BackendResult<MetadataContainer> {
        let path = format!("/library/metadata/{}/children", parent_id);
        let params = [
            ("X-Plex-Container-Start", start.to_string()),
            ("X-Plex-Container-Size", size.to_string()),
        ];
        let response: MetadataResponse =
            http::get_json(self.get(&path).query(&params), "plex_children").await?;
        Ok(response.media_container)
    }

    /// Exact title match; the server-side `title` filter is a substring match.
    pub async fn find_playlist(&self, title: &str) -> BackendResult<Option<PlaylistId>> {
        let request = self.get("/playlists").query(&[("title", title)]);
        let response: MetadataResponse = http::get_json(request, "plex_find_playlist").await?;
        Ok(response
            .media_container
            .metadata
            .into_iter()
            .find(|playlist| playlist.title.as_deref() == Some(title))
            .map(|playlist| PlaylistId::new(playlist.rating_key)))
    }

    pub async fn playlist_items(
        &self,
        playlist_id: &PlaylistId,
        limit: u32,
    ) -> BackendResult<Vec<PlexMetadata>> {
        let path = format!("/playlists/{}/items", playlist_id);
        let params = [
            ("X-Plex-Container-Start", "0".to_string()),
            ("X-Plex-Container-Size", limit.to_string()),
        ];
        let response: MetadataResponse =
            http::get_json(self.get(&path).query(&params), "plex_playlist_items").await?;
        Ok(response.media_container.metadata)
    }

    pub async fn create_playlist(&self, title: &str, uri: &str) -> BackendResult<()> {
        info!("Creating favorites playlist '{}'", title);
        let request = self.standard_headers(self.client.post(self.url("/playlists"))).query(&[
            ("type", "video"),
            ("title", title),
            ("smart", "0"),
            ("uri", uri),
        ]);
        http::send(request, "plex_create_playlist").await?;
        Ok(())
    }

    pub async fn add_to_playlist(&self, playlist_id: &PlaylistId, uri: &str) -> BackendResult<()> {
        let path = format!("/playlists/{}/items", playlist_id);
        let request = self
            .standard_headers(self.client.put(self.url(&path)))
            .query(&[("uri", uri)]);
        http::send(request, "plex_add_to_playlist").await?;
        Ok(())
    }

    pub async fn remove_from_playlist(
        &self,
        playlist_id: &PlaylistId,
        playlist_item_id: &str,
    ) -> BackendResult<()> {
        let path = format!("/playlists/{}/items/{}", playlist_id, playlist_item_id);
        let request = self.standard_headers(self.client.delete(self.url(&path)));
        http::send(request, "plex_remove_from_playlist").await?;
        Ok(())
    }
}

// Plex sends some ids as strings and others as numbers depending on version.
fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(serde::de::Error::custom("expected string or number")),
    }
}

fn deserialize_optional_string_or_number<'de, D>(
    deserializer: D,
) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(serde::de::Error::custom("expected string or number")),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IdentityResponse {
    media_container: IdentityContainer,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityContainer {
    #[serde(default, alias = "MachineIdentifier")]
    machine_identifier: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SectionsResponse {
    media_container: SectionsContainer,
}

#[derive(Debug, Deserialize)]
struct SectionsContainer {
    #[serde(rename = "Directory", default)]
    directory: Vec<PlexDirectory>,
}

#[derive(Debug, Deserialize)]
pub struct PlexDirectory {
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub key: String,
    pub title: String,
    #[serde(rename = "type")]
    pub section_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MetadataResponse {
    media_container: MetadataContainer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataContainer {
    #[serde(rename = "Metadata", default)]
    pub metadata: Vec<PlexMetadata>,
    pub total_size: Option<u64>,
    pub size: Option<u64>,
}

impl MetadataContainer {
    /// `totalSize` when the server reports it, otherwise the page size.
    pub fn total(&self) -> u64 {
        self.total_size.or(self.size).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlexMetadata {
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub rating_key: String,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub summary: Option<String>,
    pub year: Option<u32>,
    /// Milliseconds.
    pub duration: Option<u64>,
    pub view_count: Option<u32>,
    /// Milliseconds.
    pub view_offset: Option<u64>,
    /// Unix seconds.
    pub last_viewed_at: Option<i64>,
    pub thumb: Option<String>,
    pub index: Option<u32>,
    pub parent_index: Option<u32>,
    #[serde(
        rename = "playlistItemID",
        default,
        deserialize_with = "deserialize_optional_string_or_number"
    )]
    pub playlist_item_id: Option<String>,
    #[serde(rename = "Media", default)]
    pub media: Vec<PlexMedia>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlexMedia {
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(rename = "Part", default)]
    pub parts: Vec<PlexPart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlexPart {
    pub key: Option<String>,
}
