use async_trait::async_trait;
use reeltok::backends::{BackendError, BackendResult, FavoritesScope, MediaClient, VideoQuery};
use reeltok::backends::orientation;
use reeltok::models::*;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// In-memory server. Root listings come from `root`, drill-downs from
/// `children` keyed by parent id. Favorites live in one list per scope,
/// newest last.
#[derive(Debug)]
pub struct MockClient {
    pub profile: ServerProfile,
    pub libraries: Vec<Library>,
    pub root: Vec<NormalizedItem>,
    pub children: HashMap<String, Vec<NormalizedItem>>,
    pub favorites: Mutex<HashMap<FavoritesScope, Vec<MediaItemId>>>,
    pub queries: Mutex<Vec<VideoQuery>>,
    pub error_mode: Arc<Mutex<Option<BackendError>>>,
    pub favorites_error: Arc<Mutex<Option<BackendError>>>,
    pub failing_toggles: Mutex<HashSet<MediaItemId>>,
    page_gate: Option<Arc<Semaphore>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            profile: ServerProfile {
                username: "tester".to_string(),
                user_id: UserId::new("user-1"),
                token: "token-1".to_string(),
                ..ServerProfile::unauthenticated("http://mock.local", ServerType::Emby)
            },
            libraries: vec![
                Library::new("movies", "Movies").with_collection_type("movies"),
                Library::new("tv", "TV").with_collection_type("tvshows"),
            ],
            root: Vec::new(),
            children: HashMap::new(),
            favorites: Mutex::new(HashMap::new()),
            queries: Mutex::new(Vec::new()),
            error_mode: Arc::new(Mutex::new(None)),
            favorites_error: Arc::new(Mutex::new(None)),
            failing_toggles: Mutex::new(HashSet::new()),
            page_gate: None,
        }
    }

    pub fn with_root(mut self, items: Vec<NormalizedItem>) -> Self {
        self.root = items;
        self
    }

    pub fn with_children(mut self, parent_id: &str, items: Vec<NormalizedItem>) -> Self {
        self.children.insert(parent_id.to_string(), items);
        self
    }

    /// Seeds a favorites playlist; the last id is the newest entry.
    pub fn with_favorites(self, scope: FavoritesScope, ids: &[&str]) -> Self {
        self.favorites
            .lock()
            .unwrap()
            .insert(scope, ids.iter().map(|id| MediaItemId::new(*id)).collect());
        self
    }

    /// Holds every `get_videos` call until [`MockClient::release_pages`]
    /// lets it through.
    pub fn gated(mut self) -> Self {
        self.page_gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    pub fn release_pages(&self, count: usize) {
        if let Some(gate) = &self.page_gate {
            gate.add_permits(count);
        }
    }

    pub fn inject_error(&self, error: BackendError) {
        *self.error_mode.lock().unwrap() = Some(error);
    }

    pub fn clear_error(&self) {
        *self.error_mode.lock().unwrap() = None;
    }

    pub fn fail_favorites(&self, error: BackendError) {
        *self.favorites_error.lock().unwrap() = Some(error);
    }

    pub fn fail_toggle_for(&self, id: &str) {
        self.failing_toggles
            .lock()
            .unwrap()
            .insert(MediaItemId::new(id));
    }

    pub fn queries(&self) -> Vec<VideoQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn last_query(&self) -> Option<VideoQuery> {
        self.queries.lock().unwrap().last().cloned()
    }

    pub fn favorite_ids(&self, scope: &FavoritesScope) -> Vec<MediaItemId> {
        self.favorites
            .lock()
            .unwrap()
            .get(scope)
            .cloned()
            .unwrap_or_default()
    }

    fn check_error(&self) -> BackendResult<()> {
        if let Some(error) = self.error_mode.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(())
    }

    fn find(&self, id: &MediaItemId) -> Option<NormalizedItem> {
        self.root
            .iter()
            .chain(self.children.values().flatten())
            .find(|item| &item.id == id)
            .cloned()
    }

    fn listing(&self, query: &VideoQuery) -> PagedResponse {
        if query.feed_type == FeedType::Favorites {
            let scope = FavoritesScope::for_library(query.library.as_ref());
            let mut items: Vec<NormalizedItem> = self
                .favorite_ids(&scope)
                .iter()
                .rev()
                .filter_map(|id| self.find(id))
                .collect();
            items = orientation::filter(items, query.orientation);
            let total = items.len() as u64;
            let page: Vec<_> = items
                .into_iter()
                .skip(query.skip as usize)
                .take(query.limit)
                .collect();
            return PagedResponse {
                next_skip: query.skip + query.limit as u64,
                items: page,
                total_count: total,
            };
        }

        let mut source = match &query.parent_id {
            Some(parent) => self
                .children
                .get(parent.as_str())
                .cloned()
                .unwrap_or_default(),
            None => self.root.clone(),
        };
        if query.feed_type == FeedType::Random {
            source.reverse();
        }

        let total = source.len() as u64;
        let raw: Vec<_> = source
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit)
            .collect();
        let next_skip = query.skip + raw.len() as u64;
        let items = if query.parent_id.is_some() {
            raw
        } else {
            orientation::filter(raw, query.orientation)
        };

        PagedResponse {
            items,
            next_skip,
            total_count: total,
        }
    }
}

#[async_trait]
impl MediaClient for MockClient {
    fn profile(&self) -> &ServerProfile {
        &self.profile
    }

    async fn authenticate(
        &self,
        username: &str,
        _credential: &str,
    ) -> BackendResult<ServerProfile> {
        self.check_error()?;
        Ok(ServerProfile {
            username: username.to_string(),
            ..self.profile.clone()
        })
    }

    async fn get_libraries(&self) -> BackendResult<Vec<Library>> {
        self.check_error()?;
        Ok(self.libraries.clone())
    }

    async fn get_videos(&self, query: &VideoQuery) -> BackendResult<PagedResponse> {
        self.queries.lock().unwrap().push(query.clone());

        if let Some(gate) = self.page_gate.clone() {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| BackendError::Network(e.to_string()))?;
            permit.forget();
        }

        self.check_error()?;
        Ok(self.listing(query))
    }

    fn video_url(&self, item: &NormalizedItem) -> String {
        format!("{}/videos/{}/stream", self.profile.base_url(), item.id)
    }

    fn image_url(&self, item_id: &MediaItemId, tag: Option<&str>, kind: ImageKind) -> String {
        match tag {
            Some(tag) => format!(
                "{}/items/{}/{}?tag={}",
                self.profile.base_url(),
                item_id,
                kind.as_str(),
                tag
            ),
            None => String::new(),
        }
    }

    async fn get_favorites(&self, scope: &FavoritesScope) -> BackendResult<FavoritesSet> {
        if let Some(error) = self.favorites_error.lock().unwrap().clone() {
            return Err(error);
        }
        self.check_error()?;
        Ok(self.favorite_ids(scope).into_iter().collect())
    }

    async fn toggle_favorite(
        &self,
        item_id: &MediaItemId,
        currently_favorite: bool,
        scope: &FavoritesScope,
    ) -> BackendResult<()> {
        self.check_error()?;
        if self.failing_toggles.lock().unwrap().contains(item_id) {
            return Err(BackendError::Status {
                status: 500,
                message: format!("cannot update {}", item_id),
            });
        }

        let mut favorites = self.favorites.lock().unwrap();
        let playlist = favorites.entry(scope.clone()).or_default();
        if currently_favorite {
            playlist.retain(|id| id != item_id);
        } else if !playlist.contains(item_id) {
            playlist.push(item_id.clone());
        }
        Ok(())
    }
}

/// A playable item; portrait unless `landscape`.
pub fn video(id: &str, landscape: bool) -> NormalizedItem {
    let item = NormalizedItem::new(id, format!("Video {}", id), ItemKind::Video);
    if landscape {
        item.with_dimensions(1920, 1080)
    } else {
        item.with_dimensions(1080, 1920)
    }
}

pub fn videos(prefix: &str, count: usize) -> Vec<NormalizedItem> {
    (0..count)
        .map(|i| video(&format!("{}{}", prefix, i), false))
        .collect()
}

pub fn container(id: &str, kind: ItemKind) -> NormalizedItem {
    NormalizedItem::new(id, format!("Container {}", id), kind)
}
