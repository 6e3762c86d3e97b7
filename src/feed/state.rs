use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::nav::NavStack;
use super::resume;
use crate::backends::{BackendError, BackendResult, FavoritesScope, VideoQuery};
use crate::config::FeedConfig;
use crate::models::{
    FavoritesSet, FeedType, Library, MediaItemId, NavFrame, NormalizedItem, OrientationMode,
    PagedResponse,
};

/// Failures surfaced to whoever renders the feed. None of them is fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("Login failed: {0}")]
    Auth(BackendError),

    #[error("Failed to load videos: {0}")]
    Fetch(BackendError),

    #[error("Failed to sync favorites: {0}")]
    FavoritesSync(BackendError),

    #[error("Failed to update favorite {id}: {source}")]
    ToggleFavorite {
        id: MediaItemId,
        source: BackendError,
    },

    #[error("Failed to load libraries: {0}")]
    Libraries(BackendError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewMode {
    /// Full-screen swipe feed.
    #[default]
    Feed,
    /// Grid of a drilled-down container.
    Grid,
}

/// Identifies the load a page result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub epoch: u64,
    pub reset: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub ticket: LoadTicket,
    pub query: VideoQuery,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    SelectLibrary(Option<Library>),
    ChangeFeedType(FeedType),
    ChangeOrientation(OrientationMode),
    Navigate { id: MediaItemId, title: String },
    GoBack,
    Reset,
    LoadMore,
    SetCurrentIndex(usize),
    SetViewMode(ViewMode),
    ToggleFavorite { id: MediaItemId, was_favorite: bool },
    RefreshLibraries,
    Logout,

    LibrariesLoaded(BackendResult<Vec<Library>>),
    PageLoaded {
        ticket: LoadTicket,
        result: BackendResult<PagedResponse>,
    },
    FavoritesLoaded {
        epoch: u64,
        result: BackendResult<FavoritesSet>,
    },
    FavoriteToggled {
        scope: FavoritesScope,
        id: MediaItemId,
        was_favorite: bool,
        result: BackendResult<()>,
    },
}

/// Side effects requested by a transition. The driver runs them and feeds
/// the outcome back as events.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedCommand {
    FetchLibraries,
    FetchPage(PageRequest),
    FetchFavorites {
        epoch: u64,
        scope: FavoritesScope,
    },
    ToggleFavorite {
        id: MediaItemId,
        was_favorite: bool,
        scope: FavoritesScope,
    },
}

/// Toggles of one id still waiting for the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingToggle {
    /// Membership the newest toggle asked for.
    favorite: bool,
    in_flight: usize,
}

/// Everything the feed shows, plus the bookkeeping that keeps late
/// responses from overwriting newer state.
///
/// Transitions are synchronous and never touch the network; see
/// [`FeedState::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeedState {
    pub libraries: Vec<Library>,
    pub selected_library: Option<Library>,
    pub nav_stack: NavStack,
    pub feed_type: FeedType,
    pub orientation: OrientationMode,
    pub view_mode: ViewMode,
    pub items: Vec<NormalizedItem>,
    pub next_skip: u64,
    pub has_more: bool,
    pub current_index: usize,
    pub favorites: FavoritesSet,
    pub last_error: Option<FeedError>,
    pub is_loading: bool,
    epoch: u64,
    favorites_scope: FavoritesScope,
    pending_toggles: HashMap<MediaItemId, PendingToggle>,
    page_size: usize,
    prefetch_threshold: usize,
}

impl FeedState {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            libraries: Vec::new(),
            selected_library: None,
            nav_stack: NavStack::new(),
            feed_type: config.default_feed_type,
            orientation: config.default_orientation,
            view_mode: ViewMode::Feed,
            items: Vec::new(),
            next_skip: 0,
            has_more: true,
            current_index: 0,
            favorites: FavoritesSet::new(),
            last_error: None,
            is_loading: false,
            epoch: 0,
            favorites_scope: FavoritesScope::Root,
            pending_toggles: HashMap::new(),
            page_size: config.page_size.max(1),
            prefetch_threshold: config.prefetch_threshold,
        }
    }

    /// Commands that open a session: libraries plus the first root page.
    pub fn start(&mut self) -> Vec<FeedCommand> {
        let mut commands = vec![FeedCommand::FetchLibraries];
        commands.extend(self.begin_reset());
        commands
    }

    /// Generation counter; bumped by every reset and by logout.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn favorites_scope(&self) -> &FavoritesScope {
        &self.favorites_scope
    }

    pub fn is_favorite(&self, id: &MediaItemId) -> bool {
        self.favorites.contains(id)
    }

    pub fn current_item(&self) -> Option<&NormalizedItem> {
        self.items.get(self.current_index)
    }

    /// Item to highlight when a drilled-down list is shown as a grid.
    pub fn resume_index(&self) -> Option<usize> {
        resume::resume_index(&self.items)
    }

    pub fn dispatch(&mut self, event: FeedEvent) -> Vec<FeedCommand> {
        match event {
            FeedEvent::SelectLibrary(library) => {
                if library == self.selected_library && self.nav_stack.is_root() {
                    return Vec::new();
                }
                info!(
                    "Selecting library {:?}",
                    library.as_ref().map(|l| l.name.as_str())
                );
                self.selected_library = library;
                self.nav_stack.clear();
                self.begin_reset()
            }
            FeedEvent::ChangeFeedType(feed_type) => {
                if feed_type == self.feed_type {
                    return Vec::new();
                }
                self.feed_type = feed_type;
                self.begin_reset()
            }
            FeedEvent::ChangeOrientation(orientation) => {
                if orientation == self.orientation {
                    return Vec::new();
                }
                self.orientation = orientation;
                self.begin_reset()
            }
            FeedEvent::Navigate { id, title } => {
                debug!("Navigating into {} ({})", title, id);
                self.nav_stack.push(NavFrame::new(id, title));
                self.begin_reset()
            }
            FeedEvent::GoBack => match self.nav_stack.pop() {
                Some(frame) => {
                    debug!("Leaving {}", frame.title);
                    self.begin_reset()
                }
                None => Vec::new(),
            },
            FeedEvent::Reset => self.begin_reset(),
            FeedEvent::LoadMore => self.load_more(),
            FeedEvent::SetCurrentIndex(index) => {
                self.current_index = index.min(self.items.len().saturating_sub(1));
                if self.should_prefetch() {
                    debug!("Prefetching at index {} of {}", index, self.items.len());
                    self.load_more()
                } else {
                    Vec::new()
                }
            }
            FeedEvent::SetViewMode(mode) => {
                self.view_mode = mode;
                Vec::new()
            }
            FeedEvent::ToggleFavorite { id, was_favorite } => {
                // Optimistic; rolled back by `FavoriteToggled` on failure.
                if was_favorite {
                    self.favorites.remove(&id);
                } else {
                    self.favorites.insert(id.clone());
                }
                let pending = self
                    .pending_toggles
                    .entry(id.clone())
                    .or_insert(PendingToggle {
                        favorite: !was_favorite,
                        in_flight: 0,
                    });
                pending.favorite = !was_favorite;
                pending.in_flight += 1;
                vec![FeedCommand::ToggleFavorite {
                    id,
                    was_favorite,
                    scope: self.favorites_scope.clone(),
                }]
            }
            FeedEvent::RefreshLibraries => vec![FeedCommand::FetchLibraries],
            FeedEvent::Logout => {
                self.logout();
                Vec::new()
            }
            FeedEvent::LibrariesLoaded(result) => {
                self.libraries_loaded(result);
                Vec::new()
            }
            FeedEvent::PageLoaded { ticket, result } => {
                self.page_loaded(ticket, result);
                Vec::new()
            }
            FeedEvent::FavoritesLoaded { epoch, result } => {
                self.favorites_loaded(epoch, result);
                Vec::new()
            }
            FeedEvent::FavoriteToggled {
                scope,
                id,
                was_favorite,
                result,
            } => {
                self.favorite_toggled(scope, id, was_favorite, result);
                Vec::new()
            }
        }
    }

    fn query(&self, skip: u64) -> VideoQuery {
        let mut query = VideoQuery::new(self.feed_type, self.page_size)
            .with_skip(skip)
            .with_orientation(self.orientation);
        if let Some(library) = &self.selected_library {
            query = query.with_library(library.clone());
        }
        if let Some(parent_id) = self.nav_stack.parent_id() {
            query = query.with_parent(parent_id.clone());
        }
        query
    }

    /// Clears the list synchronously and asks for page one of the new scope.
    /// Whatever was in flight belongs to the previous epoch from here on.
    fn begin_reset(&mut self) -> Vec<FeedCommand> {
        self.epoch += 1;
        self.items.clear();
        self.next_skip = 0;
        self.has_more = true;
        self.current_index = 0;
        self.last_error = None;
        self.is_loading = true;
        if self.nav_stack.is_root() {
            self.view_mode = ViewMode::Feed;
        }

        let scope = FavoritesScope::for_library(self.selected_library.as_ref());
        if scope != self.favorites_scope {
            self.favorites.clear();
            self.pending_toggles.clear();
            self.favorites_scope = scope.clone();
        }

        debug!(
            "Reset to epoch {} (feed={:?}, depth={})",
            self.epoch,
            self.feed_type,
            self.nav_stack.depth()
        );

        vec![
            FeedCommand::FetchPage(PageRequest {
                ticket: LoadTicket {
                    epoch: self.epoch,
                    reset: true,
                },
                query: self.query(0),
            }),
            FeedCommand::FetchFavorites {
                epoch: self.epoch,
                scope,
            },
        ]
    }

    fn load_more(&mut self) -> Vec<FeedCommand> {
        if self.is_loading {
            debug!("Load already in flight, dropping load more");
            return Vec::new();
        }
        if !self.has_more {
            return Vec::new();
        }

        self.is_loading = true;
        vec![FeedCommand::FetchPage(PageRequest {
            ticket: LoadTicket {
                epoch: self.epoch,
                reset: false,
            },
            query: self.query(self.next_skip),
        })]
    }

    fn should_prefetch(&self) -> bool {
        self.feed_type.is_backend_paged()
            && self.has_more
            && !self.is_loading
            && !self.items.is_empty()
            && self.current_index + self.prefetch_threshold >= self.items.len()
    }

    fn page_loaded(&mut self, ticket: LoadTicket, result: BackendResult<PagedResponse>) {
        if ticket.epoch != self.epoch {
            debug!(
                "Dropping page from epoch {} (current {})",
                ticket.epoch, self.epoch
            );
            return;
        }
        self.is_loading = false;

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                warn!("Page load failed: {}", e);
                self.has_more = false;
                self.last_error = Some(FeedError::Fetch(e));
                return;
            }
        };

        self.next_skip = page.next_skip;
        self.has_more = page.has_more();

        if ticket.reset {
            self.items = page.items;
            let opened_container = self.items.first().is_some_and(|i| i.kind.is_container());
            if !self.nav_stack.is_root() && opened_container {
                self.view_mode = ViewMode::Grid;
            }
        } else {
            let seen: HashSet<MediaItemId> = self.items.iter().map(|i| i.id.clone()).collect();
            let before = self.items.len();
            self.items
                .extend(page.items.into_iter().filter(|i| !seen.contains(&i.id)));
            debug!("Appended {} items", self.items.len() - before);
        }
    }

    fn favorites_loaded(&mut self, epoch: u64, result: BackendResult<FavoritesSet>) {
        if epoch != self.epoch {
            return;
        }
        match result {
            Ok(favorites) => {
                // The server may have been read before a pending toggle landed.
                self.favorites = favorites;
                for (id, pending) in &self.pending_toggles {
                    if pending.favorite {
                        self.favorites.insert(id.clone());
                    } else {
                        self.favorites.remove(id);
                    }
                }
            }
            Err(e) => {
                // Keeps the last known set; it was emptied if the scope changed.
                warn!("Favorites sync failed: {}", e);
                self.last_error = Some(FeedError::FavoritesSync(e));
            }
        }
    }

    fn favorite_toggled(
        &mut self,
        scope: FavoritesScope,
        id: MediaItemId,
        was_favorite: bool,
        result: BackendResult<()>,
    ) {
        if scope != self.favorites_scope {
            // The set was rebuilt for another scope; only the error matters.
            if let Err(e) = result {
                warn!("Toggling favorite {} in {} failed: {}", id, scope, e);
                self.last_error = Some(FeedError::ToggleFavorite { id, source: e });
            }
            return;
        }

        let settled = match self.pending_toggles.get_mut(&id) {
            Some(pending) => {
                pending.in_flight = pending.in_flight.saturating_sub(1);
                pending.in_flight == 0
            }
            None => true,
        };
        if settled {
            self.pending_toggles.remove(&id);
        }

        let Err(e) = result else {
            return;
        };
        warn!("Toggling favorite {} failed: {}", id, e);

        // A newer toggle of the same id decides its membership.
        if settled {
            if was_favorite {
                self.favorites.insert(id.clone());
            } else {
                self.favorites.remove(&id);
            }
        }
        self.last_error = Some(FeedError::ToggleFavorite { id, source: e });
    }

    fn libraries_loaded(&mut self, result: BackendResult<Vec<Library>>) {
        match result {
            Ok(libraries) => {
                info!("Loaded {} libraries", libraries.len());
                self.libraries = libraries;
            }
            Err(e) => {
                warn!("Library listing failed: {}", e);
                self.libraries.clear();
                self.last_error = Some(FeedError::Libraries(e));
            }
        }
    }

    fn logout(&mut self) {
        info!("Clearing feed state");
        self.epoch += 1;
        self.libraries.clear();
        self.selected_library = None;
        self.nav_stack.clear();
        self.items.clear();
        self.next_skip = 0;
        self.has_more = false;
        self.current_index = 0;
        self.favorites.clear();
        self.pending_toggles.clear();
        self.favorites_scope = FavoritesScope::Root;
        self.view_mode = ViewMode::Feed;
        self.last_error = None;
        self.is_loading = false;
    }
}
