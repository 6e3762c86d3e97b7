use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::state::{FeedCommand, FeedEvent, FeedState, PageRequest, ViewMode};
use crate::backends::MediaClient;
use crate::config::FeedConfig;
use crate::models::{FeedType, Library, MediaItemId, OrientationMode};

/// Owns the feed state and runs the commands its transitions ask for.
///
/// Events are applied one at a time in arrival order. Network calls run on
/// their own tasks and report back as events, so a slow request never
/// blocks navigation.
pub struct FeedController {
    client: Arc<dyn MediaClient>,
    state: FeedState,
    receiver: mpsc::UnboundedReceiver<FeedEvent>,
    events: mpsc::UnboundedSender<FeedEvent>,
    state_tx: watch::Sender<FeedState>,
    shutdown: CancellationToken,
    page_token: CancellationToken,
}

impl FeedController {
    pub fn new(client: Arc<dyn MediaClient>, config: &FeedConfig) -> (FeedHandle, FeedController) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let state = FeedState::new(config);
        let (state_tx, state_rx) = watch::channel(state.clone());
        let shutdown = CancellationToken::new();

        let controller = FeedController {
            client,
            state,
            receiver,
            events: sender.clone(),
            state_tx,
            page_token: shutdown.child_token(),
            shutdown: shutdown.clone(),
        };
        let handle = FeedHandle {
            sender,
            state: state_rx,
            shutdown,
            task: None,
        };

        (handle, controller)
    }

    /// Builds the controller and runs it on the current runtime.
    pub fn spawn(client: Arc<dyn MediaClient>, config: &FeedConfig) -> FeedHandle {
        let (mut handle, controller) = Self::new(client, config);
        handle.task = Some(tokio::spawn(controller.run()));
        handle
    }

    pub async fn run(mut self) {
        debug!("FeedController event loop started");

        let commands = self.state.start();
        self.publish();
        self.execute_all(commands);

        loop {
            let event = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                event = self.receiver.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            trace!("Applying {:?}", event);
            let logout = matches!(event, FeedEvent::Logout);
            let commands = self.state.dispatch(event);
            self.publish();
            if logout {
                break;
            }
            self.execute_all(commands);
        }

        self.page_token.cancel();
        debug!("FeedController event loop stopped");
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }

    fn execute_all(&mut self, commands: Vec<FeedCommand>) {
        for command in commands {
            self.execute(command);
        }
    }

    fn execute(&mut self, command: FeedCommand) {
        let client = Arc::clone(&self.client);
        let events = self.events.clone();

        match command {
            FeedCommand::FetchLibraries => {
                tokio::spawn(async move {
                    let result = client.get_libraries().await;
                    let _ = events.send(FeedEvent::LibrariesLoaded(result));
                });
            }
            FeedCommand::FetchPage(request) => {
                // Only one page load is ever outstanding; a new one supersedes it.
                self.page_token.cancel();
                self.page_token = self.shutdown.child_token();
                let token = self.page_token.clone();
                tokio::spawn(fetch_page(client, request, token, events));
            }
            FeedCommand::FetchFavorites { epoch, scope } => {
                tokio::spawn(async move {
                    let result = client.get_favorites(&scope).await;
                    let _ = events.send(FeedEvent::FavoritesLoaded { epoch, result });
                });
            }
            FeedCommand::ToggleFavorite {
                id,
                was_favorite,
                scope,
            } => {
                tokio::spawn(async move {
                    let result = client.toggle_favorite(&id, was_favorite, &scope).await;
                    let _ = events.send(FeedEvent::FavoriteToggled {
                        scope,
                        id,
                        was_favorite,
                        result,
                    });
                });
            }
        }
    }
}

async fn fetch_page(
    client: Arc<dyn MediaClient>,
    request: PageRequest,
    token: CancellationToken,
    events: mpsc::UnboundedSender<FeedEvent>,
) {
    let PageRequest { ticket, query } = request;
    tokio::select! {
        _ = token.cancelled() => {
            debug!("Page load for epoch {} cancelled", ticket.epoch);
        }
        result = client.get_videos(&query) => {
            let _ = events.send(FeedEvent::PageLoaded { ticket, result });
        }
    }
}

/// Cheap handle for driving a running [`FeedController`]. Dropping it stops
/// the controller.
pub struct FeedHandle {
    sender: mpsc::UnboundedSender<FeedEvent>,
    state: watch::Receiver<FeedState>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for FeedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedHandle")
            .field("running", &!self.shutdown.is_cancelled())
            .finish()
    }
}

impl FeedHandle {
    /// Queues an event. Returns `false` once the controller has stopped.
    pub fn dispatch(&self, event: FeedEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    /// Snapshot of the latest published state.
    pub fn state(&self) -> FeedState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state.clone()
    }

    /// Waits for the first published state matching `predicate`. `None` if
    /// the controller stops first.
    pub async fn wait_for(&self, predicate: impl FnMut(&FeedState) -> bool) -> Option<FeedState> {
        let mut receiver = self.state.clone();
        receiver.wait_for(predicate).await.ok().map(|state| state.clone())
    }

    pub fn toggle_favorite(&self, id: impl Into<MediaItemId>, was_favorite: bool) -> bool {
        self.dispatch(FeedEvent::ToggleFavorite {
            id: id.into(),
            was_favorite,
        })
    }

    pub fn navigate(&self, id: impl Into<MediaItemId>, title: impl Into<String>) -> bool {
        self.dispatch(FeedEvent::Navigate {
            id: id.into(),
            title: title.into(),
        })
    }

    pub fn go_back(&self) -> bool {
        self.dispatch(FeedEvent::GoBack)
    }

    pub fn change_feed_type(&self, feed_type: FeedType) -> bool {
        self.dispatch(FeedEvent::ChangeFeedType(feed_type))
    }

    pub fn change_orientation(&self, orientation: OrientationMode) -> bool {
        self.dispatch(FeedEvent::ChangeOrientation(orientation))
    }

    pub fn select_library(&self, library: Option<Library>) -> bool {
        self.dispatch(FeedEvent::SelectLibrary(library))
    }

    pub fn load_more(&self) -> bool {
        self.dispatch(FeedEvent::LoadMore)
    }

    pub fn reset(&self) -> bool {
        self.dispatch(FeedEvent::Reset)
    }

    pub fn set_current_index(&self, index: usize) -> bool {
        self.dispatch(FeedEvent::SetCurrentIndex(index))
    }

    pub fn set_view_mode(&self, mode: ViewMode) -> bool {
        self.dispatch(FeedEvent::SetViewMode(mode))
    }

    pub fn refresh_libraries(&self) -> bool {
        self.dispatch(FeedEvent::RefreshLibraries)
    }

    /// Clears all session state and stops the controller. Logging out ends
    /// the event loop; requests still in flight are cancelled.
    pub async fn shutdown(mut self) {
        info!("Shutting down feed controller");
        self.dispatch(FeedEvent::Logout);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        self.shutdown.cancel();
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
