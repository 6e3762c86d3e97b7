#![allow(dead_code)]

pub mod mocks;

use mocks::MockClient;
use reeltok::backends::MediaClient;
use reeltok::config::FeedConfig;
use reeltok::feed::{FeedController, FeedHandle, FeedState};
use std::sync::Arc;
use std::time::Duration;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TestContext {
    pub client: Arc<MockClient>,
    pub feed: FeedHandle,
}

impl TestContext {
    pub fn new(client: MockClient) -> Self {
        Self::with_config(client, test_config())
    }

    pub fn with_config(client: MockClient, config: FeedConfig) -> Self {
        let client = Arc::new(client);
        let feed = FeedController::spawn(client.clone() as Arc<dyn MediaClient>, &config);
        Self { client, feed }
    }

    /// Waits for a state matching `predicate`, failing the test on timeout.
    pub async fn settle(&self, predicate: impl FnMut(&FeedState) -> bool) -> FeedState {
        tokio::time::timeout(SETTLE_TIMEOUT, self.feed.wait_for(predicate))
            .await
            .expect("Timed out waiting for feed state")
            .expect("Feed controller stopped")
    }

    /// Waits until the load started by reset number `epoch` has finished.
    pub async fn loaded(&self, epoch: u64) -> FeedState {
        self.settle(|state| state.epoch() == epoch && !state.is_loading)
            .await
    }
}

/// Polls `condition` until it holds, for state that lives outside the feed.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(SETTLE_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("Condition never became true");
}

pub fn test_config() -> FeedConfig {
    FeedConfig {
        page_size: 5,
        prefetch_threshold: 2,
        ..FeedConfig::default()
    }
}
