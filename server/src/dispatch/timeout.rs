//! Periodic eviction of tasks nobody came back for

use super::dispatcher::Dispatcher;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::info;

/// Sweeps the queue for assigned entries whose drone never issued its `GET /actions`
pub struct CollectionReaper {
    dispatcher: Arc<Dispatcher>,
    check_interval: Duration,
}

impl CollectionReaper {
    /// Create a new reaper
    pub fn new(dispatcher: Arc<Dispatcher>, check_interval: Duration) -> Self {
        Self {
            dispatcher,
            check_interval,
        }
    }

    /// Start the eviction loop
    pub async fn run(&self) {
        let mut ticker = interval(self.check_interval);

        loop {
            ticker.tick().await;

            let evicted = self.dispatcher.evict_uncollected();
            if !evicted.is_empty() {
                info!(
                    count = evicted.len(),
                    queue_len = self.dispatcher.queue_len(),
                    "Cleaned up uncollected entries"
                );
            }
        }
    }
}
