//! Connection manager with automatic reconnection

use crate::transport::TaskSource;
use anyhow::{anyhow, Result};
use dispatch_shared::{limits, DroneId, TaskPayload};
use std::time::Duration;
use tracing::{info, warn};

/// Configuration for connection manager
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// ID this drone registers under
    pub drone_id: DroneId,
    /// Reconnection delay (initial)
    pub reconnect_delay: Duration,
    /// Maximum reconnection delay
    pub max_reconnect_delay: Duration,
    /// Consecutive failures tolerated before giving up; `None` retries forever
    pub max_failures: Option<u32>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            drone_id: DroneId(1),
            reconnect_delay: Duration::from_millis(limits::RECONNECT_DELAY_MS),
            max_reconnect_delay: Duration::from_millis(limits::MAX_RECONNECT_DELAY_MS),
            max_failures: None,
        }
    }
}

/// Keeps a drone registered with its task source until work arrives
pub struct ConnectionManager<S> {
    config: ConnectionConfig,
    source: S,
}

impl<S: TaskSource> ConnectionManager<S> {
    pub fn new(config: ConnectionConfig, source: S) -> Self {
        Self { config, source }
    }

    /// Get the drone ID
    pub fn drone_id(&self) -> DroneId {
        self.config.drone_id
    }

    /// Wait for the next task, reconnecting on failure
    pub async fn next_task(&self) -> Result<TaskPayload> {
        let mut reconnect_delay = self.config.reconnect_delay;
        let mut failures = 0u32;

        loop {
            match self.source.next_task(self.config.drone_id).await {
                Ok(task) => {
                    if failures > 0 {
                        info!(source = self.source.name(), "Reconnected after {} failures", failures);
                    }
                    return Ok(task);
                }
                Err(e) => {
                    failures += 1;
                    warn!(
                        source = self.source.name(),
                        failures,
                        retry_in = ?reconnect_delay,
                        "Connection failed: {:#}",
                        e
                    );

                    if self.config.max_failures.is_some_and(|max| failures >= max) {
                        return Err(anyhow!("giving up after {} failures: {:#}", failures, e));
                    }
                }
            }

            // Wait before reconnecting
            tokio::time::sleep(reconnect_delay).await;

            // Exponential backoff
            reconnect_delay = std::cmp::min(reconnect_delay * 2, self.config.max_reconnect_delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails a fixed number of times, then hands out a task
    struct FlakySource {
        failures_left: AtomicU32,
        calls: AtomicU32,
    }

    impl FlakySource {
        fn new(failures: u32) -> Self {
            Self {
                failures_left: AtomicU32::new(failures),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl TaskSource for FlakySource {
        async fn next_task(&self, drone_id: DroneId) -> Result<TaskPayload> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(anyhow!("connection refused"));
            }
            Ok(TaskPayload::new(drone_id.get(), vec!["deploy".into()]))
        }

        fn name(&self) -> &'static str {
            "Flaky"
        }
    }

    fn fast_config(max_failures: Option<u32>) -> ConnectionConfig {
        ConnectionConfig {
            drone_id: DroneId(7),
            reconnect_delay: Duration::from_millis(1),
            max_reconnect_delay: Duration::from_millis(4),
            max_failures,
        }
    }

    #[tokio::test]
    async fn test_retries_until_task() {
        let manager = ConnectionManager::new(fast_config(None), FlakySource::new(3));

        let task = manager.next_task().await.unwrap();
        assert_eq!(task.item_id, 7);
        assert_eq!(manager.source.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_failures() {
        let manager = ConnectionManager::new(fast_config(Some(2)), FlakySource::new(5));

        let err = manager.next_task().await.unwrap_err();
        assert!(err.to_string().contains("giving up after 2 failures"));
        assert_eq!(manager.source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_default_config() {
        let config = ConnectionConfig::default();
        assert_eq!(config.reconnect_delay, Duration::from_secs(1));
        assert_eq!(config.max_reconnect_delay, Duration::from_secs(30));
        assert!(config.max_failures.is_none());
    }
}
