//! Task source abstraction for pluggable dispatch backends

use anyhow::Result;
use async_trait::async_trait;
use dispatch_shared::{DroneId, TaskPayload};

/// Something a drone can register with and receive work from
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Register as available and wait until a task is assigned
    ///
    /// May block for an unbounded time; the dispatch side decides when a task arrives.
    async fn next_task(&self, drone_id: DroneId) -> Result<TaskPayload>;

    /// Human-readable name for this source
    fn name(&self) -> &'static str;
}
