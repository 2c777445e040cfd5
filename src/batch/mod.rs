//! Scheduled pull-map-push of the external news feed.

pub mod job;
pub mod orchestrator;
pub mod scheduler;

use async_trait::async_trait;

/// A unit of work the scheduler fires on each tick.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self);
}
