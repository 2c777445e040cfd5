use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    batch::{ScheduledJob, orchestrator::Orchestrator},
    models::job::JobOutcome,
};

const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Runs the orchestrator once, refiring in-process up to `max_retries` times.
pub struct NotificationJob {
    orchestrator: Arc<dyn Orchestrator>,
    max_retries: u32,
    retry_delay: Duration,
}

impl NotificationJob {
    pub fn new(orchestrator: Arc<dyn Orchestrator>, max_retries: u32) -> Self {
        Self {
            orchestrator,
            max_retries,
            retry_delay: RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Never fails: exhaustion is logged and the run is dropped until the next tick.
    pub async fn execute(&self) -> JobOutcome {
        info!(max_retries = self.max_retries, "Starting NotificationJob execution");

        let mut retry_count = 0;

        loop {
            match self
                .orchestrator
                .orchestrate_notification_preferences_update()
                .await
            {
                Ok(()) => {
                    info!(retry_count, "NotificationJob completed successfully");
                    return JobOutcome::Succeeded {
                        attempts: retry_count + 1,
                    };
                }
                Err(e) if retry_count < self.max_retries => {
                    retry_count += 1;
                    warn!(
                        error = %e,
                        retry_count,
                        max_retries = self.max_retries,
                        "NotificationJob failed, refiring"
                    );
                    sleep(self.retry_delay).await;
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        max_retries = self.max_retries,
                        "Max retries reached for NotificationJob, giving up until next run"
                    );
                    return JobOutcome::Exhausted {
                        attempts: retry_count + 1,
                    };
                }
            }
        }
    }
}

#[async_trait]
impl ScheduledJob for NotificationJob {
    fn name(&self) -> &str {
        "notification_job"
    }

    async fn run(&self) {
        self.execute().await;
    }
}
