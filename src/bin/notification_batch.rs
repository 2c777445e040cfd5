use std::sync::Arc;

use anyhow::{Error, Result};
use notification_worker::{
    batch::{job::NotificationJob, orchestrator::OrchestratorService, scheduler::Scheduler},
    clients::news::{ExternalNewsClient, NotificationNewsClient},
    config::BatchConfig,
    runtime::{init_tracing, shutdown_signal},
};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();
    info!("Initializing notification batch...");

    let config = BatchConfig::load()?;
    let job_config = config.job_config();

    let external = Arc::new(ExternalNewsClient::new(&config.external_service())?);
    let internal = Arc::new(NotificationNewsClient::new(&config.notification_service())?);
    let orchestrator = Arc::new(OrchestratorService::new(external, internal));

    let job = Arc::new(NotificationJob::new(orchestrator, job_config.max_retries));
    let scheduler = Scheduler::new(&job_config.cron)?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutting down application...");
        signal_token.cancel();
    });

    scheduler.run(job, shutdown).await;

    info!("Shutdown complete.");
    Ok(())
}
