use std::sync::Arc;

use anyhow::{Error, Result, anyhow};
use notification_worker::{
    api::run_api_server,
    clients::{health::HealthChecker, notification_hub::NotificationHubClient, rbmq::RabbitMqClient},
    config::WorkerConfig,
    dedup::DeduplicationCache,
    runtime::{init_tracing, shutdown_signal},
    worker::{
        consumer::{MAX_BATCH_SIZE, NotificationConsumer},
        processor::NotificationProcessor,
    },
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();
    info!("Initializing notification worker...");

    let config = WorkerConfig::load()?;
    let hub_config = config.notification_hub_config();

    let dedup = Arc::new(DeduplicationCache::with_ttl(config.idempotency_ttl()));
    let hub_client = Arc::new(
        NotificationHubClient::new(hub_config.clone(), Arc::clone(&dedup))
            .map_err(|e| anyhow!("Error initializing notification hub client: {}", e))?,
    );
    let processor = Arc::new(NotificationProcessor::new(hub_client));

    let broker = Arc::new(
        RabbitMqClient::connect(&config.broker_config(), MAX_BATCH_SIZE as u16).await?,
    );

    let shutdown = CancellationToken::new();

    let cleanup = dedup.spawn_cleanup_task(config.dedup_cleanup_interval(), shutdown.clone());

    let health_checker = HealthChecker::new(Arc::clone(&broker), hub_config, Arc::clone(&dedup));
    let api = tokio::spawn(run_api_server(
        health_checker,
        config.server_port,
        shutdown.clone(),
    ));

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received...");
        signal_token.cancel();
    });

    let consumer = NotificationConsumer::new(broker, processor)
        .with_max_concurrent_calls(config.max_concurrent_calls());

    if let Err(e) = consumer.run(shutdown.clone()).await {
        error!(error = %e, "Worker stopped with error");
    }

    shutdown.cancel();
    if let Err(e) = cleanup.await {
        error!(error = %e, "Deduplication cleanup task failed");
    }
    match api.await {
        Ok(Err(e)) => error!(error = %e, "Health server stopped with error"),
        Err(e) => error!(error = %e, "Health server task failed"),
        Ok(Ok(())) => {}
    }

    info!("Shutdown complete.");
    Ok(())
}
