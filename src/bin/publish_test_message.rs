use anyhow::{Error, Result};
use notification_worker::{
    clients::rbmq::RabbitMqClient,
    config::WorkerConfig,
    models::message::InboundNotification,
    runtime::init_tracing,
};
use tracing::info;

/// Publishes one sample notification to the configured topic.
#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = WorkerConfig::load()?;
    let broker = RabbitMqClient::connect(&config.broker_config(), 1).await?;

    let message_id = uuid::Uuid::new_v4().to_string();
    let notification = InboundNotification {
        title: Some("Test notification".to_string()),
        body: Some("Hello from the test publisher!".to_string()),
        tags: Some("test".to_string()),
        ..Default::default()
    };

    broker
        .publish(&message_id, &serde_json::to_vec(&notification)?)
        .await?;

    info!(
        message_id = %message_id,
        topic = %config.notification_topic,
        "Message sent successfully"
    );

    Ok(())
}
