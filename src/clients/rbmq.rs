use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use futures_util::{FutureExt, StreamExt};
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties, Consumer, ExchangeKind,
    message::Delivery,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
        BasicQosOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{models::message::ReceivedMessage, worker::MessageReceiver};

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub url: String,
    /// Topic exchange producers publish to.
    pub topic: String,
    /// Durable queue bound to the topic; one per consuming application.
    pub subscription: String,
}

pub struct RabbitMqClient {
    channel: Channel,
    topic: String,
    subscription: String,
    consumer: Mutex<Option<Consumer>>,
}

impl RabbitMqClient {
    pub async fn connect(config: &BrokerConfig, prefetch_count: u16) -> Result<Self, Error> {
        info!("Connecting to RabbitMQ...");

        let connection = Connection::connect(&config.url, ConnectionProperties::default())
            .await
            .map_err(|e| anyhow!("Failed to connect to RabbitMQ: {}", e))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|_| anyhow!("RabbitMQ channel creation failed"))?;

        channel
            .basic_qos(prefetch_count, BasicQosOptions::default())
            .await
            .map_err(|_| anyhow!("Failed to set up QoS"))?;

        channel
            .exchange_declare(
                &config.topic,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|_| anyhow!("Failed to declare topic exchange"))?;

        channel
            .queue_declare(
                &config.subscription,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|_| anyhow!("Failed to declare subscription queue"))?;

        channel
            .queue_bind(
                &config.subscription,
                &config.topic,
                "#",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|_| anyhow!("Failed to bind subscription to topic"))?;

        info!(
            topic = %config.topic,
            subscription = %config.subscription,
            "RabbitMQ topology declared"
        );

        Ok(Self {
            channel,
            topic: config.topic.clone(),
            subscription: config.subscription.clone(),
            consumer: Mutex::new(None),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.channel.status().connected()
    }

    async fn create_consumer(&self) -> Result<Consumer, Error> {
        let consumer_tag = format!("notification_worker_{}", uuid::Uuid::new_v4());

        let consumer = self
            .channel
            .basic_consume(
                &self.subscription,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|_| anyhow!("Failed to create consumer"))?;

        info!(consumer_tag = %consumer_tag, "Consumer created for subscription");

        Ok(consumer)
    }

    pub async fn acknowledge(&self, delivery_tag: u64) -> Result<(), Error> {
        self.channel
            .basic_ack(delivery_tag, BasicAckOptions::default())
            .await
            .map_err(|_| anyhow!("Failed to acknowledge message"))?;

        Ok(())
    }

    /// Releases the delivery back to the queue for immediate redelivery.
    pub async fn requeue(&self, delivery_tag: u64) -> Result<(), Error> {
        self.channel
            .basic_nack(
                delivery_tag,
                BasicNackOptions {
                    multiple: false,
                    requeue: true,
                },
            )
            .await
            .map_err(|_| anyhow!("Failed to requeue message"))?;

        Ok(())
    }

    pub async fn publish(&self, message_id: &str, payload: &[u8]) -> Result<(), Error> {
        self.channel
            .basic_publish(
                &self.topic,
                "notification",
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default()
                    .with_message_id(message_id.into())
                    .with_content_type("application/json".into())
                    .with_delivery_mode(2),
            )
            .await
            .map_err(|_| anyhow!("Failed to publish message to topic"))?
            .await
            .map_err(|_| anyhow!("Publish was not confirmed by the broker"))?;

        Ok(())
    }

    fn to_received(delivery: Delivery) -> ReceivedMessage {
        let message_id = delivery
            .properties
            .message_id()
            .as_ref()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default();

        let content_type = delivery
            .properties
            .content_type()
            .as_ref()
            .map(|ct| ct.as_str().to_string())
            .unwrap_or_default();

        ReceivedMessage {
            message_id,
            content_type,
            body: delivery.data,
            delivery_tag: delivery.delivery_tag,
        }
    }
}

#[async_trait]
impl MessageReceiver for RabbitMqClient {
    /// Waits for one delivery, then drains whatever else is already buffered up to
    /// `max_messages`.
    async fn receive_messages(&self, max_messages: usize) -> Result<Vec<ReceivedMessage>, Error> {
        let mut guard = self.consumer.lock().await;
        if guard.is_none() {
            *guard = Some(self.create_consumer().await?);
        }
        let consumer = guard
            .as_mut()
            .ok_or_else(|| anyhow!("Consumer unavailable"))?;

        let first = match consumer.next().await {
            Some(delivery) => delivery.map_err(|e| anyhow!("Failed to receive message: {}", e))?,
            None => {
                *guard = None;
                return Err(anyhow!("Consumer stream closed"));
            }
        };

        let mut batch = vec![Self::to_received(first)];

        while batch.len() < max_messages {
            match consumer.next().now_or_never() {
                Some(Some(Ok(delivery))) => batch.push(Self::to_received(delivery)),
                Some(Some(Err(e))) => {
                    warn!(error = %e, "Delivery error while draining batch");
                    break;
                }
                _ => break,
            }
        }

        debug!(batch_size = batch.len(), "Received message batch");

        Ok(batch)
    }

    async fn complete(&self, message: &ReceivedMessage) -> Result<(), Error> {
        self.acknowledge(message.delivery_tag).await
    }

    async fn abandon(&self, message: &ReceivedMessage) -> Result<(), Error> {
        self.requeue(message.delivery_tag).await
    }
}
