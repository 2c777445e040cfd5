//! Broker → push gateway pipeline.

pub mod consumer;
pub mod processor;

use anyhow::Error;
use async_trait::async_trait;

use crate::{
    error::NotificationError,
    models::message::{NotificationMessage, ReceivedMessage},
};

/// Source of broker messages that must be explicitly settled.
#[async_trait]
pub trait MessageReceiver: Send + Sync {
    async fn receive_messages(&self, max_messages: usize) -> Result<Vec<ReceivedMessage>, Error>;

    /// Removes the message from the subscription.
    async fn complete(&self, message: &ReceivedMessage) -> Result<(), Error>;

    /// Releases the message for immediate redelivery.
    async fn abandon(&self, message: &ReceivedMessage) -> Result<(), Error>;
}

#[async_trait]
pub trait MessageProcessor: Send + Sync {
    async fn process_message(
        &self,
        message_id: &str,
        content_type: &str,
        body: &[u8],
    ) -> Result<(), NotificationError>;
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_notification(
        &self,
        msg: &NotificationMessage,
        message_id: &str,
    ) -> Result<(), NotificationError>;
}
