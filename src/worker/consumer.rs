use std::{sync::Arc, time::Duration};

use anyhow::{Error, Result};
use futures_util::{StreamExt, stream};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    error::NotificationError,
    models::message::ReceivedMessage,
    worker::{MessageProcessor, MessageReceiver},
};

pub const MAX_BATCH_SIZE: usize = 10;
const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Receive loop that settles every message according to the processor outcome.
///
/// Messages of a batch are settled in the order they were received. Up to
/// `max_concurrent_calls` of them may be in the processor at once; with the default
/// of one, each message is processed and settled before the next one starts.
pub struct NotificationConsumer<R, P> {
    receiver: Arc<R>,
    processor: Arc<P>,
    max_concurrent_calls: usize,
    receive_error_backoff: Duration,
}

impl<R: MessageReceiver, P: MessageProcessor> NotificationConsumer<R, P> {
    pub fn new(receiver: Arc<R>, processor: Arc<P>) -> Self {
        Self {
            receiver,
            processor,
            max_concurrent_calls: 1,
            receive_error_backoff: RECEIVE_ERROR_BACKOFF,
        }
    }

    pub fn with_max_concurrent_calls(mut self, max_concurrent_calls: usize) -> Self {
        self.max_concurrent_calls = max_concurrent_calls.max(1);
        self
    }

    pub fn with_receive_error_backoff(mut self, backoff: Duration) -> Self {
        self.receive_error_backoff = backoff;
        self
    }

    /// Runs until `shutdown` is cancelled. Cancellation is not an error.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), Error> {
        info!(
            max_concurrent_calls = self.max_concurrent_calls,
            "Worker is running. Listening for messages..."
        );

        loop {
            let received = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping consumer");
                    return Ok(());
                }
                received = self.receiver.receive_messages(MAX_BATCH_SIZE) => received,
            };

            match received {
                Ok(batch) => self.process_batch(batch).await,
                Err(e) => {
                    error!(error = %e, "Error receiving messages");
                    tokio::select! {
                        _ = shutdown.cancelled() => return Ok(()),
                        _ = tokio::time::sleep(self.receive_error_backoff) => {}
                    }
                }
            }
        }
    }

    pub async fn process_batch(&self, batch: Vec<ReceivedMessage>) {
        let processor = &self.processor;

        let mut outcomes = stream::iter(batch)
            .map(|message| async move {
                let result = processor
                    .process_message(&message.message_id, &message.content_type, &message.body)
                    .await;
                (message, result)
            })
            .buffered(self.max_concurrent_calls);

        while let Some((message, result)) = outcomes.next().await {
            self.settle(&message, result).await;
        }
    }

    async fn settle(&self, message: &ReceivedMessage, result: Result<(), NotificationError>) {
        let message_id = message.message_id.as_str();

        match result {
            Ok(()) => {
                if let Err(e) = self.receiver.complete(message).await {
                    error!(message_id, error = %e, "Error completing message");
                }
            }
            Err(e) => {
                warn!(
                    message_id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Error processing message, abandoning for retry"
                );
                if let Err(abandon_err) = self.receiver.abandon(message).await {
                    error!(message_id, error = %abandon_err, "Error abandoning message");
                }
            }
        }
    }
}
