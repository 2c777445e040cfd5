use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use notification_worker::{
    clients::notification_hub::NotificationHubClient,
    dedup::DeduplicationCache,
    error::NotificationError,
    models::{hub::NotificationHubConfig, message::NotificationMessage},
    worker::NotificationSender,
};

pub const HUB_NAME: &str = "mobile-hub";

pub fn hub_config(endpoint: &str, enabled: bool) -> NotificationHubConfig {
    NotificationHubConfig {
        connection_string: format!(
            "Endpoint={}/;SharedAccessKeyName=DefaultFullSharedAccessSignature;SharedAccessKey=c2VjcmV0",
            endpoint
        ),
        hub_name: HUB_NAME.to_string(),
        enabled,
        send_timeout_seconds: 5,
    }
}

pub fn hub_client(
    config: NotificationHubConfig,
) -> (Arc<NotificationHubClient>, Arc<DeduplicationCache>) {
    let dedup = Arc::new(DeduplicationCache::new());
    let client = NotificationHubClient::new(config, Arc::clone(&dedup)).unwrap();
    (Arc::new(client), dedup)
}

/// Records every notification instead of delivering it.
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<(String, NotificationMessage)>>,
    pub fail_with_status: Option<u16>,
    pub delay: Option<Duration>,
}

impl RecordingSender {
    pub fn sent_ids(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send_notification(
        &self,
        msg: &NotificationMessage,
        message_id: &str,
    ) -> Result<(), NotificationError> {
        if let Some(delay) = self.delay {
            if message_id.ends_with("slow") {
                tokio::time::sleep(delay).await;
            }
        }

        if let Some(status) = self.fail_with_status {
            return Err(NotificationError::Delivery {
                status,
                body: "unavailable".to_string(),
            });
        }

        self.sent
            .lock()
            .unwrap()
            .push((message_id.to_string(), msg.clone()));
        Ok(())
    }
}
