use std::{
    collections::BTreeMap,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use sha2::Sha256;
use tracing::{debug, info};

use crate::{
    dedup::DeduplicationCache,
    error::NotificationError,
    models::{
        hub::{ConnectionDescriptor, NotificationHubConfig},
        message::NotificationMessage,
    },
    worker::NotificationSender,
};

type HmacSha256 = Hmac<Sha256>;

const API_VERSION: &str = "2015-01";
const TOKEN_VALIDITY_SECS: u64 = 60 * 60;

pub const FORMAT_HEADER: &str = "ServiceBusNotification-Format";
pub const TAGS_HEADER: &str = "ServiceBusNotification-Tags";

/// Sends template notifications to the push gateway REST API.
pub struct NotificationHubClient {
    http_client: Client,
    config: NotificationHubConfig,
    dedup: Arc<DeduplicationCache>,
}

impl NotificationHubClient {
    pub fn new(
        config: NotificationHubConfig,
        dedup: Arc<DeduplicationCache>,
    ) -> Result<Self, NotificationError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.send_timeout_seconds))
            .build()
            .map_err(|e| {
                NotificationError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        info!(
            hub_name = %config.hub_name,
            enabled = config.enabled,
            "Notification hub client initialized"
        );

        Ok(Self {
            http_client,
            config,
            dedup,
        })
    }

    pub fn config(&self) -> &NotificationHubConfig {
        &self.config
    }

    async fn deliver(
        &self,
        msg: &NotificationMessage,
        message_id: &str,
    ) -> Result<(), NotificationError> {
        let descriptor = parse_connection_string(&self.config.connection_string)?;
        let url = messages_url(&descriptor.endpoint, &self.config.hub_name);

        let expiry = unix_now() + TOKEN_VALIDITY_SECS;
        let token = generate_sas_token(&url, &descriptor.key_name, &descriptor.key, expiry)?;

        let properties = template_properties(msg, message_id);
        let body = serde_json::to_vec(&properties).map_err(|e| {
            NotificationError::Configuration(format!("Failed to encode template properties: {}", e))
        })?;

        let mut request = self
            .http_client
            .post(&url)
            .header("Authorization", token)
            .header("Content-Type", "application/json;charset=utf-8")
            .header(FORMAT_HEADER, "template");

        if let Some(tags) = msg.tag_expression.as_deref().filter(|t| !t.is_empty()) {
            request = request.header(TAGS_HEADER, tags);
        }

        debug!(message_id, url = %url, "Posting template notification");

        let response = request.body(body).send().await?;
        let status = response.status();

        if status == StatusCode::OK || status == StatusCode::CREATED {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(NotificationError::Delivery {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl NotificationSender for NotificationHubClient {
    async fn send_notification(
        &self,
        msg: &NotificationMessage,
        message_id: &str,
    ) -> Result<(), NotificationError> {
        if !self.config.enabled {
            info!(message_id, "Notification hub is disabled, skipping notification");
            return Ok(());
        }

        if self.dedup.is_duplicate(message_id).await {
            return Err(NotificationError::DuplicateMessage(message_id.to_string()));
        }

        self.deliver(msg, message_id).await?;

        self.dedup.mark_as_processed(message_id).await;

        info!(message_id, "Notification accepted by push gateway");
        Ok(())
    }
}

/// Parses `Endpoint=...;SharedAccessKeyName=...;SharedAccessKey=...`.
pub fn parse_connection_string(
    connection_string: &str,
) -> Result<ConnectionDescriptor, NotificationError> {
    let mut endpoint = "";
    let mut key_name = "";
    let mut key = "";

    for part in connection_string.split(';').map(str::trim) {
        if let Some(value) = part.strip_prefix("Endpoint=") {
            endpoint = value;
        } else if let Some(value) = part.strip_prefix("SharedAccessKeyName=") {
            key_name = value;
        } else if let Some(value) = part.strip_prefix("SharedAccessKey=") {
            key = value;
        }
    }

    if endpoint.is_empty() || key_name.is_empty() || key.is_empty() {
        return Err(NotificationError::Configuration(
            "Invalid notification hub connection string".to_string(),
        ));
    }

    Ok(ConnectionDescriptor {
        endpoint: endpoint.to_string(),
        key_name: key_name.to_string(),
        key: key.to_string(),
    })
}

pub fn messages_url(endpoint: &str, hub_name: &str) -> String {
    let mut base = match endpoint.strip_prefix("sb://") {
        Some(rest) => format!("https://{}", rest),
        None => endpoint.to_string(),
    };

    if !base.ends_with('/') {
        base.push('/');
    }

    format!("{}{}/messages/?api-version={}", base, hub_name, API_VERSION)
}

/// Builds a `SharedAccessSignature` authorization value for `uri`, valid until
/// `expiry` (unix seconds).
pub fn generate_sas_token(
    uri: &str,
    key_name: &str,
    key: &str,
    expiry: u64,
) -> Result<String, NotificationError> {
    let target_uri = urlencoding::encode(uri).to_lowercase();
    let to_sign = format!("{}\n{}", target_uri, expiry);

    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| NotificationError::Configuration(format!("Invalid signing key: {}", e)))?;
    mac.update(to_sign.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    Ok(format!(
        "SharedAccessSignature sr={}&sig={}&se={}&skn={}",
        target_uri,
        urlencoding::encode(&signature),
        expiry,
        key_name
    ))
}

/// Flat string properties consumed by the registered templates. Entries from
/// `data` are applied last and win over the built-in keys.
pub fn template_properties(msg: &NotificationMessage, message_id: &str) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    properties.insert("title".to_string(), msg.title.clone());
    properties.insert("message".to_string(), msg.body.clone());
    properties.insert("messageId".to_string(), message_id.to_string());

    for (key, value) in &msg.data {
        let value = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };
        properties.insert(key.clone(), value);
    }

    properties
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONNECTION: &str = "Endpoint=sb://push-ns.servicebus.windows.net/;SharedAccessKeyName=DefaultFullSharedAccessSignature;SharedAccessKey=c2VjcmV0LWtleQ==";

    #[test]
    fn test_parse_connection_string() {
        let descriptor = parse_connection_string(CONNECTION).unwrap();

        assert_eq!(descriptor.endpoint, "sb://push-ns.servicebus.windows.net/");
        assert_eq!(descriptor.key_name, "DefaultFullSharedAccessSignature");
        assert_eq!(descriptor.key, "c2VjcmV0LWtleQ==");
    }

    #[test]
    fn test_parse_connection_string_missing_key() {
        let result = parse_connection_string(
            "Endpoint=sb://push-ns.servicebus.windows.net/;SharedAccessKeyName=Full",
        );

        assert!(matches!(result, Err(NotificationError::Configuration(_))));
    }

    #[test]
    fn test_messages_url_swaps_scheme() {
        assert_eq!(
            messages_url("sb://push-ns.servicebus.windows.net/", "mobile-hub"),
            "https://push-ns.servicebus.windows.net/mobile-hub/messages/?api-version=2015-01"
        );
        assert_eq!(
            messages_url("sb://push-ns.servicebus.windows.net", "mobile-hub"),
            "https://push-ns.servicebus.windows.net/mobile-hub/messages/?api-version=2015-01"
        );
    }

    #[test]
    fn test_sas_token_is_deterministic() {
        let url = messages_url("sb://push-ns.servicebus.windows.net/", "mobile-hub");

        let first = generate_sas_token(&url, "Full", "secret", 1_700_000_000).unwrap();
        let second = generate_sas_token(&url, "Full", "secret", 1_700_000_000).unwrap();
        let other_expiry = generate_sas_token(&url, "Full", "secret", 1_700_000_001).unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other_expiry);
    }

    #[test]
    fn test_sas_token_layout() {
        let url = "https://push-ns.servicebus.windows.net/mobile-hub/messages/?api-version=2015-01";
        let token = generate_sas_token(url, "Full", "secret", 1_700_000_000).unwrap();

        let target = "https%3a%2f%2fpush-ns.servicebus.windows.net%2fmobile-hub%2fmessages%2f%3fapi-version%3d2015-01";
        assert!(token.starts_with(&format!("SharedAccessSignature sr={}&sig=", target)));
        assert!(token.ends_with("&se=1700000000&skn=Full"));

        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(format!("{}\n1700000000", target).as_bytes());
        let expected_sig = STANDARD.encode(mac.finalize().into_bytes());
        assert!(token.contains(&format!("&sig={}&", urlencoding::encode(&expected_sig))));
    }

    #[test]
    fn test_template_properties_stringify_data() {
        let msg = NotificationMessage::new("Hello", "World")
            .with_data("count", serde_json::json!(3))
            .with_data("flag", serde_json::json!(true))
            .with_data("deepLink", serde_json::json!("app://news/1"))
            .with_data("empty", serde_json::Value::Null);

        let properties = template_properties(&msg, "msg-1");

        assert_eq!(properties["title"], "Hello");
        assert_eq!(properties["message"], "World");
        assert_eq!(properties["messageId"], "msg-1");
        assert_eq!(properties["count"], "3");
        assert_eq!(properties["flag"], "true");
        assert_eq!(properties["deepLink"], "app://news/1");
        assert_eq!(properties["empty"], "");
    }
}
