use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::{
    error::NotificationError,
    models::message::{InboundNotification, NotificationMessage},
    worker::{MessageProcessor, NotificationSender},
};

/// Turns raw broker payloads into notifications and hands them to the sender.
pub struct NotificationProcessor<S> {
    sender: Arc<S>,
}

impl<S: NotificationSender> NotificationProcessor<S> {
    pub fn new(sender: Arc<S>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl<S: NotificationSender> MessageProcessor for NotificationProcessor<S> {
    async fn process_message(
        &self,
        message_id: &str,
        content_type: &str,
        body: &[u8],
    ) -> Result<(), NotificationError> {
        info!(message_id, content_type, "Received message from broker");

        let inbound = serde_json::from_slice::<InboundNotification>(body)?;
        let notification = build_notification(inbound)?;

        debug!(
            message_id,
            title = %notification.title,
            tag_expression = notification.tag_expression.as_deref().unwrap_or(""),
            "Sending notification to hub"
        );

        match self.sender.send_notification(&notification, message_id).await {
            Ok(()) => {
                info!(message_id, "Notification sent successfully");
                Ok(())
            }
            Err(NotificationError::DuplicateMessage(_)) => {
                info!(message_id, "Duplicate message skipped, will complete");
                Ok(())
            }
            Err(e) => {
                warn!(message_id, error = %e, "Failed to send notification to hub");
                Err(e)
            }
        }
    }
}

/// Applies the legacy `message` fallback, splits `tags` and validates required fields.
pub fn build_notification(
    inbound: InboundNotification,
) -> Result<NotificationMessage, NotificationError> {
    let InboundNotification {
        title,
        body,
        message,
        tags,
        tag_expression,
        user_id,
        data,
    } = inbound;

    // Explicit nulls count as empty.
    let title = title.unwrap_or_default();
    let mut body = body.unwrap_or_default();
    let message = message.unwrap_or_default();

    if body.trim().is_empty() && !message.trim().is_empty() {
        body = message;
    }

    if title.trim().is_empty() {
        return Err(NotificationError::Validation(
            "notification title is required".to_string(),
        ));
    }
    if body.trim().is_empty() {
        return Err(NotificationError::Validation(
            "notification body is required".to_string(),
        ));
    }

    let categories = tags
        .as_deref()
        .map(|csv| {
            csv.split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(NotificationMessage {
        title,
        body,
        user_id: user_id.filter(|id| !id.trim().is_empty()),
        categories,
        tag_expression: tag_expression.filter(|expr| !expr.trim().is_empty()),
        data: data.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound(json: serde_json::Value) -> InboundNotification {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_body_falls_back_to_message() {
        let msg = build_notification(inbound(serde_json::json!({
            "title": "News",
            "body": "  ",
            "message": "legacy body"
        })))
        .unwrap();

        assert_eq!(msg.body, "legacy body");
    }

    #[test]
    fn test_body_wins_over_message() {
        let msg = build_notification(inbound(serde_json::json!({
            "title": "News",
            "body": "current",
            "message": "legacy"
        })))
        .unwrap();

        assert_eq!(msg.body, "current");
    }

    #[test]
    fn test_tags_are_split_and_trimmed() {
        let msg = build_notification(inbound(serde_json::json!({
            "title": "News",
            "body": "hi",
            "tags": " sport, ,finance ,weather"
        })))
        .unwrap();

        assert_eq!(msg.categories, vec!["sport", "finance", "weather"]);
    }

    #[test]
    fn test_blank_title_is_rejected() {
        let result = build_notification(inbound(serde_json::json!({
            "title": "",
            "body": "hi"
        })));

        assert!(matches!(result, Err(NotificationError::Validation(_))));
    }

    #[test]
    fn test_missing_body_and_message_is_rejected() {
        let result = build_notification(inbound(serde_json::json!({
            "title": "News",
            "message": "   "
        })));

        assert!(matches!(result, Err(NotificationError::Validation(_))));
    }

    #[test]
    fn test_null_legacy_message_is_ignored() {
        let msg = build_notification(inbound(serde_json::json!({
            "title": "t",
            "body": "b",
            "message": null
        })))
        .unwrap();

        assert_eq!(msg.title, "t");
        assert_eq!(msg.body, "b");
    }

    #[test]
    fn test_null_body_falls_back_to_message() {
        let msg = build_notification(inbound(serde_json::json!({
            "title": "t",
            "body": null,
            "message": "legacy"
        })))
        .unwrap();

        assert_eq!(msg.body, "legacy");
    }

    #[test]
    fn test_null_title_is_rejected() {
        let result = build_notification(inbound(serde_json::json!({
            "title": null,
            "body": "b"
        })));

        assert!(matches!(result, Err(NotificationError::Validation(_))));
    }

    #[test]
    fn test_user_id_accepts_both_spellings() {
        let camel = build_notification(inbound(serde_json::json!({
            "title": "t", "body": "b", "userId": "u-1"
        })))
        .unwrap();
        let upper = build_notification(inbound(serde_json::json!({
            "title": "t", "body": "b", "userID": "u-2"
        })))
        .unwrap();

        assert_eq!(camel.user_id.as_deref(), Some("u-1"));
        assert_eq!(upper.user_id.as_deref(), Some("u-2"));
    }
}
