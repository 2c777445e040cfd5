use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Raw JSON body published to the notification topic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundNotification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Legacy producers put the body here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_expression: Option<String>,

    #[serde(default, alias = "userID", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    pub title: String,
    pub body: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_expression: Option<String>,

    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, serde_json::Value>,
}

impl NotificationMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            user_id: None,
            categories: Vec::new(),
            tag_expression: None,
            data: HashMap::new(),
        }
    }

    pub fn with_tag_expression(mut self, tag_expression: impl Into<String>) -> Self {
        self.tag_expression = Some(tag_expression.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

/// A message pulled from the broker, not yet completed or abandoned.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub message_id: String,
    pub content_type: String,
    pub body: Vec<u8>,
    pub delivery_tag: u64,
}
