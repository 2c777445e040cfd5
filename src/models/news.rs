use std::fmt::{Display, Formatter, Result};

use serde::{Deserialize, Serialize};

/// Item as served by the external news feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsExternalItem {
    pub id: String,
    pub description: String,
    pub channel: String,
}

/// Item as accepted by the internal notification news endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: String,
    pub description: String,
    pub channel: String,
}

impl From<&NewsExternalItem> for NewsItem {
    fn from(item: &NewsExternalItem) -> Self {
        Self {
            id: item.id.clone(),
            description: item.description.clone(),
            channel: item.channel.clone(),
        }
    }
}

impl Display for NewsItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "[{}] channel={} description={}",
            self.id, self.channel, self.description
        )
    }
}

#[derive(Debug, Clone)]
pub struct RestServiceConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}
