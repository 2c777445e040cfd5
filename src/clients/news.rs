use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use crate::{
    batch::orchestrator::{ExternalNewsGateway, InternalNewsGateway},
    models::news::{NewsExternalItem, NewsItem, RestServiceConfig},
};

fn build_http_client(config: &RestServiceConfig) -> Result<Client, Error> {
    Client::builder()
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
        .build()
        .map_err(|_| anyhow!("Failed to create HTTP client"))
}

/// Reads the news feed published by the external provider.
pub struct ExternalNewsClient {
    http_client: Client,
    base_url: String,
}

impl ExternalNewsClient {
    pub fn new(config: &RestServiceConfig) -> Result<Self, Error> {
        info!(base_url = %config.base_url, "External news client initialized");

        Ok(Self {
            http_client: build_http_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ExternalNewsGateway for ExternalNewsClient {
    async fn fetch_news(&self) -> Result<Vec<NewsExternalItem>, Error> {
        let url = format!("{}/api/v1/external/news", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Error calling external news API: {}", e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(anyhow!("External news API returned status {}", status));
        }

        let news: Vec<NewsExternalItem> = response
            .json()
            .await
            .map_err(|e| anyhow!("Error decoding external news response: {}", e))?;

        debug!(count = news.len(), "Fetched external news");

        Ok(news)
    }
}

/// Writes news items to the internal notification service.
pub struct NotificationNewsClient {
    http_client: Client,
    base_url: String,
}

impl NotificationNewsClient {
    pub fn new(config: &RestServiceConfig) -> Result<Self, Error> {
        info!(base_url = %config.base_url, "Notification news client initialized");

        Ok(Self {
            http_client: build_http_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl InternalNewsGateway for NotificationNewsClient {
    async fn update_news(&self, news: &[NewsItem]) -> Result<(), Error> {
        let url = format!("{}/api/v1/news", self.base_url);

        let response = self
            .http_client
            .put(&url)
            .json(news)
            .send()
            .await
            .map_err(|e| anyhow!("Error calling notification news API: {}", e))?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(anyhow!("Notification news API returned status {}", status));
        }

        debug!(count = news.len(), "Notification news updated");

        Ok(())
    }
}
