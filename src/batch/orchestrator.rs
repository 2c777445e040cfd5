use std::sync::Arc;

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::models::news::{NewsExternalItem, NewsItem};

#[async_trait]
pub trait ExternalNewsGateway: Send + Sync {
    async fn fetch_news(&self) -> Result<Vec<NewsExternalItem>, Error>;
}

#[async_trait]
pub trait InternalNewsGateway: Send + Sync {
    async fn update_news(&self, news: &[NewsItem]) -> Result<(), Error>;
}

#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn orchestrate_notification_preferences_update(&self) -> Result<(), Error>;
}

/// Pulls the external feed and republishes it to the internal notification service.
pub struct OrchestratorService {
    external: Arc<dyn ExternalNewsGateway>,
    internal: Arc<dyn InternalNewsGateway>,
}

impl OrchestratorService {
    pub fn new(
        external: Arc<dyn ExternalNewsGateway>,
        internal: Arc<dyn InternalNewsGateway>,
    ) -> Self {
        Self { external, internal }
    }
}

#[async_trait]
impl Orchestrator for OrchestratorService {
    async fn orchestrate_notification_preferences_update(&self) -> Result<(), Error> {
        info!("Starting orchestration of notification preferences update");

        let external_news = self
            .external
            .fetch_news()
            .await
            .map_err(|e| anyhow!("Failed to fetch external news: {}", e))?;

        let news = map_external_to_internal(&external_news);
        for item in &news {
            debug!(item = %item, "Republishing news item");
        }

        self.internal
            .update_news(&news)
            .await
            .map_err(|e| anyhow!("Failed to update notification news: {}", e))?;

        info!(
            count = news.len(),
            "Completed orchestration of notification preferences update"
        );
        Ok(())
    }
}

pub fn map_external_to_internal(external: &[NewsExternalItem]) -> Vec<NewsItem> {
    external.iter().map(NewsItem::from).collect()
}
