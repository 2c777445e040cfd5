use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::{
    clients::rbmq::BrokerConfig,
    models::{hub::NotificationHubConfig, job::JobConfig, news::RestServiceConfig},
};

#[derive(Clone, Deserialize, Debug)]
pub struct WorkerConfig {
    pub rabbitmq_url: String,
    #[serde(default = "default_notification_topic")]
    pub notification_topic: String,
    #[serde(default = "default_notification_subscription")]
    pub notification_subscription: String,
    #[serde(default = "default_max_concurrent_calls")]
    pub max_concurrent_calls: usize,

    pub notification_hub_connection_string: String,
    pub notification_hub_name: String,
    #[serde(default = "default_true")]
    pub notification_hub_enabled: bool,
    #[serde(default = "default_send_timeout_seconds")]
    pub notification_hub_send_timeout_seconds: u64,

    #[serde(default = "default_idempotency_ttl_seconds")]
    pub idempotency_ttl_seconds: u64,
    #[serde(default = "default_dedup_cleanup_interval_seconds")]
    pub dedup_cleanup_interval_seconds: u64,

    #[serde(default = "default_server_port")]
    pub server_port: u16,
}

impl WorkerConfig {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing environmental variable: {}", e))?;
        Ok(config)
    }

    pub fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            url: self.rabbitmq_url.clone(),
            topic: self.notification_topic.clone(),
            subscription: self.notification_subscription.clone(),
        }
    }

    pub fn notification_hub_config(&self) -> NotificationHubConfig {
        let send_timeout_seconds = match self.notification_hub_send_timeout_seconds {
            0 => default_send_timeout_seconds(),
            seconds => seconds,
        };

        NotificationHubConfig {
            connection_string: self.notification_hub_connection_string.clone(),
            hub_name: self.notification_hub_name.clone(),
            enabled: self.notification_hub_enabled,
            send_timeout_seconds,
        }
    }

    pub fn max_concurrent_calls(&self) -> usize {
        self.max_concurrent_calls.max(1)
    }

    pub fn idempotency_ttl(&self) -> Duration {
        match self.idempotency_ttl_seconds {
            0 => Duration::from_secs(default_idempotency_ttl_seconds()),
            seconds => Duration::from_secs(seconds),
        }
    }

    /// A zero period would stall the sweep, so it falls back to the default.
    pub fn dedup_cleanup_interval(&self) -> Duration {
        match self.dedup_cleanup_interval_seconds {
            0 => Duration::from_secs(default_dedup_cleanup_interval_seconds()),
            seconds => Duration::from_secs(seconds),
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct BatchConfig {
    #[serde(default)]
    pub batch_cron: Option<String>,
    #[serde(default)]
    pub batch_max_retries: u32,

    pub external_news_base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub external_news_request_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub external_news_connect_timeout_ms: u64,

    pub notification_news_base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub notification_news_request_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub notification_news_connect_timeout_ms: u64,
}

impl BatchConfig {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing environmental variable: {}", e))?;
        Ok(config)
    }

    pub fn job_config(&self) -> JobConfig {
        JobConfig::new(self.batch_cron.as_deref(), self.batch_max_retries)
    }

    pub fn external_service(&self) -> RestServiceConfig {
        RestServiceConfig {
            base_url: self.external_news_base_url.clone(),
            request_timeout_ms: self.external_news_request_timeout_ms,
            connect_timeout_ms: self.external_news_connect_timeout_ms,
        }
    }

    pub fn notification_service(&self) -> RestServiceConfig {
        RestServiceConfig {
            base_url: self.notification_news_base_url.clone(),
            request_timeout_ms: self.notification_news_request_timeout_ms,
            connect_timeout_ms: self.notification_news_connect_timeout_ms,
        }
    }
}

fn default_notification_topic() -> String {
    "notifications".to_string()
}

fn default_notification_subscription() -> String {
    "notification-worker".to_string()
}

fn default_max_concurrent_calls() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_send_timeout_seconds() -> u64 {
    60
}

fn default_idempotency_ttl_seconds() -> u64 {
    24 * 60 * 60
}

fn default_dedup_cleanup_interval_seconds() -> u64 {
    5 * 60
}

fn default_server_port() -> u16 {
    8080
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker_vars() -> Vec<(String, String)> {
        vec![
            ("RABBITMQ_URL".into(), "amqp://localhost:5672".into()),
            (
                "NOTIFICATION_HUB_CONNECTION_STRING".into(),
                "Endpoint=sb://ns.example.net/;SharedAccessKeyName=Full;SharedAccessKey=abc"
                    .into(),
            ),
            ("NOTIFICATION_HUB_NAME".into(), "hub".into()),
        ]
    }

    #[test]
    fn test_worker_config_defaults() {
        let config: WorkerConfig = envy::from_iter(worker_vars()).unwrap();

        assert_eq!(config.notification_topic, "notifications");
        assert_eq!(config.notification_subscription, "notification-worker");
        assert_eq!(config.max_concurrent_calls(), 1);
        assert_eq!(config.idempotency_ttl_seconds, 86_400);
        assert_eq!(config.dedup_cleanup_interval_seconds, 300);

        let hub = config.notification_hub_config();
        assert!(hub.enabled);
        assert_eq!(hub.send_timeout_seconds, 60);
        assert_eq!(hub.hub_name, "hub");
    }

    #[test]
    fn test_zero_values_fall_back() {
        let mut vars = worker_vars();
        vars.push(("MAX_CONCURRENT_CALLS".into(), "0".into()));
        vars.push(("NOTIFICATION_HUB_SEND_TIMEOUT_SECONDS".into(), "0".into()));
        vars.push(("NOTIFICATION_HUB_ENABLED".into(), "false".into()));

        let config: WorkerConfig = envy::from_iter(vars).unwrap();

        assert_eq!(config.max_concurrent_calls(), 1);
        let hub = config.notification_hub_config();
        assert_eq!(hub.send_timeout_seconds, 60);
        assert!(!hub.enabled);
    }

    #[test]
    fn test_zero_dedup_settings_fall_back() {
        let mut vars = worker_vars();
        vars.push(("IDEMPOTENCY_TTL_SECONDS".into(), "0".into()));
        vars.push(("DEDUP_CLEANUP_INTERVAL_SECONDS".into(), "0".into()));

        let config: WorkerConfig = envy::from_iter(vars).unwrap();

        assert_eq!(config.idempotency_ttl(), Duration::from_secs(86_400));
        assert_eq!(config.dedup_cleanup_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_explicit_dedup_settings_are_kept() {
        let mut vars = worker_vars();
        vars.push(("IDEMPOTENCY_TTL_SECONDS".into(), "600".into()));
        vars.push(("DEDUP_CLEANUP_INTERVAL_SECONDS".into(), "30".into()));

        let config: WorkerConfig = envy::from_iter(vars).unwrap();

        assert_eq!(config.idempotency_ttl(), Duration::from_secs(600));
        assert_eq!(config.dedup_cleanup_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_batch_config_job_defaults() {
        let vars = vec![
            (
                "EXTERNAL_NEWS_BASE_URL".to_string(),
                "http://external".to_string(),
            ),
            (
                "NOTIFICATION_NEWS_BASE_URL".to_string(),
                "http://internal".to_string(),
            ),
            ("BATCH_MAX_RETRIES".to_string(), "0".to_string()),
        ];

        let config: BatchConfig = envy::from_iter(vars).unwrap();
        let job = config.job_config();

        assert_eq!(job.cron, "* * * * *");
        assert_eq!(job.max_retries, 3);
        assert_eq!(config.external_service().request_timeout_ms, 30_000);
        assert_eq!(config.notification_service().base_url, "http://internal");
    }
}
