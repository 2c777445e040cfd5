use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    clients::{notification_hub::parse_connection_string, rbmq::RabbitMqClient},
    dedup::DeduplicationCache,
    models::{
        health::{ComponentHealth, HealthCheckResponse, HealthStatus},
        hub::NotificationHubConfig,
    },
};

pub struct HealthChecker {
    broker: Arc<RabbitMqClient>,
    hub_config: NotificationHubConfig,
    dedup: Arc<DeduplicationCache>,
}

impl HealthChecker {
    pub fn new(
        broker: Arc<RabbitMqClient>,
        hub_config: NotificationHubConfig,
        dedup: Arc<DeduplicationCache>,
    ) -> Self {
        Self {
            broker,
            hub_config,
            dedup,
        }
    }

    pub async fn check_all(&self) -> HealthCheckResponse {
        let mut checks = HashMap::new();

        let broker_health = if self.broker.is_connected() {
            ComponentHealth::healthy()
        } else {
            warn!("RabbitMQ channel is not connected");
            ComponentHealth::unhealthy("Channel disconnected".to_string())
        };
        checks.insert("message_broker".to_string(), broker_health);

        checks.insert(
            "notification_hub".to_string(),
            check_notification_hub(&self.hub_config),
        );

        let entries = self.dedup.cache_size().await;
        debug!(entries, "Deduplication cache size checked");
        checks.insert(
            "deduplication_cache".to_string(),
            ComponentHealth::healthy().with_entries(entries),
        );

        HealthCheckResponse {
            status: determine_overall_status(&checks),
            timestamp: Utc::now(),
            checks,
        }
    }
}

pub fn check_notification_hub(config: &NotificationHubConfig) -> ComponentHealth {
    if !config.enabled {
        return ComponentHealth::degraded("Notification hub delivery is disabled".to_string());
    }

    match parse_connection_string(&config.connection_string) {
        Ok(_) => ComponentHealth::healthy(),
        Err(e) => {
            warn!(error = %e, "Notification hub is misconfigured");
            ComponentHealth::unhealthy(e.to_string())
        }
    }
}

pub fn determine_overall_status(checks: &HashMap<String, ComponentHealth>) -> HealthStatus {
    let has_unhealthy = checks
        .values()
        .any(|health| health.status == HealthStatus::Unhealthy);

    let has_degraded = checks
        .values()
        .any(|health| health.status == HealthStatus::Degraded);

    if has_unhealthy {
        HealthStatus::Unhealthy
    } else if has_degraded {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub_config(connection_string: &str, enabled: bool) -> NotificationHubConfig {
        NotificationHubConfig {
            connection_string: connection_string.to_string(),
            hub_name: "hub".to_string(),
            enabled,
            send_timeout_seconds: 60,
        }
    }

    #[test]
    fn test_notification_hub_health() {
        let valid = "Endpoint=sb://ns/;SharedAccessKeyName=Full;SharedAccessKey=k";

        assert_eq!(
            check_notification_hub(&hub_config(valid, true)).status,
            HealthStatus::Healthy
        );
        assert_eq!(
            check_notification_hub(&hub_config(valid, false)).status,
            HealthStatus::Degraded
        );
        assert_eq!(
            check_notification_hub(&hub_config("Endpoint=sb://ns/", true)).status,
            HealthStatus::Unhealthy
        );
    }

    #[test]
    fn test_overall_status_takes_worst() {
        let mut checks = HashMap::new();
        checks.insert("a".to_string(), ComponentHealth::healthy());
        assert_eq!(determine_overall_status(&checks), HealthStatus::Healthy);

        checks.insert("b".to_string(), ComponentHealth::degraded("off".to_string()));
        assert_eq!(determine_overall_status(&checks), HealthStatus::Degraded);

        checks.insert("c".to_string(), ComponentHealth::unhealthy("down".to_string()));
        assert_eq!(determine_overall_status(&checks), HealthStatus::Unhealthy);
    }
}
