#[derive(Debug, Clone)]
pub struct NotificationHubConfig {
    pub connection_string: String,
    pub hub_name: String,
    pub enabled: bool,
    pub send_timeout_seconds: u64,
}

/// The three fields of a push gateway connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub endpoint: String,
    pub key_name: String,
    pub key: String,
}
