use thiserror::Error;

/// Failures on the broker → push gateway path.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Failed to deserialize message: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Already delivered within the dedup window. Callers treat this as success.
    #[error("Duplicate message detected: {0}")]
    DuplicateMessage(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Push gateway returned status {status}: {body}")]
    Delivery { status: u16, body: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl NotificationError {
    /// Whether redelivering the same message can possibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NotificationError::Transport(_) | NotificationError::Delivery { .. }
        )
    }
}

impl From<reqwest::Error> for NotificationError {
    fn from(err: reqwest::Error) -> Self {
        NotificationError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(NotificationError::Transport("reset".into()).is_retryable());
        assert!(
            NotificationError::Delivery {
                status: 503,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(!NotificationError::Validation("title".into()).is_retryable());
        assert!(!NotificationError::Configuration("endpoint".into()).is_retryable());
        assert!(!NotificationError::DuplicateMessage("m-1".into()).is_retryable());
    }
}
