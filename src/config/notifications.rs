//! Notification service configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Notification service configuration
///
/// Member-facing emails are rendered and sent by the platform's notification
/// service; this section points at it.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Base URL of the notification service
    pub base_url: String,

    /// Bearer token for service-to-service calls
    pub service_token: Option<String>,

    /// Send timeout in seconds
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
}

impl NotificationsConfig {
    /// Get send timeout as Duration
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    /// Validate notification configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("NOTIFICATIONS_BASE_URL"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidNotificationUrl);
        }
        if self.send_timeout_secs == 0 || self.send_timeout_secs > 60 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            service_token: None,
            send_timeout_secs: default_send_timeout(),
        }
    }
}

fn default_send_timeout() -> u64 {
    10
}
