//! Email notifier adapter.
//!
//! Implements the `BillingNotifier` port by calling the platform's
//! notification service, which owns templates, localization, and actual
//! mail delivery. This adapter only triggers a notice for a church; the
//! service resolves the billing contact and renders the message.
//!
//! Delivery is best-effort by contract: callers bound the attempt with a
//! timeout and log failures without propagating them.
//!
//! # Configuration
//!
//! ```ignore
//! let config = NotifierConfig::new("http://notifications.internal:8200")
//!     .with_service_token(token);
//! let notifier = EmailNotifier::new(config);
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::domain::foundation::{ChurchId, DomainError, ErrorCode};
use crate::ports::BillingNotifier;

/// Configuration for the notification service client.
#[derive(Clone)]
pub struct NotifierConfig {
    /// Base URL of the notification service.
    base_url: String,

    /// Service-to-service bearer token, when the deployment requires one.
    service_token: Option<SecretString>,

    /// Request timeout.
    timeout: Duration,
}

impl NotifierConfig {
    /// Creates a configuration pointing at the given service base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            service_token: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Sets the service-to-service bearer token.
    pub fn with_service_token(mut self, token: impl Into<String>) -> Self {
        self.service_token = Some(SecretString::new(token.into()));
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Payment failure notice payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentFailedNotice {
    church_id: ChurchId,
}

/// Action-required notice payload, carrying the provider's hosted
/// payment URL for the billing contact to complete authentication.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActionRequiredNotice {
    church_id: ChurchId,
    hosted_invoice_url: String,
}

/// Notification service client.
pub struct EmailNotifier {
    config: NotifierConfig,
    http_client: Client,
}

impl EmailNotifier {
    /// Creates a notifier with the given configuration.
    pub fn new(config: NotifierConfig) -> Self {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            http_client,
        }
    }

    /// Builds a notice endpoint URL.
    fn notice_url(&self, kind: &str) -> String {
        format!(
            "{}/v1/notices/{}",
            self.config.base_url.trim_end_matches('/'),
            kind
        )
    }

    /// Posts a notice body, mapping every failure mode to
    /// `NotificationError`.
    async fn post_notice<T: Serialize>(&self, kind: &str, body: &T) -> Result<(), DomainError> {
        let mut request = self.http_client.post(self.notice_url(kind)).json(body);

        if let Some(token) = &self.config.service_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            DomainError::new(
                ErrorCode::NotificationError,
                format!("Failed to reach notification service: {}", e),
            )
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(status, kind, error = %error_text, "Notification service rejected notice");
            return Err(DomainError::new(
                ErrorCode::NotificationError,
                format!("Notification service returned {}: {}", status, error_text),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl BillingNotifier for EmailNotifier {
    async fn send_payment_failed(&self, church_id: ChurchId) -> Result<(), DomainError> {
        self.post_notice("payment-failed", &PaymentFailedNotice { church_id })
            .await
    }

    async fn send_payment_action_required(
        &self,
        church_id: ChurchId,
        hosted_invoice_url: &str,
    ) -> Result<(), DomainError> {
        self.post_notice(
            "payment-action-required",
            &ActionRequiredNotice {
                church_id,
                hosted_invoice_url: hosted_invoice_url.to_string(),
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_new_sets_defaults() {
        let config = NotifierConfig::new("http://localhost:8200");
        assert_eq!(config.base_url, "http://localhost:8200");
        assert!(config.service_token.is_none());
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn config_builders_apply() {
        let config = NotifierConfig::new("http://localhost:8200")
            .with_service_token("svc_token")
            .with_timeout(Duration::from_secs(3));

        assert!(config.service_token.is_some());
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn notice_url_tolerates_trailing_slash() {
        let notifier = EmailNotifier::new(NotifierConfig::new("http://notify.internal/"));
        assert_eq!(
            notifier.notice_url("payment-failed"),
            "http://notify.internal/v1/notices/payment-failed"
        );
    }

    #[test]
    fn payment_failed_notice_uses_camel_case() {
        let church_id = ChurchId::new();
        let json = serde_json::to_value(PaymentFailedNotice { church_id }).unwrap();

        assert_eq!(json["churchId"], church_id.to_string());
    }

    #[test]
    fn action_required_notice_carries_hosted_url() {
        let church_id = ChurchId::new();
        let json = serde_json::to_value(ActionRequiredNotice {
            church_id,
            hosted_invoice_url: "https://pay.stripe.com/invoice/abc".to_string(),
        })
        .unwrap();

        assert_eq!(json["churchId"], church_id.to_string());
        assert_eq!(json["hostedInvoiceUrl"], "https://pay.stripe.com/invoice/abc");
    }

    #[test]
    fn notifier_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EmailNotifier>();
    }
}
