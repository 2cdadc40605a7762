//! Stripe billing gateway adapter.
//!
//! Implements the `BillingGateway` port against the Stripe REST API:
//! webhook verification, subscription retrieval, and embedded checkout
//! session creation.
//!
//! # Security
//!
//! - Webhook signatures are verified by the domain [`WebhookVerifier`]
//!   (HMAC-SHA256, constant-time comparison, timestamp window)
//! - API credentials handled via `secrecy::SecretString`
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key, webhook_secret)
//!     .with_return_url("https://app.example.org/billing/return");
//! let gateway = StripeGateway::new(config);
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::billing::{
    ProviderEvent, SignatureHeader, SubscriptionObject, VerificationError, WebhookVerifier,
    METADATA_CHURCH_ID, METADATA_PLAN_ID,
};
use crate::ports::{BillingGateway, CheckoutHandle, CreateCheckoutRequest, GatewayError};

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Base URL for the Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Where the embedded checkout UI sends the member after completion.
    /// Stripe substitutes `{CHECKOUT_SESSION_ID}` in the template.
    checkout_return_url: String,

    /// Whether to reject test mode deliveries.
    require_livemode: bool,
}

impl StripeConfig {
    /// Create a new Stripe configuration with default URLs.
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: "https://api.stripe.com".to_string(),
            checkout_return_url:
                "http://localhost:3000/billing/return?session_id={CHECKOUT_SESSION_ID}".to_string(),
            require_livemode: false,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set the return URL for the embedded checkout UI.
    pub fn with_return_url(mut self, url: impl Into<String>) -> Self {
        self.checkout_return_url = url.into();
        self
    }

    /// Reject test mode deliveries in production.
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }
}

/// Stripe billing gateway.
///
/// Implements `BillingGateway` against the Stripe REST API.
pub struct StripeGateway {
    config: StripeConfig,
    verifier: WebhookVerifier,
    http_client: reqwest::Client,
}

impl StripeGateway {
    /// Create a new gateway with the given configuration.
    pub fn new(config: StripeConfig) -> Self {
        let verifier = WebhookVerifier::new(config.webhook_secret.expose_secret());
        Self {
            config,
            verifier,
            http_client: reqwest::Client::new(),
        }
    }

    /// Build the form parameters for checkout session creation.
    ///
    /// Correlation ids go in at both nesting levels: checkout events
    /// surface session metadata while subscription events surface the
    /// copy under `subscription_data`.
    fn checkout_params(&self, request: &CreateCheckoutRequest) -> Vec<(String, String)> {
        let church_id = request.church_id.to_string();
        let plan_id = request.plan_id.to_string();

        let mut params = vec![
            ("mode".to_string(), "subscription".to_string()),
            ("ui_mode".to_string(), "embedded".to_string()),
            (
                "return_url".to_string(),
                self.config.checkout_return_url.clone(),
            ),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            (
                "line_items[0][price_data][currency]".to_string(),
                request.currency.code().to_string(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                request.amount_cents.to_string(),
            ),
            (
                "line_items[0][price_data][recurring][interval]".to_string(),
                "month".to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                request.plan_name.clone(),
            ),
            (format!("metadata[{}]", METADATA_CHURCH_ID), church_id.clone()),
            (format!("metadata[{}]", METADATA_PLAN_ID), plan_id.clone()),
            (
                format!("subscription_data[metadata][{}]", METADATA_CHURCH_ID),
                church_id,
            ),
            (
                format!("subscription_data[metadata][{}]", METADATA_PLAN_ID),
                plan_id,
            ),
        ];

        if request.trial_days > 0 {
            params.push((
                "subscription_data[trial_period_days]".to_string(),
                request.trial_days.to_string(),
            ));
        }

        // Reusing the customer handle keeps the provider from minting a
        // duplicate customer record for the same church.
        match &request.customer_id {
            Some(customer) => params.push(("customer".to_string(), customer.clone())),
            None => params.push((
                "customer_email".to_string(),
                request.billing_email.clone(),
            )),
        }

        params
    }
}

/// Subset of the checkout session response we consume.
#[derive(Debug, Deserialize)]
struct CheckoutSessionResponse {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
}

#[async_trait]
impl BillingGateway for StripeGateway {
    fn verify_and_decode(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<ProviderEvent, GatewayError> {
        // Header problems are signature rejections; payload problems
        // after a good digest are decode failures. Parse the header up
        // front so the two can be told apart.
        SignatureHeader::parse(signature_header).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse stripe-signature header");
            GatewayError::InvalidSignature(e.to_string())
        })?;

        let event = self
            .verifier
            .verify_and_parse(payload, signature_header)
            .map_err(|e| match e {
                VerificationError::ParseError(msg) => {
                    tracing::warn!(error = %msg, "Verified payload is not a provider event");
                    GatewayError::ParseError(msg)
                }
                other => {
                    tracing::warn!(error = %other, "Webhook signature rejected");
                    GatewayError::InvalidSignature(other.to_string())
                }
            })?;

        if self.config.require_livemode && !event.livemode {
            tracing::warn!(event_id = %event.id, "Rejected test mode delivery");
            return Err(GatewayError::InvalidSignature(
                "test mode delivery rejected".to_string(),
            ));
        }

        Ok(event)
    }

    async fn retrieve_subscription(
        &self,
        provider_subscription_id: &str,
    ) -> Result<SubscriptionObject, GatewayError> {
        let url = format!(
            "{}/v1/subscriptions/{}",
            self.config.api_base_url, provider_subscription_id
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(
                provider_subscription_id.to_string(),
            ));
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status, error = %error_text, "Stripe retrieve subscription failed");
            return Err(GatewayError::ProviderError {
                status,
                message: error_text,
            });
        }

        response.json::<SubscriptionObject>().await.map_err(|e| {
            GatewayError::ParseError(format!("Failed to parse Stripe response: {}", e))
        })
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutHandle, GatewayError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);
        let params = self.checkout_params(&request);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(status, error = %error_text, "Stripe create checkout session failed");
            return Err(GatewayError::ProviderError {
                status,
                message: error_text,
            });
        }

        let session: CheckoutSessionResponse = response.json().await.map_err(|e| {
            GatewayError::ParseError(format!("Failed to parse Stripe response: {}", e))
        })?;

        // Embedded mode always returns a client secret; its absence means
        // the session was created in a mode the frontend cannot drive.
        let client_secret = session.client_secret.ok_or_else(|| {
            GatewayError::ParseError("checkout session response missing client_secret".to_string())
        })?;

        Ok(CheckoutHandle {
            session_id: session.id,
            client_secret,
        })
    }
}
