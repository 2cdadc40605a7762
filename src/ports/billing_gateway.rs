//! Billing gateway port.
//!
//! Abstracts the payment provider SDK behind three capabilities: verify
//! and decode an inbound webhook delivery, fetch a subscription snapshot
//! by provider id, and create a hosted checkout session. Adapters own the
//! secrets; callers never see them.

use crate::domain::billing::{Currency, ProviderEvent, SubscriptionObject};
use crate::domain::foundation::{ChurchId, DomainError, ErrorCode, PlanId};
use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by billing gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Signature header missing, malformed, or failed verification.
    #[error("webhook signature rejected: {0}")]
    InvalidSignature(String),

    /// Delivery payload could not be decoded into a provider event.
    #[error("failed to decode provider payload: {0}")]
    ParseError(String),

    /// The provider rejected the request.
    #[error("provider returned {status}: {message}")]
    ProviderError { status: u16, message: String },

    /// The requested object does not exist upstream.
    #[error("provider object not found: {0}")]
    NotFound(String),

    /// Transport-level failure reaching the provider.
    #[error("provider request failed: {0}")]
    Network(String),
}

impl GatewayError {
    /// Whether retrying the same call could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Network(_) => true,
            GatewayError::ProviderError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        let code = match &err {
            GatewayError::InvalidSignature(_) => ErrorCode::InvalidSignature,
            _ => ErrorCode::ProviderError,
        };
        DomainError::new(code, err.to_string())
    }
}

/// Parameters for creating a hosted checkout session.
///
/// Correlation metadata (church id, plan id) must be attached by the
/// adapter at both the session level and the subscription-data level;
/// inbound event types expose metadata at different nesting depths.
#[derive(Debug, Clone)]
pub struct CreateCheckoutRequest {
    pub church_id: ChurchId,
    pub plan_id: PlanId,
    pub plan_name: String,
    pub amount_cents: i64,
    pub currency: Currency,
    pub trial_days: u32,
    /// Existing provider customer handle to reuse. When absent the
    /// adapter lets the provider create a new customer, prefilled with
    /// `billing_email`.
    pub customer_id: Option<String>,
    pub billing_email: String,
}

/// Handle returned by checkout creation, sufficient for an embedded
/// checkout UI to take over.
#[derive(Debug, Clone)]
pub struct CheckoutHandle {
    pub session_id: String,
    pub client_secret: String,
}

/// Capability surface of the payment provider.
#[async_trait]
pub trait BillingGateway: Send + Sync {
    /// Verify the signature over a raw webhook body and decode it into a
    /// provider event.
    ///
    /// The raw bytes must be exactly as received on the wire; any
    /// re-serialization breaks the signature.
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` if the header is missing, malformed, stale,
    ///   or fails the digest check
    /// - `ParseError` if the verified body is not a provider event
    fn verify_and_decode(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<ProviderEvent, GatewayError>;

    /// Fetch the current snapshot of a subscription from the provider.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the provider has no such subscription
    /// - `Network` / `ProviderError` on transport or upstream failure
    async fn retrieve_subscription(
        &self,
        provider_subscription_id: &str,
    ) -> Result<SubscriptionObject, GatewayError>;

    /// Create a hosted checkout session in subscription mode.
    ///
    /// # Errors
    ///
    /// - `Network` / `ProviderError` on transport or upstream failure
    /// - `ParseError` if the provider response is missing the client
    ///   secret
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutHandle, GatewayError>;
}
