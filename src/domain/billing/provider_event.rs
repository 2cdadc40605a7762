//! Provider webhook event types.
//!
//! An inbound event is decoded exactly once, at the gateway boundary, into a
//! tagged payload selected by the event-type discriminator. Handlers and the
//! correlation resolver read typed accessors instead of probing raw JSON.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::correlation::CorrelationSource;

/// Known provider event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// Checkout session completed successfully.
    CheckoutSessionCompleted,
    /// Checkout session abandoned or timed out.
    CheckoutSessionExpired,
    /// Subscription object created upstream.
    SubscriptionCreated,
    /// Subscription object updated upstream.
    SubscriptionUpdated,
    /// Subscription object deleted upstream.
    SubscriptionDeleted,
    /// Invoice created for an upcoming charge.
    InvoiceCreated,
    /// Invoice paid.
    InvoicePaid,
    /// Invoice payment failed.
    InvoicePaymentFailed,
    /// Invoice payment needs customer action (3DS and similar).
    InvoicePaymentActionRequired,
    /// Unknown or unhandled event type.
    Unknown,
}

impl EventType {
    /// Parse event type from the provider's dotted string tag.
    pub fn from_str(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "checkout.session.expired" => Self::CheckoutSessionExpired,
            "customer.subscription.created" => Self::SubscriptionCreated,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            "invoice.created" => Self::InvoiceCreated,
            "invoice.paid" => Self::InvoicePaid,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            "invoice.payment_action_required" => Self::InvoicePaymentActionRequired,
            _ => Self::Unknown,
        }
    }

    /// Convert to the provider's event type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::CheckoutSessionExpired => "checkout.session.expired",
            Self::SubscriptionCreated => "customer.subscription.created",
            Self::SubscriptionUpdated => "customer.subscription.updated",
            Self::SubscriptionDeleted => "customer.subscription.deleted",
            Self::InvoiceCreated => "invoice.created",
            Self::InvoicePaid => "invoice.paid",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::InvoicePaymentActionRequired => "invoice.payment_action_required",
            Self::Unknown => "unknown",
        }
    }
}

/// Checkout session object as delivered in checkout.* events.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckoutSessionObject {
    /// Provider session identifier (cs_xxx).
    pub id: String,

    /// Provider customer identifier, if one was attached.
    #[serde(default)]
    pub customer: Option<String>,

    /// Provider subscription identifier, once the subscription exists.
    #[serde(default)]
    pub subscription: Option<String>,

    /// Provider-reported session status.
    #[serde(default)]
    pub status: Option<String>,

    /// Correlation metadata attached at session creation.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Subscription object as delivered in customer.subscription.* events.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionObject {
    /// Provider subscription identifier (sub_xxx).
    pub id: String,

    /// Provider customer identifier.
    #[serde(default)]
    pub customer: Option<String>,

    /// Provider-reported subscription status.
    #[serde(default)]
    pub status: Option<String>,

    /// Current period start as a Unix timestamp.
    #[serde(default)]
    pub current_period_start: Option<i64>,

    /// Current period end as a Unix timestamp.
    #[serde(default)]
    pub current_period_end: Option<i64>,

    /// Scheduled cancellation as a Unix timestamp.
    #[serde(default)]
    pub cancel_at: Option<i64>,

    /// Cancellation time as a Unix timestamp.
    #[serde(default)]
    pub canceled_at: Option<i64>,

    /// Correlation metadata attached at checkout creation.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl SubscriptionObject {
    /// Period start, only when the provider timestamp is numerically valid.
    pub fn period_start(&self) -> Option<Timestamp> {
        self.current_period_start
            .and_then(Timestamp::from_valid_unix_secs)
    }

    /// Period end, only when the provider timestamp is numerically valid.
    pub fn period_end(&self) -> Option<Timestamp> {
        self.current_period_end
            .and_then(Timestamp::from_valid_unix_secs)
    }

    /// Scheduled cancellation, only when numerically valid.
    pub fn cancel_at(&self) -> Option<Timestamp> {
        self.cancel_at.and_then(Timestamp::from_valid_unix_secs)
    }

    /// Cancellation time, only when numerically valid.
    pub fn canceled_at(&self) -> Option<Timestamp> {
        self.canceled_at.and_then(Timestamp::from_valid_unix_secs)
    }
}

/// Nested parent structure carried by invoice events on newer API versions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvoiceParent {
    /// Subscription details nested under the parent.
    #[serde(default)]
    pub subscription_details: Option<InvoiceSubscriptionDetails>,
}

/// Subscription details nested inside an invoice parent.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvoiceSubscriptionDetails {
    /// Provider subscription identifier.
    #[serde(default)]
    pub subscription: Option<String>,

    /// Correlation metadata copied from the subscription.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Invoice lines container.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InvoiceLines {
    /// List of line items.
    #[serde(default)]
    pub data: Vec<InvoiceLine>,
}

/// Single invoice line item.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvoiceLine {
    /// Line item identifier.
    pub id: String,

    /// Provider subscription identifier for this line.
    #[serde(default)]
    pub subscription: Option<String>,

    /// Correlation metadata attached to this line.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Invoice object as delivered in invoice.* events.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvoiceObject {
    /// Provider invoice identifier (in_xxx).
    pub id: String,

    /// Provider customer identifier.
    #[serde(default)]
    pub customer: Option<String>,

    /// Provider subscription identifier (older API versions).
    #[serde(default)]
    pub subscription: Option<String>,

    /// Parent structure (newer API versions).
    #[serde(default)]
    pub parent: Option<InvoiceParent>,

    /// Hosted payment page for invoices needing customer action.
    #[serde(default)]
    pub hosted_invoice_url: Option<String>,

    /// Correlation metadata on the invoice itself.
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Invoice line items.
    #[serde(default)]
    pub lines: InvoiceLines,
}

impl InvoiceObject {
    /// Subscription id from any of the locations invoices carry it in,
    /// checked in order of reliability.
    pub fn subscription_id(&self) -> Option<&str> {
        if let Some(id) = self.subscription.as_deref() {
            return Some(id);
        }
        if let Some(id) = self
            .parent
            .as_ref()
            .and_then(|p| p.subscription_details.as_ref())
            .and_then(|d| d.subscription.as_deref())
        {
            return Some(id);
        }
        self.lines.data.first().and_then(|l| l.subscription.as_deref())
    }
}

/// Decoded event payload, selected by the event-type discriminator.
#[derive(Debug, Clone)]
pub enum EventPayload {
    /// Payload of checkout.* events.
    CheckoutSession(CheckoutSessionObject),
    /// Payload of customer.subscription.* events.
    Subscription(SubscriptionObject),
    /// Payload of invoice.* events.
    Invoice(InvoiceObject),
    /// Unknown event type, or a known type whose object failed to decode.
    Unrecognized,
}

impl EventPayload {
    /// Decode the raw data object for the given event type.
    ///
    /// Decode failures degrade to `Unrecognized` rather than erroring; the
    /// webhook path must acknowledge every delivery regardless of shape.
    pub fn decode(kind: EventType, object: &serde_json::Value) -> Self {
        match kind {
            EventType::CheckoutSessionCompleted | EventType::CheckoutSessionExpired => {
                serde_json::from_value(object.clone())
                    .map(Self::CheckoutSession)
                    .unwrap_or(Self::Unrecognized)
            }
            EventType::SubscriptionCreated
            | EventType::SubscriptionUpdated
            | EventType::SubscriptionDeleted => serde_json::from_value(object.clone())
                .map(Self::Subscription)
                .unwrap_or(Self::Unrecognized),
            EventType::InvoiceCreated
            | EventType::InvoicePaid
            | EventType::InvoicePaymentFailed
            | EventType::InvoicePaymentActionRequired => serde_json::from_value(object.clone())
                .map(Self::Invoice)
                .unwrap_or(Self::Unrecognized),
            EventType::Unknown => Self::Unrecognized,
        }
    }

    /// Metadata maps that may carry correlation tags, labeled with their
    /// location and listed in fallback priority order: object-level first,
    /// then parent details, then first line item.
    pub fn metadata_candidates(&self) -> Vec<(CorrelationSource, &HashMap<String, String>)> {
        match self {
            Self::CheckoutSession(session) => {
                vec![(CorrelationSource::PrimaryMetadata, &session.metadata)]
            }
            Self::Subscription(subscription) => {
                vec![(CorrelationSource::PrimaryMetadata, &subscription.metadata)]
            }
            Self::Invoice(invoice) => {
                let mut candidates = vec![(CorrelationSource::PrimaryMetadata, &invoice.metadata)];
                if let Some(details) = invoice
                    .parent
                    .as_ref()
                    .and_then(|p| p.subscription_details.as_ref())
                {
                    candidates.push((CorrelationSource::SubscriptionDetails, &details.metadata));
                }
                if let Some(line) = invoice.lines.data.first() {
                    candidates.push((CorrelationSource::LineItem, &line.metadata));
                }
                candidates
            }
            Self::Unrecognized => vec![],
        }
    }

    /// Provider checkout session id, when this payload carries one.
    pub fn provider_session_id(&self) -> Option<&str> {
        match self {
            Self::CheckoutSession(session) => Some(&session.id),
            _ => None,
        }
    }

    /// Provider subscription id, when this payload carries one.
    pub fn provider_subscription_id(&self) -> Option<&str> {
        match self {
            Self::CheckoutSession(session) => session.subscription.as_deref(),
            Self::Subscription(subscription) => Some(&subscription.id),
            Self::Invoice(invoice) => invoice.subscription_id(),
            Self::Unrecognized => None,
        }
    }

    /// Provider customer id, when this payload carries one.
    pub fn provider_customer_id(&self) -> Option<&str> {
        match self {
            Self::CheckoutSession(session) => session.customer.as_deref(),
            Self::Subscription(subscription) => subscription.customer.as_deref(),
            Self::Invoice(invoice) => invoice.customer.as_deref(),
            Self::Unrecognized => None,
        }
    }
}

/// Verified provider event, decoded once at the gateway boundary.
#[derive(Debug, Clone)]
pub struct ProviderEvent {
    /// Provider event identifier (evt_xxx).
    pub id: String,

    /// Raw event type tag, kept verbatim for audit.
    pub event_type: String,

    /// Provider creation time as a Unix timestamp.
    pub created: i64,

    /// Whether this is a live mode event.
    pub livemode: bool,

    /// Decoded payload.
    pub payload: EventPayload,

    /// Full original event envelope, persisted untouched for replay.
    pub raw: serde_json::Value,
}

impl ProviderEvent {
    /// Build an event from verified envelope parts, decoding the payload by
    /// event type.
    pub fn new(
        id: String,
        event_type: String,
        created: i64,
        livemode: bool,
        object: &serde_json::Value,
        raw: serde_json::Value,
    ) -> Self {
        let payload = EventPayload::decode(EventType::from_str(&event_type), object);
        Self {
            id,
            event_type,
            created,
            livemode,
            payload,
            raw,
        }
    }

    /// Parse the event type into a known enum variant.
    pub fn kind(&self) -> EventType {
        EventType::from_str(&self.event_type)
    }
}

/// Builder for creating test ProviderEvent instances.
#[cfg(test)]
pub struct ProviderEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    livemode: bool,
    object: serde_json::Value,
}

#[cfg(test)]
impl Default for ProviderEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "checkout.session.completed".to_string(),
            created: chrono::Utc::now().timestamp(),
            livemode: false,
            object: serde_json::json!({}),
        }
    }
}

#[cfg(test)]
impl ProviderEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn created(mut self, created: i64) -> Self {
        self.created = created;
        self
    }

    pub fn livemode(mut self, livemode: bool) -> Self {
        self.livemode = livemode;
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn build(self) -> ProviderEvent {
        let raw = serde_json::json!({
            "id": self.id,
            "type": self.event_type,
            "created": self.created,
            "livemode": self.livemode,
            "data": { "object": self.object },
        });
        let object = raw["data"]["object"].clone();
        ProviderEvent::new(
            self.id,
            self.event_type,
            self.created,
            self.livemode,
            &object,
            raw,
        )
    }
}
