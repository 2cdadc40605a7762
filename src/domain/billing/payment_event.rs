//! Payment event audit log entry.
//!
//! Every inbound provider delivery is recorded here before reconciliation
//! runs, whether or not it can be correlated to a tenant. The full raw
//! envelope is kept so that a missed or mishandled event can be replayed
//! manually.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ChurchId, PaymentEventId, Timestamp};

use super::provider_event::ProviderEvent;

/// Audit record of one provider event delivery.
///
/// The provider-id columns are denormalized correlation hints, extracted
/// once at append time so the log can be searched without re-decoding
/// payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub id: PaymentEventId,

    /// Resolved tenant, when correlation succeeded before append.
    pub church_id: Option<ChurchId>,

    /// Provider's own event identifier (evt_xxx).
    pub provider_event_id: String,

    /// Raw event type tag, verbatim.
    pub event_type: String,

    /// Full event envelope as delivered.
    pub payload: serde_json::Value,

    pub provider_session_id: Option<String>,
    pub provider_subscription_id: Option<String>,
    pub provider_customer_id: Option<String>,

    /// Whether reconciliation ran to completion for this delivery.
    pub processed: bool,
    pub processed_at: Option<Timestamp>,

    pub created_at: Timestamp,
}

impl PaymentEvent {
    /// Record a verified delivery, extracting correlation hint columns
    /// from the decoded payload.
    pub fn from_provider_event(event: &ProviderEvent, church_id: Option<ChurchId>) -> Self {
        Self {
            id: PaymentEventId::new(),
            church_id,
            provider_event_id: event.id.clone(),
            event_type: event.event_type.clone(),
            payload: event.raw.clone(),
            provider_session_id: event.payload.provider_session_id().map(String::from),
            provider_subscription_id: event.payload.provider_subscription_id().map(String::from),
            provider_customer_id: event.payload.provider_customer_id().map(String::from),
            processed: false,
            processed_at: None,
            created_at: Timestamp::now(),
        }
    }

    /// Mark this delivery as fully reconciled.
    pub fn mark_processed(&mut self) {
        self.processed = true;
        self.processed_at = Some(Timestamp::now());
    }
}
