//! Correlation resolver - maps provider events back to local entities.
//!
//! Checkout creation embeds church and plan ids into provider objects as
//! metadata; inbound events surface that metadata at different nesting
//! depths depending on event type. The resolver walks those locations in
//! a fixed priority order and, as a last resort, consults the
//! subscription ledger by provider subscription id.
//!
//! ## Design
//!
//! - Candidates are tried in order; the first non-empty one wins outright
//!   and later candidates are never merged in
//! - Resolution never fails: an unresolvable event yields empty hints and
//!   the caller decides what to log
//! - Metadata values that do not parse as UUIDs are treated as absent

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::foundation::{ChurchId, PlanId};
use crate::ports::SubscriptionLedger;

use super::provider_event::ProviderEvent;

/// Metadata key carrying the tenant church id.
pub const METADATA_CHURCH_ID: &str = "church_id";

/// Metadata key carrying the plan id.
pub const METADATA_PLAN_ID: &str = "plan_id";

/// Which candidate in the fallback chain produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationSource {
    /// Metadata on the event's primary object.
    PrimaryMetadata,
    /// Metadata nested under an invoice's parent subscription details.
    SubscriptionDetails,
    /// Metadata on the first invoice line item.
    LineItem,
    /// Ledger lookup by provider subscription id.
    Ledger,
}

/// Resolved correlation identifiers for one provider event.
///
/// Either id may be absent; downstream handlers must tolerate an
/// unknown tenant. `source` records which candidate matched and is
/// `None` when nothing resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrelationHints {
    pub church_id: Option<ChurchId>,
    pub plan_id: Option<PlanId>,
    pub source: Option<CorrelationSource>,
}

impl CorrelationHints {
    /// Extract hints from one metadata map. Unparseable values count as
    /// absent.
    pub fn from_metadata(metadata: &HashMap<String, String>) -> Self {
        Self {
            church_id: metadata
                .get(METADATA_CHURCH_ID)
                .and_then(|raw| raw.parse().ok()),
            plan_id: metadata
                .get(METADATA_PLAN_ID)
                .and_then(|raw| raw.parse().ok()),
            source: None,
        }
    }

    /// True when neither identifier resolved.
    pub fn is_empty(&self) -> bool {
        self.church_id.is_none() && self.plan_id.is_none()
    }
}

/// Resolves provider events to local church and plan identifiers.
pub struct CorrelationResolver {
    subscriptions: Arc<dyn SubscriptionLedger>,
}

impl CorrelationResolver {
    pub fn new(subscriptions: Arc<dyn SubscriptionLedger>) -> Self {
        Self { subscriptions }
    }

    /// Resolve correlation hints for an event.
    ///
    /// Walks the payload's metadata candidates in priority order (primary
    /// object, then parent subscription details, then first line item),
    /// then falls back to a ledger lookup by provider subscription id.
    /// Ledger misses and ledger errors both leave the hints empty.
    pub async fn resolve(&self, event: &ProviderEvent) -> CorrelationHints {
        for (source, metadata) in event.payload.metadata_candidates() {
            let mut hints = CorrelationHints::from_metadata(metadata);
            if !hints.is_empty() {
                hints.source = Some(source);
                return hints;
            }
        }

        if let Some(subscription_id) = event.payload.provider_subscription_id() {
            if let Ok(Some(row)) = self
                .subscriptions
                .find_by_provider_subscription_id(subscription_id)
                .await
            {
                return CorrelationHints {
                    church_id: Some(row.church_id),
                    plan_id: Some(row.plan_id),
                    source: Some(CorrelationSource::Ledger),
                };
            }
        }

        CorrelationHints::default()
    }
}
