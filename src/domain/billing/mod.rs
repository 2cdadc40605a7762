//! Billing domain module.
//!
//! Subscription billing for tenant churches: checkout sessions, the
//! subscription ledger, provider event decoding, and the correlation
//! logic that maps inbound webhook events back to local entities.
//!
//! # Module Structure
//!
//! - `church` - Tenant church reference data
//! - `correlation` - Event-to-tenant correlation resolver
//! - `payment_event` - Audit log entry for provider deliveries
//! - `plan` - Plan catalog types and currency localization
//! - `provider_event` - Tagged decode of provider webhook payloads
//! - `session` - PaymentSession state machine
//! - `subscription` - ChurchSubscription state machine
//! - `webhook_verifier` - Signature verification for deliveries

mod church;
mod correlation;
mod payment_event;
mod plan;
mod provider_event;
mod session;
mod subscription;
mod webhook_verifier;

pub use church::Church;
pub use correlation::{
    CorrelationHints, CorrelationResolver, CorrelationSource, METADATA_CHURCH_ID, METADATA_PLAN_ID,
};
pub use payment_event::PaymentEvent;
pub use plan::{Currency, Plan, PlanTier};
pub use provider_event::{
    CheckoutSessionObject, EventPayload, EventType, InvoiceLine, InvoiceLines, InvoiceObject,
    InvoiceParent, InvoiceSubscriptionDetails, ProviderEvent, SubscriptionObject,
};
pub use session::{PaymentSession, SessionStatus};
pub use subscription::{ChurchSubscription, SubscriptionStatus};
pub use webhook_verifier::{SignatureHeader, VerificationError, WebhookVerifier};
