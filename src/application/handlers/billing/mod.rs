//! Billing handlers.
//!
//! Command handlers for the subscription billing lifecycle:
//!
//! ## Commands
//! - Creating hosted checkout sessions for plan upgrades
//! - Reconciling provider webhook deliveries against the ledgers

mod create_checkout_session;
mod reconcile_webhook;

#[cfg(test)]
pub mod test_support;

// Commands
pub use create_checkout_session::{
    CreateCheckoutSessionCommand, CreateCheckoutSessionHandler, CreateCheckoutSessionResult,
};
pub use reconcile_webhook::{
    ReconcileWebhookCommand, ReconcileWebhookHandler, ReconcileWebhookResult,
};
