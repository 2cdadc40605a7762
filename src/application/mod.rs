//! Application layer - Commands and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Handlers own the transaction boundaries; domain entities own the rules.

pub mod handlers;

pub use handlers::billing::{
    // Checkout
    CreateCheckoutSessionCommand, CreateCheckoutSessionHandler, CreateCheckoutSessionResult,
    // Webhook reconciliation
    ReconcileWebhookCommand, ReconcileWebhookHandler, ReconcileWebhookResult,
};
