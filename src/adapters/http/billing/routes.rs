//! Axum router configuration for billing endpoints.
//!
//! This module defines the route structure for payment-related API endpoints
//! and wires them to their corresponding handlers.

use axum::{routing::post, Router};

use super::handlers::{create_session, handle_provider_webhook, BillingAppState};

/// Create the authenticated billing API router.
///
/// # Routes
///
/// ## Tenant Endpoints (require authentication)
/// - `POST /create-session` - Start subscription checkout for a plan
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new().route("/create-session", post(create_session))
}

/// Create the payment webhook router.
///
/// This is separate from the authenticated billing routes because webhook
/// deliveries carry no user token (they're verified via signature).
///
/// # Routes
/// - `POST /webhook` - Receive payment provider webhook deliveries
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/webhook", post(handle_provider_webhook))
}

/// Create the complete payment module router.
///
/// Combines checkout and webhook routes under a single `/payment` prefix.
/// Auth enforcement comes from the `RequireChurch` extractor, so applying
/// the auth middleware over the whole router is safe: webhook deliveries
/// carry no token and pass through untouched.
///
/// # Example
///
/// ```ignore
/// use axum::Router;
/// use crate::adapters::http::billing::{payment_router, BillingAppState};
///
/// let app_state = BillingAppState { /* ... */ };
/// let app = payment_router().with_state(app_state);
/// ```
pub fn payment_router() -> Router<BillingAppState> {
    Router::new().nest("/payment", billing_routes().merge(webhook_routes()))
}
