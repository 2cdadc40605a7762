//! HTTP adapter for billing endpoints.
//!
//! Exposes the billing domain via REST API:
//! - `POST /payment/create-session` - Start subscription checkout for a plan
//! - `POST /payment/webhook` - Receive payment provider webhook deliveries

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{BillingApiError, BillingAppState};
pub use routes::{billing_routes, payment_router, webhook_routes};
