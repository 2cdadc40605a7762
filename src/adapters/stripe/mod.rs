//! Stripe billing gateway adapter.
//!
//! Implements the `BillingGateway` port for Stripe integration:
//! - Webhook signature verification and event decoding
//! - Subscription snapshot retrieval
//! - Embedded checkout session creation
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Timestamps are validated to prevent replay attacks (5-minute window)
//! - All secrets are handled via `secrecy::SecretString`

mod stripe_gateway;

pub use stripe_gateway::{StripeConfig, StripeGateway};
