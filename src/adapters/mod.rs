//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - axum routes, handlers, and middleware
//! - `memory` - in-memory port implementations for tests and local dev
//! - `notifications` - notification service client
//! - `postgres` - sqlx-backed ledgers and catalogs
//! - `stripe` - payment provider gateway

pub mod http;
pub mod memory;
pub mod notifications;
pub mod postgres;
pub mod stripe;
