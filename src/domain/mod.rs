//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, enums, errors)
//! - `billing` - Subscription billing, checkout sessions, webhook reconciliation

pub mod billing;
pub mod foundation;
