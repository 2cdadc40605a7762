//! HTTP adapters - REST API implementations.
//!
//! Each domain module has its own HTTP adapter for endpoint exposure.

pub mod billing;
pub mod middleware;

// Re-export key types for convenience
pub use billing::payment_router;
pub use billing::BillingAppState;
