//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Ledger Ports
//!
//! - `SessionLedger` - PaymentSession persistence
//! - `SubscriptionLedger` - ChurchSubscription persistence
//! - `EventStore` - Append-only audit log of provider events
//!
//! ## Catalog Ports
//!
//! - `PlanCatalog` - Read-only plan lookup
//! - `ChurchDirectory` - Read-only tenant lookup
//!
//! ## Outbound Ports
//!
//! - `BillingGateway` - Payment provider capability surface
//! - `BillingNotifier` - Best-effort billing notifications

mod billing_gateway;
mod billing_notifier;
mod church_directory;
mod event_store;
mod plan_catalog;
mod session_ledger;
mod subscription_ledger;

pub use billing_gateway::{BillingGateway, CheckoutHandle, CreateCheckoutRequest, GatewayError};
pub use billing_notifier::BillingNotifier;
pub use church_directory::ChurchDirectory;
pub use event_store::EventStore;
pub use plan_catalog::PlanCatalog;
pub use session_ledger::SessionLedger;
pub use subscription_ledger::SubscriptionLedger;
