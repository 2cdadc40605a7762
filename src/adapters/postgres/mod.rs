//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresSessionLedger` - PaymentSession rows
//! - `PostgresSubscriptionLedger` - ChurchSubscription rows
//! - `PostgresEventStore` - Append-only payment event audit log
//! - `PostgresPlanCatalog` - Read-only plan lookup
//! - `PostgresChurchDirectory` - Read-only tenant lookup

mod church_directory;
mod event_store;
mod plan_catalog;
mod session_ledger;
mod subscription_ledger;

pub use church_directory::PostgresChurchDirectory;
pub use event_store::PostgresEventStore;
pub use plan_catalog::PostgresPlanCatalog;
pub use session_ledger::PostgresSessionLedger;
pub use subscription_ledger::PostgresSubscriptionLedger;
