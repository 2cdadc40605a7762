//! In-memory port implementations.
//!
//! Deterministic, lock-based stand-ins for the persistence and
//! notification ports. Used by the integration tests and for running the
//! service locally without infrastructure. They preserve the SQL
//! adapters' observable contract: uniqueness checks, not-found errors,
//! and latest-created-wins ordering.

mod church_directory;
mod event_store;
mod notifier;
mod plan_catalog;
mod session_ledger;
mod subscription_ledger;

pub use church_directory::InMemoryChurchDirectory;
pub use event_store::InMemoryEventStore;
pub use notifier::InMemoryBillingNotifier;
pub use plan_catalog::InMemoryPlanCatalog;
pub use session_ledger::InMemorySessionLedger;
pub use subscription_ledger::InMemorySubscriptionLedger;
