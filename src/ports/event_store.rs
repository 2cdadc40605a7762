//! Event store port.
//!
//! Defines the contract for the append-only PaymentEvent audit log. Every
//! webhook delivery lands here before any business effect is attempted,
//! so the log is complete even when processing fails downstream.

use crate::domain::billing::PaymentEvent;
use crate::domain::foundation::{DomainError, PaymentEventId};
use async_trait::async_trait;

/// Append-only store for payment provider events.
///
/// # Design
///
/// - Rows are never updated after append except to flip the processed
///   marker
/// - `find_unprocessed` exists for operational replay of events whose
///   handling failed mid-flight
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append an event row to the log.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn append(&self, event: &PaymentEvent) -> Result<(), DomainError>;

    /// Mark an event as processed, stamping the processing time.
    ///
    /// # Errors
    ///
    /// - `EventNotFound` if the row doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn mark_processed(&self, id: PaymentEventId) -> Result<(), DomainError>;

    /// Fetch up to `limit` events that were appended but never marked
    /// processed, oldest first.
    async fn find_unprocessed(&self, limit: u32) -> Result<Vec<PaymentEvent>, DomainError>;
}
