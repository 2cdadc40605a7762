//! In-memory event store for tests and local development.
//!
//! Append-only like the SQL adapter; rows only ever change by flipping
//! the processed marker.
//!
//! # Panics
//!
//! Methods panic if internal locks are poisoned. Acceptable for test
//! code; production deployments use the Postgres adapter.

use async_trait::async_trait;
use std::sync::RwLock;

use crate::domain::billing::PaymentEvent;
use crate::domain::foundation::{DomainError, ErrorCode, PaymentEventId};
use crate::ports::EventStore;

/// In-memory PaymentEvent log.
pub struct InMemoryEventStore {
    rows: RwLock<Vec<PaymentEvent>>,
}

impl InMemoryEventStore {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    // === Test Helpers ===

    /// Returns all rows (for test assertions).
    pub fn rows(&self) -> Vec<PaymentEvent> {
        self.rows
            .read()
            .expect("InMemoryEventStore: lock poisoned")
            .clone()
    }

    /// Clears all rows (for test isolation).
    pub fn clear(&self) {
        self.rows
            .write()
            .expect("InMemoryEventStore: lock poisoned")
            .clear();
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: &PaymentEvent) -> Result<(), DomainError> {
        self.rows
            .write()
            .expect("InMemoryEventStore: lock poisoned")
            .push(event.clone());
        Ok(())
    }

    async fn mark_processed(&self, id: PaymentEventId) -> Result<(), DomainError> {
        let mut rows = self
            .rows
            .write()
            .expect("InMemoryEventStore: lock poisoned");

        match rows.iter_mut().find(|row| row.id == id) {
            Some(row) => {
                row.mark_processed();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::EventNotFound,
                "Payment event not found",
            )),
        }
    }

    async fn find_unprocessed(&self, limit: u32) -> Result<Vec<PaymentEvent>, DomainError> {
        let rows = self
            .rows
            .read()
            .expect("InMemoryEventStore: lock poisoned");

        let mut unprocessed: Vec<PaymentEvent> =
            rows.iter().filter(|row| !row.processed).cloned().collect();
        unprocessed.sort_by_key(|row| row.created_at);
        unprocessed.truncate(limit as usize);

        Ok(unprocessed)
    }
}
