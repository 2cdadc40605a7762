//! In-memory session ledger for tests and local development.
//!
//! Mirrors the SQL adapter's contract, including the provider session id
//! uniqueness check and latest-created ordering on lookups.
//!
//! # Panics
//!
//! Methods panic if internal locks are poisoned. Acceptable for test
//! code; production deployments use the Postgres adapter.

use async_trait::async_trait;
use std::sync::RwLock;

use crate::domain::billing::{PaymentSession, SessionStatus};
use crate::domain::foundation::{ChurchId, DomainError, ErrorCode, PlanId};
use crate::ports::SessionLedger;

/// In-memory PaymentSession store.
pub struct InMemorySessionLedger {
    rows: RwLock<Vec<PaymentSession>>,
}

impl InMemorySessionLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    // === Test Helpers ===

    /// Returns all rows (for test assertions).
    pub fn rows(&self) -> Vec<PaymentSession> {
        self.rows
            .read()
            .expect("InMemorySessionLedger: lock poisoned")
            .clone()
    }

    /// Clears all rows (for test isolation).
    pub fn clear(&self) {
        self.rows
            .write()
            .expect("InMemorySessionLedger: lock poisoned")
            .clear();
    }
}

impl Default for InMemorySessionLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Ties on creation time break on id, matching the SQL adapter's
/// `ORDER BY created_at DESC, id DESC`.
fn latest<'a>(iter: impl Iterator<Item = &'a PaymentSession>) -> Option<PaymentSession> {
    iter.max_by_key(|row| (row.created_at, *row.id.as_uuid()))
        .cloned()
}

#[async_trait]
impl SessionLedger for InMemorySessionLedger {
    async fn insert(&self, session: &PaymentSession) -> Result<(), DomainError> {
        let mut rows = self
            .rows
            .write()
            .expect("InMemorySessionLedger: lock poisoned");

        if rows
            .iter()
            .any(|row| row.provider_session_id == session.provider_session_id)
        {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                "Provider session id already recorded",
            )
            .with_detail("provider_session_id", session.provider_session_id.clone()));
        }

        rows.push(session.clone());
        Ok(())
    }

    async fn update(&self, session: &PaymentSession) -> Result<(), DomainError> {
        let mut rows = self
            .rows
            .write()
            .expect("InMemorySessionLedger: lock poisoned");

        match rows.iter_mut().find(|row| row.id == session.id) {
            Some(row) => {
                *row = session.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::SessionNotFound,
                "Payment session not found",
            )),
        }
    }

    async fn find_by_provider_session_and_status(
        &self,
        provider_session_id: &str,
        status: SessionStatus,
    ) -> Result<Option<PaymentSession>, DomainError> {
        let rows = self
            .rows
            .read()
            .expect("InMemorySessionLedger: lock poisoned");

        Ok(latest(rows.iter().filter(|row| {
            row.provider_session_id == provider_session_id && row.status == status
        })))
    }

    async fn find_by_church_plan_status(
        &self,
        church_id: ChurchId,
        plan_id: PlanId,
        status: SessionStatus,
    ) -> Result<Option<PaymentSession>, DomainError> {
        let rows = self
            .rows
            .read()
            .expect("InMemorySessionLedger: lock poisoned");

        Ok(latest(rows.iter().filter(|row| {
            row.church_id == church_id && row.plan_id == plan_id && row.status == status
        })))
    }
}
