//! Session ledger port.
//!
//! Defines the contract for persisting and retrieving PaymentSession rows.
//! One row per checkout attempt; the reconciliation engine is the only
//! writer after creation.

use crate::domain::billing::{PaymentSession, SessionStatus};
use crate::domain::foundation::{ChurchId, DomainError, PlanId};
use async_trait::async_trait;

/// Repository port for PaymentSession persistence.
///
/// Lookups that can match several rows must return the most recently
/// created one; result ordering is part of the contract, not an accident
/// of the underlying store.
#[async_trait]
pub trait SessionLedger: Send + Sync {
    /// Persist a new session row.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the provider session id already exists
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, session: &PaymentSession) -> Result<(), DomainError>;

    /// Update an existing session row.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the row doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, session: &PaymentSession) -> Result<(), DomainError>;

    /// Find the most recent session with the given provider session id and
    /// status.
    ///
    /// Returns `None` if no row matches.
    async fn find_by_provider_session_and_status(
        &self,
        provider_session_id: &str,
        status: SessionStatus,
    ) -> Result<Option<PaymentSession>, DomainError>;

    /// Find the most recent session for a church and plan in the given
    /// status.
    ///
    /// Returns `None` if no row matches.
    async fn find_by_church_plan_status(
        &self,
        church_id: ChurchId,
        plan_id: PlanId,
        status: SessionStatus,
    ) -> Result<Option<PaymentSession>, DomainError>;
}
