//! In-memory subscription ledger for tests and local development.
//!
//! Holds a handle to the session ledger so `insert_with_session` can
//! flip the session row the way the SQL transaction does: the session
//! update runs first and a missing session leaves the subscription
//! unwritten.
//!
//! # Panics
//!
//! Methods panic if internal locks are poisoned. Acceptable for test
//! code; production deployments use the Postgres adapter.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::domain::billing::{ChurchSubscription, PaymentSession, SubscriptionStatus};
use crate::domain::foundation::{ChurchId, DomainError, ErrorCode, PlanId};
use crate::ports::{SessionLedger, SubscriptionLedger};

use super::session_ledger::InMemorySessionLedger;

/// In-memory ChurchSubscription store.
pub struct InMemorySubscriptionLedger {
    rows: RwLock<Vec<ChurchSubscription>>,
    sessions: Arc<InMemorySessionLedger>,
}

impl InMemorySubscriptionLedger {
    /// Creates an empty ledger sharing the given session store.
    pub fn new(sessions: Arc<InMemorySessionLedger>) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            sessions,
        }
    }

    // === Test Helpers ===

    /// Returns all rows (for test assertions).
    pub fn rows(&self) -> Vec<ChurchSubscription> {
        self.rows
            .read()
            .expect("InMemorySubscriptionLedger: lock poisoned")
            .clone()
    }

    /// Clears all rows (for test isolation).
    pub fn clear(&self) {
        self.rows
            .write()
            .expect("InMemorySubscriptionLedger: lock poisoned")
            .clear();
    }
}

/// Ties on creation time break on id, matching the SQL adapter's
/// `ORDER BY created_at DESC, id DESC`.
fn latest<'a>(iter: impl Iterator<Item = &'a ChurchSubscription>) -> Option<ChurchSubscription> {
    iter.max_by_key(|row| (row.created_at, *row.id.as_uuid()))
        .cloned()
}

#[async_trait]
impl SubscriptionLedger for InMemorySubscriptionLedger {
    async fn insert(&self, subscription: &ChurchSubscription) -> Result<(), DomainError> {
        self.rows
            .write()
            .expect("InMemorySubscriptionLedger: lock poisoned")
            .push(subscription.clone());
        Ok(())
    }

    async fn insert_with_session(
        &self,
        subscription: &ChurchSubscription,
        session: &PaymentSession,
    ) -> Result<(), DomainError> {
        // Session update first: a missing session must abort before the
        // subscription row exists anywhere.
        self.sessions.update(session).await?;
        self.insert(subscription).await
    }

    async fn update(&self, subscription: &ChurchSubscription) -> Result<(), DomainError> {
        let mut rows = self
            .rows
            .write()
            .expect("InMemorySubscriptionLedger: lock poisoned");

        match rows.iter_mut().find(|row| row.id == subscription.id) {
            Some(row) => {
                *row = subscription.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                "Subscription not found",
            )),
        }
    }

    async fn find_by_provider_subscription_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<ChurchSubscription>, DomainError> {
        let rows = self
            .rows
            .read()
            .expect("InMemorySubscriptionLedger: lock poisoned");

        Ok(latest(rows.iter().filter(|row| {
            row.provider_subscription_id.as_deref() == Some(provider_subscription_id)
        })))
    }

    async fn find_by_church_plan_status(
        &self,
        church_id: ChurchId,
        plan_id: PlanId,
        status: SubscriptionStatus,
    ) -> Result<Option<ChurchSubscription>, DomainError> {
        let rows = self
            .rows
            .read()
            .expect("InMemorySubscriptionLedger: lock poisoned");

        Ok(latest(rows.iter().filter(|row| {
            row.church_id == church_id && row.plan_id == plan_id && row.status == status
        })))
    }

    async fn find_by_church_and_plan(
        &self,
        church_id: ChurchId,
        plan_id: PlanId,
    ) -> Result<Option<ChurchSubscription>, DomainError> {
        let rows = self
            .rows
            .read()
            .expect("InMemorySubscriptionLedger: lock poisoned");

        Ok(latest(rows.iter().filter(|row| {
            row.church_id == church_id && row.plan_id == plan_id
        })))
    }

    async fn find_active_by_church(
        &self,
        church_id: ChurchId,
    ) -> Result<Option<ChurchSubscription>, DomainError> {
        let rows = self
            .rows
            .read()
            .expect("InMemorySubscriptionLedger: lock poisoned");

        Ok(latest(rows.iter().filter(|row| {
            row.church_id == church_id && row.status == SubscriptionStatus::Active
        })))
    }
}
