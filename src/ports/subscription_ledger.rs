//! Subscription ledger port.
//!
//! Defines the contract for persisting and retrieving ChurchSubscription
//! rows. A church accumulates rows over time (one per subscription
//! lifecycle); "current" always means the latest-created row, so every
//! multi-row lookup orders by creation time descending.

use crate::domain::billing::{ChurchSubscription, PaymentSession, SubscriptionStatus};
use crate::domain::foundation::{ChurchId, DomainError, PlanId};
use async_trait::async_trait;

/// Repository port for ChurchSubscription persistence.
///
/// # Design
///
/// - Lookups never collapse history: superseded rows stay in place and
///   "latest created wins" picks the current one
/// - `insert_with_session` exists so checkout completion can write the
///   subscription and flip its session in one transaction
#[async_trait]
pub trait SubscriptionLedger: Send + Sync {
    /// Persist a new subscription row.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, subscription: &ChurchSubscription) -> Result<(), DomainError>;

    /// Persist a new subscription row and update its originating session
    /// atomically.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session row doesn't exist
    /// - `DatabaseError` on persistence failure; neither write survives
    async fn insert_with_session(
        &self,
        subscription: &ChurchSubscription,
        session: &PaymentSession,
    ) -> Result<(), DomainError>;

    /// Update an existing subscription row.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the row doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, subscription: &ChurchSubscription) -> Result<(), DomainError>;

    /// Find the latest subscription carrying the given provider
    /// subscription id.
    ///
    /// Returns `None` if no row matches.
    async fn find_by_provider_subscription_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<ChurchSubscription>, DomainError>;

    /// Find the latest subscription for a church and plan in the given
    /// status.
    ///
    /// Returns `None` if no row matches.
    async fn find_by_church_plan_status(
        &self,
        church_id: ChurchId,
        plan_id: PlanId,
        status: SubscriptionStatus,
    ) -> Result<Option<ChurchSubscription>, DomainError>;

    /// Find the latest subscription for a church and plan, regardless of
    /// status.
    ///
    /// Returns `None` if the church never subscribed to the plan.
    async fn find_by_church_and_plan(
        &self,
        church_id: ChurchId,
        plan_id: PlanId,
    ) -> Result<Option<ChurchSubscription>, DomainError>;

    /// Find the latest active subscription for a church.
    ///
    /// Returns `None` if the church has no active subscription.
    async fn find_active_by_church(
        &self,
        church_id: ChurchId,
    ) -> Result<Option<ChurchSubscription>, DomainError>;
}
