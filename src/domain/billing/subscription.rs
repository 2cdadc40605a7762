//! Church subscription entity and status state machine.
//!
//! A ChurchSubscription is the local record of a tenant's billing
//! relationship, independent of the provider's own subscription object.
//! Rows are never deleted; the most recently created row per church is the
//! current one, so every read selects latest by creation time.

use crate::domain::foundation::{
    ChurchId, DomainError, ErrorCode, PlanId, StateMachine, SubscriptionId, Timestamp,
};
use serde::{Deserialize, Serialize};

use super::plan::Currency;

/// Billing subscription status.
///
/// The provider's reported status is authoritative: any status may be
/// mirrored to `active`, `past_due`, `canceled`, or `expired` when an
/// update event arrives. Nothing re-enters `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Subscription row exists but the provider has not confirmed it.
    Pending,

    /// Paid and current.
    Active,

    /// Payment failed, provider is retrying.
    PastDue,

    /// Explicitly cancelled.
    Canceled,

    /// Ended without renewal.
    Expired,
}

impl SubscriptionStatus {
    /// Maps a provider-reported status string onto a local status.
    ///
    /// Returns `None` for statuses with no local equivalent; callers must
    /// leave the current status untouched in that case rather than guess.
    pub fn from_provider(status: &str) -> Option<Self> {
        match status {
            "active" | "trialing" => Some(SubscriptionStatus::Active),
            "past_due" | "unpaid" => Some(SubscriptionStatus::PastDue),
            "canceled" => Some(SubscriptionStatus::Canceled),
            "incomplete_expired" => Some(SubscriptionStatus::Expired),
            _ => None,
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        // Provider events may report any of the four settled statuses at
        // any time and in any order; only `pending` is entry-only.
        !matches!(target, SubscriptionStatus::Pending)
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        vec![Active, PastDue, Canceled, Expired]
    }
}

/// Church subscription entity - the tenant's billing record.
///
/// # Invariants
///
/// - At most one current row per church (most recently created wins)
/// - `provider_subscription_id` is nullable until first reported upstream
/// - Mutated only by the reconciliation engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChurchSubscription {
    /// Unique identifier for this subscription row.
    pub id: SubscriptionId,

    /// Church (tenant) this subscription bills.
    pub church_id: ChurchId,

    /// Plan the church subscribed to.
    pub plan_id: PlanId,

    /// Provider customer identifier (cus_xxx).
    pub provider_customer_id: String,

    /// Provider subscription identifier (sub_xxx), backfilled once known.
    pub provider_subscription_id: Option<String>,

    /// Current status in the billing lifecycle.
    pub status: SubscriptionStatus,

    /// Start of the current billing period, when reported.
    pub current_period_start: Option<Timestamp>,

    /// End of the current billing period, when reported.
    pub current_period_end: Option<Timestamp>,

    /// Scheduled cancellation time, when reported.
    pub cancel_at: Option<Timestamp>,

    /// When the subscription was cancelled.
    pub canceled_at: Option<Timestamp>,

    /// Recurring amount in minor units (cents, centavos).
    pub amount_cents: i64,

    /// Currency the amount is denominated in.
    pub currency: Currency,

    /// When the subscription row was created.
    pub created_at: Timestamp,

    /// When the subscription row was last updated.
    pub updated_at: Timestamp,
}

impl ChurchSubscription {
    /// Create an active subscription from a completed checkout.
    ///
    /// The subscription is active immediately; the session ledger's
    /// `created` status gates first-invoice promotion separately.
    #[allow(clippy::too_many_arguments)]
    pub fn activate_from_checkout(
        id: SubscriptionId,
        church_id: ChurchId,
        plan_id: PlanId,
        provider_customer_id: String,
        provider_subscription_id: Option<String>,
        current_period_start: Option<Timestamp>,
        current_period_end: Option<Timestamp>,
        amount_cents: i64,
        currency: Currency,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            church_id,
            plan_id,
            provider_customer_id,
            provider_subscription_id,
            status: SubscriptionStatus::Active,
            current_period_start,
            current_period_end,
            cancel_at: None,
            canceled_at: None,
            amount_cents,
            currency,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mirror provider-reported status and period bookkeeping.
    ///
    /// Timestamps are only copied when the caller passes `Some`; absent or
    /// invalid provider timestamps must leave local values untouched.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn sync_from_provider(
        &mut self,
        status: Option<SubscriptionStatus>,
        current_period_start: Option<Timestamp>,
        current_period_end: Option<Timestamp>,
        cancel_at: Option<Timestamp>,
        canceled_at: Option<Timestamp>,
    ) -> Result<(), DomainError> {
        if let Some(status) = status {
            self.transition_to(status)?;
        }
        if let Some(start) = current_period_start {
            self.current_period_start = Some(start);
        }
        if let Some(end) = current_period_end {
            self.current_period_end = Some(end);
        }
        if let Some(at) = cancel_at {
            self.cancel_at = Some(at);
        }
        if let Some(at) = canceled_at {
            self.canceled_at = Some(at);
        }
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Cancel this subscription and stamp the cancellation time.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Canceled)?;
        self.canceled_at = Some(Timestamp::now());
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Mark payment as past due after a failed invoice.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn mark_past_due(&mut self) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::PastDue)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Return to active after a successful invoice payment.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn reactivate(&mut self) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Active)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Backfill the provider subscription id if it is not yet recorded.
    ///
    /// An already-recorded id is never overwritten.
    pub fn attach_provider_subscription(&mut self, provider_subscription_id: &str) {
        if self.provider_subscription_id.is_none() {
            self.provider_subscription_id = Some(provider_subscription_id.to_string());
            self.updated_at = Timestamp::now();
        }
    }

    /// True when the subscription is paid and current.
    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    /// Transition to a new status using the state machine.
    fn transition_to(&mut self, target: SubscriptionStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition subscription from {:?} to {:?}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}
