//! Payment session entity and status state machine.
//!
//! A PaymentSession tracks one checkout attempt from initiation through
//! settlement. Each attempt creates a new row; re-attempting checkout never
//! reuses an old row. When several rows match a (church, plan) pair the
//! engine treats the most recently created one as authoritative.

use crate::domain::foundation::{
    ChurchId, DomainError, ErrorCode, PaymentSessionId, PlanId, StateMachine, Timestamp,
};
use serde::{Deserialize, Serialize};

/// Checkout attempt status.
///
/// Tracks where a checkout attempt is in the payment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Checkout initiated, provider session exists, admin has not finished.
    Pending,

    /// Checkout completed upstream; subscription object exists but the
    /// first invoice has not been paid yet.
    Created,

    /// First invoice paid. Terminal.
    Completed,

    /// Checkout abandoned or timed out upstream. Terminal.
    Expired,
}

impl StateMachine for SessionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SessionStatus::*;
        matches!(
            (self, target),
            (Pending, Created) | (Pending, Expired) | (Created, Completed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SessionStatus::*;
        match self {
            Pending => vec![Created, Expired],
            Created => vec![Completed],
            Completed => vec![],
            Expired => vec![],
        }
    }
}

/// Payment session entity - one row per checkout attempt.
///
/// # Invariants
///
/// - `provider_session_id` is unique per attempt
/// - Status transitions follow state machine rules
/// - Mutated only by the reconciliation engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    /// Unique identifier for this session row.
    pub id: PaymentSessionId,

    /// Church (tenant) that initiated the checkout.
    pub church_id: ChurchId,

    /// Plan being purchased.
    pub plan_id: PlanId,

    /// Provider checkout session identifier (cs_xxx).
    pub provider_session_id: String,

    /// Current status in the checkout lifecycle.
    pub status: SessionStatus,

    /// When the session was created.
    pub created_at: Timestamp,

    /// When the session was last updated.
    pub updated_at: Timestamp,
}

impl PaymentSession {
    /// Create a new pending session for an initiated checkout.
    pub fn initiate(
        id: PaymentSessionId,
        church_id: ChurchId,
        plan_id: PlanId,
        provider_session_id: String,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            church_id,
            plan_id,
            provider_session_id,
            status: SessionStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance to `created` after the provider reports checkout completion.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn mark_created(&mut self) -> Result<(), DomainError> {
        self.transition_to(SessionStatus::Created)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Advance to `completed` after the first invoice is paid.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn complete(&mut self) -> Result<(), DomainError> {
        self.transition_to(SessionStatus::Completed)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Advance to `expired` after the provider reports checkout abandonment.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn expire(&mut self) -> Result<(), DomainError> {
        self.transition_to(SessionStatus::Expired)?;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// True while the checkout is still awaiting upstream completion.
    pub fn is_pending(&self) -> bool {
        self.status == SessionStatus::Pending
    }

    /// Transition to a new status using the state machine.
    fn transition_to(&mut self, target: SessionStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition session from {:?} to {:?}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}
