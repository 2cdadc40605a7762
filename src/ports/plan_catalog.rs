//! Plan catalog port.
//!
//! Read-only lookup of subscription plans by id. Plans are managed
//! outside this subsystem; checkout only needs pricing, trial length,
//! and the display name.

use crate::domain::billing::Plan;
use crate::domain::foundation::{DomainError, PlanId};
use async_trait::async_trait;

/// Read-only access to the plan catalog.
#[async_trait]
pub trait PlanCatalog: Send + Sync {
    /// Look up a plan by id.
    ///
    /// Returns `None` if no plan with that id exists.
    async fn find_by_id(&self, id: PlanId) -> Result<Option<Plan>, DomainError>;
}
