//! In-memory plan catalog for tests and local development.
//!
//! # Panics
//!
//! Methods panic if internal locks are poisoned. Acceptable for test
//! code; production deployments use the Postgres adapter.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::billing::Plan;
use crate::domain::foundation::{DomainError, PlanId};
use crate::ports::PlanCatalog;

/// In-memory plan lookup, seeded through [`add_plan`](Self::add_plan).
pub struct InMemoryPlanCatalog {
    plans: RwLock<HashMap<PlanId, Plan>>,
}

impl InMemoryPlanCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self {
            plans: RwLock::new(HashMap::new()),
        }
    }

    /// Seeds a plan.
    pub fn add_plan(&self, plan: Plan) {
        self.plans
            .write()
            .expect("InMemoryPlanCatalog: lock poisoned")
            .insert(plan.id, plan);
    }
}

impl Default for InMemoryPlanCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlanCatalog for InMemoryPlanCatalog {
    async fn find_by_id(&self, id: PlanId) -> Result<Option<Plan>, DomainError> {
        Ok(self
            .plans
            .read()
            .expect("InMemoryPlanCatalog: lock poisoned")
            .get(&id)
            .cloned())
    }
}
