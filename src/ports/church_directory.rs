//! Church directory port.
//!
//! Read-only lookup of tenant churches. Checkout needs the currency
//! preference and billing contact; the reconciliation engine only ever
//! references churches by id.

use crate::domain::billing::Church;
use crate::domain::foundation::{ChurchId, DomainError};
use async_trait::async_trait;

/// Read-only access to tenant churches.
#[async_trait]
pub trait ChurchDirectory: Send + Sync {
    /// Look up a church by id.
    ///
    /// Returns `None` if no church with that id exists.
    async fn find_by_id(&self, id: ChurchId) -> Result<Option<Church>, DomainError>;
}
