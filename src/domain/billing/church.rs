//! Church tenant snapshot.
//!
//! The billing service only needs a narrow view of a church: who to bill,
//! in which currency, and where failure notices go. Full tenant management
//! lives elsewhere.

use crate::domain::foundation::ChurchId;
use serde::{Deserialize, Serialize};

use super::plan::Currency;

/// Billing-relevant view of a church tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Church {
    /// Unique identifier for this church.
    pub id: ChurchId,

    /// Display name.
    pub name: String,

    /// Billing contact address for payment notices.
    pub billing_email: String,

    /// Currency this church is billed in.
    pub currency: Currency,
}
