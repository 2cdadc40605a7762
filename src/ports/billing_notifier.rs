//! Billing notifier port.
//!
//! Outbound notifications triggered by invoice events. Delivery is
//! best-effort: the reconciliation engine attempts each notification
//! exactly once, logs failures, and never lets them affect ledger state
//! or the webhook acknowledgment.

use crate::domain::foundation::{ChurchId, DomainError};
use async_trait::async_trait;

/// Outbound billing notifications to a church's billing contact.
#[async_trait]
pub trait BillingNotifier: Send + Sync {
    /// Notify the church that an invoice payment failed.
    ///
    /// # Errors
    ///
    /// - `NotificationError` on delivery failure; callers swallow and log
    async fn send_payment_failed(&self, church_id: ChurchId) -> Result<(), DomainError>;

    /// Notify the church that an invoice needs manual action, carrying
    /// the provider's hosted payment URL.
    ///
    /// # Errors
    ///
    /// - `NotificationError` on delivery failure; callers swallow and log
    async fn send_payment_action_required(
        &self,
        church_id: ChurchId,
        hosted_invoice_url: &str,
    ) -> Result<(), DomainError>;
}
