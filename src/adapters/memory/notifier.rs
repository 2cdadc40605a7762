//! In-memory billing notifier for tests and local development.
//!
//! Records every notice instead of delivering it, so tests can assert
//! exactly which churches were notified.
//!
//! # Panics
//!
//! Methods panic if internal locks are poisoned. Acceptable for test
//! code; production deployments use the email notifier adapter.

use async_trait::async_trait;
use std::sync::RwLock;

use crate::domain::foundation::{ChurchId, DomainError};
use crate::ports::BillingNotifier;

/// Recording BillingNotifier.
pub struct InMemoryBillingNotifier {
    payment_failed: RwLock<Vec<ChurchId>>,
    action_required: RwLock<Vec<(ChurchId, String)>>,
}

impl InMemoryBillingNotifier {
    /// Creates a notifier with empty records.
    pub fn new() -> Self {
        Self {
            payment_failed: RwLock::new(Vec::new()),
            action_required: RwLock::new(Vec::new()),
        }
    }

    // === Test Helpers ===

    /// Churches that received a payment-failed notice, in order.
    pub fn payment_failed_notices(&self) -> Vec<ChurchId> {
        self.payment_failed
            .read()
            .expect("InMemoryBillingNotifier: lock poisoned")
            .clone()
    }

    /// Churches and hosted URLs behind action-required notices, in order.
    pub fn action_required_notices(&self) -> Vec<(ChurchId, String)> {
        self.action_required
            .read()
            .expect("InMemoryBillingNotifier: lock poisoned")
            .clone()
    }

    /// Clears all records (for test isolation).
    pub fn clear(&self) {
        self.payment_failed
            .write()
            .expect("InMemoryBillingNotifier: lock poisoned")
            .clear();
        self.action_required
            .write()
            .expect("InMemoryBillingNotifier: lock poisoned")
            .clear();
    }
}

impl Default for InMemoryBillingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BillingNotifier for InMemoryBillingNotifier {
    async fn send_payment_failed(&self, church_id: ChurchId) -> Result<(), DomainError> {
        self.payment_failed
            .write()
            .expect("InMemoryBillingNotifier: lock poisoned")
            .push(church_id);
        Ok(())
    }

    async fn send_payment_action_required(
        &self,
        church_id: ChurchId,
        hosted_invoice_url: &str,
    ) -> Result<(), DomainError> {
        self.action_required
            .write()
            .expect("InMemoryBillingNotifier: lock poisoned")
            .push((church_id, hosted_invoice_url.to_string()));
        Ok(())
    }
}
