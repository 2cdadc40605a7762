//! Shared mock adapters for billing handler tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::billing::{
    Church, ChurchSubscription, Currency, PaymentEvent, PaymentSession, Plan, PlanTier,
    ProviderEvent, SessionStatus, SubscriptionObject, SubscriptionStatus,
};
use crate::domain::foundation::{ChurchId, DomainError, ErrorCode, PaymentEventId, PlanId};
use crate::ports::{
    BillingGateway, BillingNotifier, CheckoutHandle, ChurchDirectory, CreateCheckoutRequest,
    EventStore, GatewayError, PlanCatalog, SessionLedger, SubscriptionLedger,
};

fn simulated_db_failure() -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, "Simulated database failure")
}

/// Plan with a fixed localized price grid, so tests can assert exact
/// amounts per currency.
pub fn plan_fixture(tier: PlanTier) -> Plan {
    Plan {
        id: PlanId::new(),
        tier,
        name: tier.display_name().to_string(),
        member_limit: Some(500),
        trial_days: 14,
        price_usd_cents: 2900,
        price_eur_cents: 2700,
        price_brl_cents: 14900,
    }
}

/// Decode a subscription snapshot literal for gateway seeding.
pub fn subscription_snapshot(object: serde_json::Value) -> SubscriptionObject {
    serde_json::from_value(object).unwrap()
}

// ════════════════════════════════════════════════════════════════════════════
// MockChurchDirectory
// ════════════════════════════════════════════════════════════════════════════

pub struct MockChurchDirectory {
    churches: RwLock<HashMap<ChurchId, Church>>,
}

impl MockChurchDirectory {
    pub fn new() -> Self {
        Self {
            churches: RwLock::new(HashMap::new()),
        }
    }

    pub fn add_church(&self, name: &str, billing_email: &str, currency: Currency) -> ChurchId {
        let church = Church {
            id: ChurchId::new(),
            name: name.to_string(),
            billing_email: billing_email.to_string(),
            currency,
        };
        let id = church.id;
        self.churches.write().unwrap().insert(id, church);
        id
    }
}

#[async_trait]
impl ChurchDirectory for MockChurchDirectory {
    async fn find_by_id(&self, id: ChurchId) -> Result<Option<Church>, DomainError> {
        Ok(self.churches.read().unwrap().get(&id).cloned())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MockPlanCatalog
// ════════════════════════════════════════════════════════════════════════════

pub struct MockPlanCatalog {
    plans: RwLock<HashMap<PlanId, Plan>>,
}

impl MockPlanCatalog {
    pub fn new() -> Self {
        Self {
            plans: RwLock::new(HashMap::new()),
        }
    }

    pub fn add_plan(&self, plan: Plan) -> PlanId {
        let id = plan.id;
        self.plans.write().unwrap().insert(id, plan);
        id
    }
}

#[async_trait]
impl PlanCatalog for MockPlanCatalog {
    async fn find_by_id(&self, id: PlanId) -> Result<Option<Plan>, DomainError> {
        Ok(self.plans.read().unwrap().get(&id).cloned())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MockSessionLedger
// ════════════════════════════════════════════════════════════════════════════

pub struct MockSessionLedger {
    rows: RwLock<Vec<PaymentSession>>,
    inserted: Mutex<Vec<PaymentSession>>,
    updated: Mutex<Vec<PaymentSession>>,
    fail: bool,
}

impl MockSessionLedger {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            inserted: Mutex::new(Vec::new()),
            updated: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn seed(&self, session: PaymentSession) {
        self.rows.write().unwrap().push(session);
    }

    pub fn inserted(&self) -> Vec<PaymentSession> {
        self.inserted.lock().unwrap().clone()
    }

    pub fn updated(&self) -> Vec<PaymentSession> {
        self.updated.lock().unwrap().clone()
    }

    /// Current state of a row, seeded or written, by provider session id.
    pub fn row(&self, provider_session_id: &str) -> Option<PaymentSession> {
        self.rows
            .read()
            .unwrap()
            .iter()
            .find(|row| row.provider_session_id == provider_session_id)
            .cloned()
    }

    fn check_fail(&self) -> Result<(), DomainError> {
        if self.fail {
            Err(simulated_db_failure())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SessionLedger for MockSessionLedger {
    async fn insert(&self, session: &PaymentSession) -> Result<(), DomainError> {
        self.check_fail()?;
        self.rows.write().unwrap().push(session.clone());
        self.inserted.lock().unwrap().push(session.clone());
        Ok(())
    }

    async fn update(&self, session: &PaymentSession) -> Result<(), DomainError> {
        self.check_fail()?;
        let mut rows = self.rows.write().unwrap();
        match rows.iter_mut().find(|row| row.id == session.id) {
            Some(row) => *row = session.clone(),
            None => {
                return Err(DomainError::new(
                    ErrorCode::SessionNotFound,
                    "Session row not found",
                ))
            }
        }
        self.updated.lock().unwrap().push(session.clone());
        Ok(())
    }

    async fn find_by_provider_session_and_status(
        &self,
        provider_session_id: &str,
        status: SessionStatus,
    ) -> Result<Option<PaymentSession>, DomainError> {
        self.check_fail()?;
        Ok(self
            .rows
            .read()
            .unwrap()
            .iter()
            .filter(|row| {
                row.provider_session_id == provider_session_id && row.status == status
            })
            .max_by_key(|row| row.created_at)
            .cloned())
    }

    async fn find_by_church_plan_status(
        &self,
        church_id: ChurchId,
        plan_id: PlanId,
        status: SessionStatus,
    ) -> Result<Option<PaymentSession>, DomainError> {
        self.check_fail()?;
        Ok(self
            .rows
            .read()
            .unwrap()
            .iter()
            .filter(|row| {
                row.church_id == church_id && row.plan_id == plan_id && row.status == status
            })
            .max_by_key(|row| row.created_at)
            .cloned())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MockSubscriptionLedger
// ════════════════════════════════════════════════════════════════════════════

pub struct MockSubscriptionLedger {
    rows: RwLock<Vec<ChurchSubscription>>,
    inserted: Mutex<Vec<ChurchSubscription>>,
    updated: Mutex<Vec<ChurchSubscription>>,
    /// Session rows written through `insert_with_session`.
    linked_sessions: Mutex<Vec<PaymentSession>>,
    fail: bool,
}

impl MockSubscriptionLedger {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            inserted: Mutex::new(Vec::new()),
            updated: Mutex::new(Vec::new()),
            linked_sessions: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn seed(&self, subscription: ChurchSubscription) {
        self.rows.write().unwrap().push(subscription);
    }

    pub fn inserted(&self) -> Vec<ChurchSubscription> {
        self.inserted.lock().unwrap().clone()
    }

    pub fn updated(&self) -> Vec<ChurchSubscription> {
        self.updated.lock().unwrap().clone()
    }

    pub fn linked_sessions(&self) -> Vec<PaymentSession> {
        self.linked_sessions.lock().unwrap().clone()
    }

    /// Current state of a row, seeded or written, by row id match on the
    /// provider subscription id.
    pub fn row_by_provider_id(&self, provider_subscription_id: &str) -> Option<ChurchSubscription> {
        self.rows
            .read()
            .unwrap()
            .iter()
            .find(|row| row.provider_subscription_id.as_deref() == Some(provider_subscription_id))
            .cloned()
    }

    fn check_fail(&self) -> Result<(), DomainError> {
        if self.fail {
            Err(simulated_db_failure())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SubscriptionLedger for MockSubscriptionLedger {
    async fn insert(&self, subscription: &ChurchSubscription) -> Result<(), DomainError> {
        self.check_fail()?;
        self.rows.write().unwrap().push(subscription.clone());
        self.inserted.lock().unwrap().push(subscription.clone());
        Ok(())
    }

    async fn insert_with_session(
        &self,
        subscription: &ChurchSubscription,
        session: &PaymentSession,
    ) -> Result<(), DomainError> {
        self.check_fail()?;
        self.rows.write().unwrap().push(subscription.clone());
        self.inserted.lock().unwrap().push(subscription.clone());
        self.linked_sessions.lock().unwrap().push(session.clone());
        Ok(())
    }

    async fn update(&self, subscription: &ChurchSubscription) -> Result<(), DomainError> {
        self.check_fail()?;
        let mut rows = self.rows.write().unwrap();
        match rows.iter_mut().find(|row| row.id == subscription.id) {
            Some(row) => *row = subscription.clone(),
            None => {
                return Err(DomainError::new(
                    ErrorCode::SubscriptionNotFound,
                    "Subscription row not found",
                ))
            }
        }
        self.updated.lock().unwrap().push(subscription.clone());
        Ok(())
    }

    async fn find_by_provider_subscription_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<ChurchSubscription>, DomainError> {
        self.check_fail()?;
        Ok(self
            .rows
            .read()
            .unwrap()
            .iter()
            .filter(|row| {
                row.provider_subscription_id.as_deref() == Some(provider_subscription_id)
            })
            .max_by_key(|row| row.created_at)
            .cloned())
    }

    async fn find_by_church_plan_status(
        &self,
        church_id: ChurchId,
        plan_id: PlanId,
        status: SubscriptionStatus,
    ) -> Result<Option<ChurchSubscription>, DomainError> {
        self.check_fail()?;
        Ok(self
            .rows
            .read()
            .unwrap()
            .iter()
            .filter(|row| {
                row.church_id == church_id && row.plan_id == plan_id && row.status == status
            })
            .max_by_key(|row| row.created_at)
            .cloned())
    }

    async fn find_by_church_and_plan(
        &self,
        church_id: ChurchId,
        plan_id: PlanId,
    ) -> Result<Option<ChurchSubscription>, DomainError> {
        self.check_fail()?;
        Ok(self
            .rows
            .read()
            .unwrap()
            .iter()
            .filter(|row| row.church_id == church_id && row.plan_id == plan_id)
            .max_by_key(|row| row.created_at)
            .cloned())
    }

    async fn find_active_by_church(
        &self,
        church_id: ChurchId,
    ) -> Result<Option<ChurchSubscription>, DomainError> {
        self.check_fail()?;
        Ok(self
            .rows
            .read()
            .unwrap()
            .iter()
            .filter(|row| row.church_id == church_id && row.status == SubscriptionStatus::Active)
            .max_by_key(|row| row.created_at)
            .cloned())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MockEventStore
// ════════════════════════════════════════════════════════════════════════════

pub struct MockEventStore {
    events: Mutex<Vec<PaymentEvent>>,
    processed: Mutex<Vec<PaymentEventId>>,
    fail_append: bool,
    fail_mark: bool,
}

impl MockEventStore {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            processed: Mutex::new(Vec::new()),
            fail_append: false,
            fail_mark: false,
        }
    }

    pub fn failing_append() -> Self {
        Self {
            fail_append: true,
            ..Self::new()
        }
    }

    pub fn failing_mark() -> Self {
        Self {
            fail_mark: true,
            ..Self::new()
        }
    }

    pub fn appended(&self) -> Vec<PaymentEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn processed_ids(&self) -> Vec<PaymentEventId> {
        self.processed.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventStore for MockEventStore {
    async fn append(&self, event: &PaymentEvent) -> Result<(), DomainError> {
        if self.fail_append {
            return Err(simulated_db_failure());
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn mark_processed(&self, id: PaymentEventId) -> Result<(), DomainError> {
        if self.fail_mark {
            return Err(simulated_db_failure());
        }
        self.processed.lock().unwrap().push(id);
        Ok(())
    }

    async fn find_unprocessed(&self, limit: u32) -> Result<Vec<PaymentEvent>, DomainError> {
        let processed = self.processed.lock().unwrap();
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| !processed.contains(&event.id))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MockBillingGateway
// ════════════════════════════════════════════════════════════════════════════

pub struct MockBillingGateway {
    checkout_calls: Mutex<Vec<CreateCheckoutRequest>>,
    checkout_seq: AtomicU32,
    subscriptions: RwLock<HashMap<String, SubscriptionObject>>,
    fail_checkout: bool,
    fail_verify: bool,
    fail_retrieve: bool,
}

impl MockBillingGateway {
    pub fn new() -> Self {
        Self {
            checkout_calls: Mutex::new(Vec::new()),
            checkout_seq: AtomicU32::new(0),
            subscriptions: RwLock::new(HashMap::new()),
            fail_checkout: false,
            fail_verify: false,
            fail_retrieve: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_checkout: true,
            ..Self::new()
        }
    }

    pub fn rejecting_signatures() -> Self {
        Self {
            fail_verify: true,
            ..Self::new()
        }
    }

    pub fn failing_retrieve() -> Self {
        Self {
            fail_retrieve: true,
            ..Self::new()
        }
    }

    /// Seed a subscription snapshot served by `retrieve_subscription`.
    pub fn with_subscription(self, snapshot: SubscriptionObject) -> Self {
        self.subscriptions
            .write()
            .unwrap()
            .insert(snapshot.id.clone(), snapshot);
        self
    }

    pub fn checkout_requests(&self) -> Vec<CreateCheckoutRequest> {
        self.checkout_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BillingGateway for MockBillingGateway {
    fn verify_and_decode(
        &self,
        payload: &[u8],
        _signature_header: &str,
    ) -> Result<ProviderEvent, GatewayError> {
        if self.fail_verify {
            return Err(GatewayError::InvalidSignature(
                "simulated rejection".to_string(),
            ));
        }
        let raw: serde_json::Value =
            serde_json::from_slice(payload).map_err(|e| GatewayError::ParseError(e.to_string()))?;
        let object = raw["data"]["object"].clone();
        Ok(ProviderEvent::new(
            raw["id"].as_str().unwrap_or_default().to_string(),
            raw["type"].as_str().unwrap_or_default().to_string(),
            raw["created"].as_i64().unwrap_or_default(),
            raw["livemode"].as_bool().unwrap_or_default(),
            &object,
            raw,
        ))
    }

    async fn retrieve_subscription(
        &self,
        provider_subscription_id: &str,
    ) -> Result<SubscriptionObject, GatewayError> {
        if self.fail_retrieve {
            return Err(GatewayError::Network("simulated outage".to_string()));
        }
        self.subscriptions
            .read()
            .unwrap()
            .get(provider_subscription_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(provider_subscription_id.to_string()))
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutHandle, GatewayError> {
        self.checkout_calls.lock().unwrap().push(request);
        if self.fail_checkout {
            return Err(GatewayError::ProviderError {
                status: 400,
                message: "Simulated checkout rejection".to_string(),
            });
        }
        let seq = self.checkout_seq.fetch_add(1, Ordering::SeqCst);
        Ok(CheckoutHandle {
            session_id: format!("cs_mock_{}", seq),
            client_secret: format!("cs_mock_{}_secret_abc", seq),
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MockBillingNotifier
// ════════════════════════════════════════════════════════════════════════════

pub struct MockBillingNotifier {
    payment_failed: Mutex<Vec<ChurchId>>,
    action_required: Mutex<Vec<(ChurchId, String)>>,
    fail: bool,
    hang: bool,
}

impl MockBillingNotifier {
    pub fn new() -> Self {
        Self {
            payment_failed: Mutex::new(Vec::new()),
            action_required: Mutex::new(Vec::new()),
            fail: false,
            hang: false,
        }
    }

    /// Records the attempt, then reports delivery failure.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Records the attempt, then never completes.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::new()
        }
    }

    pub fn payment_failed_notices(&self) -> Vec<ChurchId> {
        self.payment_failed.lock().unwrap().clone()
    }

    pub fn action_required_notices(&self) -> Vec<(ChurchId, String)> {
        self.action_required.lock().unwrap().clone()
    }

    async fn outcome(&self) -> Result<(), DomainError> {
        if self.hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.fail {
            return Err(DomainError::new(
                ErrorCode::NotificationError,
                "Simulated delivery failure",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BillingNotifier for MockBillingNotifier {
    async fn send_payment_failed(&self, church_id: ChurchId) -> Result<(), DomainError> {
        self.payment_failed.lock().unwrap().push(church_id);
        self.outcome().await
    }

    async fn send_payment_action_required(
        &self,
        church_id: ChurchId,
        hosted_invoice_url: &str,
    ) -> Result<(), DomainError> {
        self.action_required
            .lock()
            .unwrap()
            .push((church_id, hosted_invoice_url.to_string()));
        self.outcome().await
    }
}
