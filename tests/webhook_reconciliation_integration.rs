//! Integration tests for webhook reconciliation over HTTP.
//!
//! These tests verify the end-to-end delivery flow:
//! 1. The provider signs the raw body with HMAC-SHA256 over `timestamp.payload`
//! 2. POST /payment/webhook verifies the signature before anything else
//! 3. Verified deliveries append an audit row before any ledger effect
//! 4. The event-type effect lands on the session and subscription ledgers
//! 5. The endpoint acknowledges with 200 regardless of outcome
//!
//! Uses the in-memory ledgers behind the real router, with a gateway double
//! that runs the production signature verifier so the bytes on the wire are
//! checked exactly as in deployment. The auth middleware is layered on as in
//! the real service; webhook deliveries carry no bearer token.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tower::ServiceExt;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::{middleware, Router};
use secrecy::SecretString;

use steeple_billing::adapters::http::middleware::{auth_middleware, AuthState, JwtVerifier};
use steeple_billing::adapters::http::{payment_router, BillingAppState};
use steeple_billing::adapters::memory::{
    InMemoryBillingNotifier, InMemoryChurchDirectory, InMemoryEventStore, InMemoryPlanCatalog,
    InMemorySessionLedger, InMemorySubscriptionLedger,
};
use steeple_billing::domain::billing::{
    Church, ChurchSubscription, Currency, PaymentSession, Plan, PlanTier, ProviderEvent,
    SessionStatus, SubscriptionObject, SubscriptionStatus, VerificationError, WebhookVerifier,
};
use steeple_billing::domain::foundation::{
    ChurchId, PaymentSessionId, PlanId, SubscriptionId, Timestamp,
};
use steeple_billing::ports::{
    BillingGateway, CheckoutHandle, CreateCheckoutRequest, GatewayError, SessionLedger,
    SubscriptionLedger,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

const WEBHOOK_SECRET: &str = "whsec_integration_test_secret";
const JWT_SECRET: &str = "integration-test-signing-secret";

/// Gateway double that runs the real signature verifier and serves canned
/// subscription snapshots instead of calling the provider API.
struct VerifyingGateway {
    verifier: WebhookVerifier,
    snapshots: RwLock<HashMap<String, SubscriptionObject>>,
}

impl VerifyingGateway {
    fn new() -> Self {
        Self {
            verifier: WebhookVerifier::new(WEBHOOK_SECRET),
            snapshots: RwLock::new(HashMap::new()),
        }
    }

    fn add_snapshot(&self, object: serde_json::Value) {
        let snapshot: SubscriptionObject = serde_json::from_value(object).unwrap();
        self.snapshots
            .write()
            .unwrap()
            .insert(snapshot.id.clone(), snapshot);
    }
}

#[async_trait]
impl BillingGateway for VerifyingGateway {
    fn verify_and_decode(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<ProviderEvent, GatewayError> {
        self.verifier
            .verify_and_parse(payload, signature_header)
            .map_err(|e| match e {
                VerificationError::ParseError(msg) => GatewayError::ParseError(msg),
                other => GatewayError::InvalidSignature(other.to_string()),
            })
    }

    async fn retrieve_subscription(
        &self,
        provider_subscription_id: &str,
    ) -> Result<SubscriptionObject, GatewayError> {
        self.snapshots
            .read()
            .unwrap()
            .get(provider_subscription_id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(provider_subscription_id.to_string()))
    }

    async fn create_checkout_session(
        &self,
        _request: CreateCheckoutRequest,
    ) -> Result<CheckoutHandle, GatewayError> {
        Ok(CheckoutHandle {
            session_id: "cs_unused".to_string(),
            client_secret: "cs_unused_secret".to_string(),
        })
    }
}

/// The real router wired to in-memory ledgers, with handles kept for
/// seeding and assertions.
struct TestApp {
    router: Router,
    churches: Arc<InMemoryChurchDirectory>,
    plans: Arc<InMemoryPlanCatalog>,
    sessions: Arc<InMemorySessionLedger>,
    subscriptions: Arc<InMemorySubscriptionLedger>,
    events: Arc<InMemoryEventStore>,
    gateway: Arc<VerifyingGateway>,
    notifier: Arc<InMemoryBillingNotifier>,
}

fn test_app() -> TestApp {
    let churches = Arc::new(InMemoryChurchDirectory::new());
    let plans = Arc::new(InMemoryPlanCatalog::new());
    let sessions = Arc::new(InMemorySessionLedger::new());
    let subscriptions = Arc::new(InMemorySubscriptionLedger::new(sessions.clone()));
    let events = Arc::new(InMemoryEventStore::new());
    let gateway = Arc::new(VerifyingGateway::new());
    let notifier = Arc::new(InMemoryBillingNotifier::new());

    let state = BillingAppState {
        church_directory: churches.clone(),
        plan_catalog: plans.clone(),
        subscription_ledger: subscriptions.clone(),
        session_ledger: sessions.clone(),
        event_store: events.clone(),
        billing_gateway: gateway.clone(),
        billing_notifier: notifier.clone(),
    };

    let verifier: AuthState = Arc::new(JwtVerifier::new(&SecretString::new(
        JWT_SECRET.to_string(),
    )));
    let router = payment_router()
        .with_state(state)
        .layer(middleware::from_fn_with_state(verifier, auth_middleware));

    TestApp {
        router,
        churches,
        plans,
        sessions,
        subscriptions,
        events,
        gateway,
        notifier,
    }
}

fn church(currency: Currency) -> Church {
    Church {
        id: ChurchId::new(),
        name: "Igreja Batista Central".to_string(),
        billing_email: "financeiro@ibcentral.org.br".to_string(),
        currency,
    }
}

fn plan() -> Plan {
    Plan {
        id: PlanId::new(),
        tier: PlanTier::Pro,
        name: "Pro".to_string(),
        member_limit: Some(500),
        trial_days: 14,
        price_usd_cents: 4900,
        price_eur_cents: 4500,
        price_brl_cents: 14900,
    }
}

fn pending_session(church_id: ChurchId, plan_id: PlanId, cs: &str) -> PaymentSession {
    PaymentSession::initiate(PaymentSessionId::new(), church_id, plan_id, cs.to_string())
}

fn active_subscription(church_id: ChurchId, plan_id: PlanId, sub: &str) -> ChurchSubscription {
    ChurchSubscription::activate_from_checkout(
        SubscriptionId::new(),
        church_id,
        plan_id,
        "cus_int_1".to_string(),
        Some(sub.to_string()),
        Some(Timestamp::from_unix_secs(1704067200)),
        Some(Timestamp::from_unix_secs(1706745600)),
        14900,
        Currency::Brl,
    )
}

/// Serializes a provider event envelope to the raw bytes that get signed.
fn envelope(id: &str, event_type: &str, object: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": id,
        "type": event_type,
        "created": chrono::Utc::now().timestamp(),
        "livemode": false,
        "data": { "object": object },
    }))
    .unwrap()
}

fn create_test_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(signed_payload.as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

fn sign(payload: &[u8]) -> String {
    create_test_signature(WEBHOOK_SECRET, chrono::Utc::now().timestamp(), payload)
}

async fn deliver(app: &TestApp, payload: Vec<u8>, signature: Option<&str>) -> StatusCode {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/payment/webhook")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("stripe-signature", signature);
    }
    let request = builder.body(Body::from(payload)).unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    response.status()
}

// =============================================================================
// Integration Tests
// =============================================================================

/// Tests the full activation flow: a signed checkout completion creates the
/// subscription row, advances the gating session, and audits the delivery.
#[tokio::test]
async fn signed_checkout_completion_activates_subscription() {
    let app = test_app();
    let church = church(Currency::Brl);
    let church_id = church.id;
    app.churches.add_church(church);
    let plan = plan();
    let plan_id = plan.id;
    let brl_price = plan.price_brl_cents;
    app.plans.add_plan(plan);
    app.sessions
        .insert(&pending_session(church_id, plan_id, "cs_int_1"))
        .await
        .unwrap();
    app.gateway.add_snapshot(json!({
        "id": "sub_int_1",
        "customer": "cus_int_9",
        "status": "active",
        "current_period_start": 1704067200,
        "current_period_end": 1706745600,
    }));

    let payload = envelope(
        "evt_int_1",
        "checkout.session.completed",
        json!({
            "id": "cs_int_1",
            "customer": "cus_int_9",
            "subscription": "sub_int_1",
            "metadata": {
                "church_id": church_id.to_string(),
                "plan_id": plan_id.to_string(),
            },
        }),
    );
    let signature = sign(&payload);

    let status = deliver(&app, payload, Some(&signature)).await;

    assert_eq!(status, StatusCode::OK);

    // Audit row landed and was marked reconciled
    let audited = app.events.rows();
    assert_eq!(audited.len(), 1);
    assert_eq!(audited[0].provider_event_id, "evt_int_1");
    assert_eq!(audited[0].church_id, Some(church_id));
    assert!(audited[0].processed);

    // Session advanced and the subscription was priced in church currency
    assert_eq!(app.sessions.rows()[0].status, SessionStatus::Created);
    let rows = app.subscriptions.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, SubscriptionStatus::Active);
    assert_eq!(rows[0].provider_subscription_id.as_deref(), Some("sub_int_1"));
    assert_eq!(rows[0].provider_customer_id, "cus_int_9");
    assert_eq!(rows[0].amount_cents, brl_price);
    assert_eq!(rows[0].currency, Currency::Brl);
    assert!(rows[0].current_period_end.is_some());
}

/// Tests that a body modified after signing fails verification: the
/// response is still 200 but nothing is audited or written.
#[tokio::test]
async fn tampered_payload_is_dropped_without_audit() {
    let app = test_app();
    let church_id = ChurchId::new();
    let plan_id = PlanId::new();
    app.sessions
        .insert(&pending_session(church_id, plan_id, "cs_int_2"))
        .await
        .unwrap();

    let payload = envelope(
        "evt_int_2",
        "checkout.session.completed",
        json!({ "id": "cs_int_2" }),
    );
    let signature = sign(&payload);
    let mut tampered = payload.clone();
    tampered.extend_from_slice(b" ");

    let status = deliver(&app, tampered, Some(&signature)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(app.events.rows().is_empty());
    assert_eq!(app.sessions.rows()[0].status, SessionStatus::Pending);
}

/// Tests the replay window: a correctly signed delivery older than the
/// acceptance window is rejected.
#[tokio::test]
async fn stale_delivery_is_dropped() {
    let app = test_app();
    let payload = envelope("evt_int_3", "invoice.paid", json!({ "id": "in_int_3" }));
    let stale = chrono::Utc::now().timestamp() - 600;
    let signature = create_test_signature(WEBHOOK_SECRET, stale, &payload);

    let status = deliver(&app, payload, Some(&signature)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(app.events.rows().is_empty());
}

/// Tests that a delivery without a signature header is acknowledged and
/// dropped before any processing happens.
#[tokio::test]
async fn missing_signature_header_is_acknowledged() {
    let app = test_app();
    let payload = envelope("evt_int_4", "invoice.paid", json!({ "id": "in_int_4" }));

    let status = deliver(&app, payload, None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(app.events.rows().is_empty());
}

/// Tests dunning entry: a signed payment failure marks the subscription
/// past due and sends exactly one notice to the church.
#[tokio::test]
async fn payment_failure_marks_past_due_and_notifies() {
    let app = test_app();
    let church_id = ChurchId::new();
    let plan_id = PlanId::new();
    app.subscriptions
        .insert(&active_subscription(church_id, plan_id, "sub_int_5"))
        .await
        .unwrap();

    let payload = envelope(
        "evt_int_5",
        "invoice.payment_failed",
        json!({ "id": "in_int_5", "subscription": "sub_int_5" }),
    );
    let signature = sign(&payload);

    let status = deliver(&app, payload, Some(&signature)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.subscriptions.rows()[0].status, SubscriptionStatus::PastDue);
    assert_eq!(app.notifier.payment_failed_notices(), vec![church_id]);
    assert!(app.events.rows()[0].processed);
}

/// Tests recovery: a paid invoice for a past_due subscription reactivates
/// it through the same delivery path.
#[tokio::test]
async fn invoice_paid_reactivates_past_due_subscription() {
    let app = test_app();
    let church_id = ChurchId::new();
    let plan_id = PlanId::new();
    let mut row = active_subscription(church_id, plan_id, "sub_int_6");
    row.mark_past_due().unwrap();
    app.subscriptions.insert(&row).await.unwrap();

    let payload = envelope(
        "evt_int_6",
        "invoice.paid",
        json!({ "id": "in_int_6", "subscription": "sub_int_6" }),
    );
    let signature = sign(&payload);

    let status = deliver(&app, payload, Some(&signature)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.subscriptions.rows()[0].status, SubscriptionStatus::Active);
}

/// Tests that an event matching nothing locally is still audited, marked
/// reconciled, and acknowledged.
#[tokio::test]
async fn uncorrelated_event_is_audited_and_acknowledged() {
    let app = test_app();
    let payload = envelope(
        "evt_int_7",
        "customer.subscription.updated",
        json!({ "id": "sub_foreign", "status": "active" }),
    );
    let signature = sign(&payload);

    let status = deliver(&app, payload, Some(&signature)).await;

    assert_eq!(status, StatusCode::OK);
    let audited = app.events.rows();
    assert_eq!(audited.len(), 1);
    assert_eq!(audited[0].church_id, None);
    assert!(audited[0].processed);
    assert!(app.subscriptions.rows().is_empty());
}

/// Tests abandonment: checkout expiry closes the pending session without
/// touching the subscription ledger.
#[tokio::test]
async fn expired_checkout_closes_pending_session() {
    let app = test_app();
    let church_id = ChurchId::new();
    let plan_id = PlanId::new();
    app.sessions
        .insert(&pending_session(church_id, plan_id, "cs_int_8"))
        .await
        .unwrap();

    let payload = envelope(
        "evt_int_8",
        "checkout.session.expired",
        json!({ "id": "cs_int_8" }),
    );
    let signature = sign(&payload);

    let status = deliver(&app, payload, Some(&signature)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.sessions.rows()[0].status, SessionStatus::Expired);
    assert!(app.subscriptions.rows().is_empty());
}

/// Tests at-least-once delivery: replaying a completed checkout audits the
/// second delivery but leaves both ledgers unchanged.
#[tokio::test]
async fn replayed_completion_is_audited_but_inert() {
    let app = test_app();
    let church = church(Currency::Usd);
    let church_id = church.id;
    app.churches.add_church(church);
    let plan = plan();
    let plan_id = plan.id;
    app.plans.add_plan(plan);
    app.sessions
        .insert(&pending_session(church_id, plan_id, "cs_int_9"))
        .await
        .unwrap();

    let payload = envelope(
        "evt_int_9",
        "checkout.session.completed",
        json!({ "id": "cs_int_9", "customer": "cus_int_9" }),
    );

    let first = deliver(&app, payload.clone(), Some(&sign(&payload))).await;
    let second = deliver(&app, payload.clone(), Some(&sign(&payload))).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(app.events.rows().len(), 2);
    assert_eq!(app.subscriptions.rows().len(), 1);
    assert_eq!(app.sessions.rows()[0].status, SessionStatus::Created);
}

/// Tests that an action-required invoice forwards the hosted payment URL
/// without mutating any ledger row.
#[tokio::test]
async fn action_required_forwards_hosted_url() {
    let app = test_app();
    let church_id = ChurchId::new();
    let plan_id = PlanId::new();
    app.subscriptions
        .insert(&active_subscription(church_id, plan_id, "sub_int_10"))
        .await
        .unwrap();

    let payload = envelope(
        "evt_int_10",
        "invoice.payment_action_required",
        json!({
            "id": "in_int_10",
            "subscription": "sub_int_10",
            "hosted_invoice_url": "https://invoice.stripe.com/i/int10",
        }),
    );
    let signature = sign(&payload);

    let status = deliver(&app, payload, Some(&signature)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.notifier.action_required_notices(),
        vec![(church_id, "https://invoice.stripe.com/i/int10".to_string())]
    );
    assert_eq!(app.subscriptions.rows()[0].status, SubscriptionStatus::Active);
}
