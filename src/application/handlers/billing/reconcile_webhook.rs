//! ReconcileWebhookHandler - Command handler for provider webhook reconciliation.
//!
//! Each inbound delivery is one independent unit of work: verify the
//! signature, resolve tenant correlation, append the audit row, then
//! apply the ledger effect for the event type. Handlers re-derive state
//! from the ledgers on every delivery instead of assuming causal ordering
//! between event types, which makes replays and out-of-order deliveries
//! benign no-ops.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::billing::{
    ChurchSubscription, CorrelationHints, CorrelationResolver, EventPayload, EventType,
    PaymentEvent, ProviderEvent, SessionStatus, SubscriptionStatus,
};
use crate::domain::foundation::{ChurchId, DomainError, SubscriptionId};
use crate::ports::{
    BillingGateway, BillingNotifier, ChurchDirectory, EventStore, GatewayError, PlanCatalog,
    SessionLedger, SubscriptionLedger,
};

/// Upper bound for one notification attempt. Slower deliveries are
/// abandoned so the webhook acknowledgment is never held up.
const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Command to reconcile one webhook delivery.
#[derive(Debug, Clone)]
pub struct ReconcileWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// Value of the provider signature header.
    pub signature: String,
}

/// Result of webhook reconciliation.
#[derive(Debug, Clone)]
pub enum ReconcileWebhookResult {
    /// Signature verification failed; delivery dropped without audit.
    SignatureRejected,
    /// Checkout completed; subscription row created, session advanced.
    SubscriptionActivated {
        church_id: ChurchId,
        provider_session_id: String,
    },
    /// Checkout abandoned; session expired.
    SessionExpired { provider_session_id: String },
    /// Provider-reported status and periods mirrored onto the ledger row.
    SubscriptionSynced { church_id: ChurchId },
    /// Subscription canceled upstream; cancellation time stamped.
    SubscriptionCanceled { church_id: ChurchId },
    /// Invoice paid; gating session promoted and subscription kept active.
    InvoiceSettled { church_id: ChurchId },
    /// Invoice payment failed; subscription past due, notice attempted.
    MarkedPastDue { church_id: ChurchId },
    /// Action-required notice forwarded with the hosted payment URL.
    ActionRequiredForwarded { church_id: ChurchId },
    /// Event acknowledged with no ledger effect.
    Acknowledged,
    /// Unknown event type.
    Ignored,
}

/// Handler reconciling provider webhook deliveries against the ledgers.
///
/// Infrastructure errors propagate to the caller and leave the audit row
/// unprocessed so the delivery can be replayed; business no-ops (missing
/// session, foreign tenant, duplicate delivery) resolve to
/// `Acknowledged`.
pub struct ReconcileWebhookHandler {
    gateway: Arc<dyn BillingGateway>,
    events: Arc<dyn EventStore>,
    sessions: Arc<dyn SessionLedger>,
    subscriptions: Arc<dyn SubscriptionLedger>,
    churches: Arc<dyn ChurchDirectory>,
    plans: Arc<dyn PlanCatalog>,
    notifier: Arc<dyn BillingNotifier>,
    resolver: CorrelationResolver,
}

impl ReconcileWebhookHandler {
    pub fn new(
        gateway: Arc<dyn BillingGateway>,
        events: Arc<dyn EventStore>,
        sessions: Arc<dyn SessionLedger>,
        subscriptions: Arc<dyn SubscriptionLedger>,
        churches: Arc<dyn ChurchDirectory>,
        plans: Arc<dyn PlanCatalog>,
        notifier: Arc<dyn BillingNotifier>,
    ) -> Self {
        let resolver = CorrelationResolver::new(subscriptions.clone());
        Self {
            gateway,
            events,
            sessions,
            subscriptions,
            churches,
            plans,
            notifier,
            resolver,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReconcileWebhookCommand,
    ) -> Result<ReconcileWebhookResult, DomainError> {
        // 1. Verify the signature against the raw bytes. Rejected
        //    deliveries are dropped without audit; there is nothing
        //    trustworthy to record.
        let event = match self.gateway.verify_and_decode(&cmd.payload, &cmd.signature) {
            Ok(event) => event,
            Err(err) => {
                warn!("webhook delivery rejected: {}", err);
                return Ok(ReconcileWebhookResult::SignatureRejected);
            }
        };

        // 2. Resolve tenant correlation; may legitimately come up empty
        let hints = self.resolver.resolve(&event).await;
        if hints.is_empty() && event.kind() != EventType::Unknown {
            warn!(
                "event {} ({}) could not be correlated to a tenant",
                event.id, event.event_type
            );
        }

        // 3. Append the audit row before attempting any ledger effect
        let audit = PaymentEvent::from_provider_event(&event, hints.church_id);
        self.events.append(&audit).await?;

        // 4. Apply the ledger effect for the event type
        let outcome = match event.kind() {
            EventType::CheckoutSessionCompleted => self.handle_checkout_completed(&event).await?,
            EventType::CheckoutSessionExpired => self.handle_checkout_expired(&event).await?,
            EventType::SubscriptionCreated => {
                // Row creation happens at checkout completion
                ReconcileWebhookResult::Acknowledged
            }
            EventType::SubscriptionUpdated => {
                self.handle_subscription_updated(&event, hints).await?
            }
            EventType::SubscriptionDeleted => {
                self.handle_subscription_deleted(&event, hints).await?
            }
            EventType::InvoiceCreated => ReconcileWebhookResult::Acknowledged,
            EventType::InvoicePaid => self.handle_invoice_paid(&event, hints).await?,
            EventType::InvoicePaymentFailed => {
                self.handle_invoice_payment_failed(&event, hints).await?
            }
            EventType::InvoicePaymentActionRequired => {
                self.handle_invoice_action_required(&event, hints).await?
            }
            EventType::Unknown => {
                debug!("ignoring unhandled event type {}", event.event_type);
                ReconcileWebhookResult::Ignored
            }
        };

        // 5. Mark the delivery reconciled
        self.events.mark_processed(audit.id).await?;

        Ok(outcome)
    }

    /// checkout.session.completed: create the subscription row and
    /// advance the gating session, in one transaction.
    async fn handle_checkout_completed(
        &self,
        event: &ProviderEvent,
    ) -> Result<ReconcileWebhookResult, DomainError> {
        let checkout = match &event.payload {
            EventPayload::CheckoutSession(checkout) => checkout,
            _ => {
                warn!("event {} carried no checkout session object", event.id);
                return Ok(ReconcileWebhookResult::Acknowledged);
            }
        };

        // Only a pending session reacts; anything else means a duplicate
        // or foreign delivery
        let mut session = match self
            .sessions
            .find_by_provider_session_and_status(&checkout.id, SessionStatus::Pending)
            .await?
        {
            Some(session) => session,
            None => {
                debug!("no pending session for checkout {}, skipping", checkout.id);
                return Ok(ReconcileWebhookResult::Acknowledged);
            }
        };

        let church = self.churches.find_by_id(session.church_id).await?;
        let plan = self.plans.find_by_id(session.plan_id).await?;
        let (church, plan) = match (church, plan) {
            (Some(church), Some(plan)) => (church, plan),
            _ => {
                warn!(
                    "church or plan vanished for checkout {}, skipping",
                    checkout.id
                );
                return Ok(ReconcileWebhookResult::Acknowledged);
            }
        };

        // Fetch the provider's view of the subscription for the period
        // bookkeeping. A missing upstream object is tolerated; transport
        // failures are not, so the delivery stays replayable.
        let snapshot = match checkout.subscription.as_deref() {
            Some(subscription_id) => {
                match self.gateway.retrieve_subscription(subscription_id).await {
                    Ok(snapshot) => Some(snapshot),
                    Err(GatewayError::NotFound(_)) => None,
                    Err(err) => return Err(err.into()),
                }
            }
            None => None,
        };

        let customer_id = checkout
            .customer
            .clone()
            .or_else(|| snapshot.as_ref().and_then(|s| s.customer.clone()));
        let customer_id = match customer_id {
            Some(customer_id) => customer_id,
            None => {
                warn!("checkout {} carried no customer handle, skipping", checkout.id);
                return Ok(ReconcileWebhookResult::Acknowledged);
            }
        };

        let subscription = ChurchSubscription::activate_from_checkout(
            SubscriptionId::new(),
            session.church_id,
            session.plan_id,
            customer_id,
            checkout.subscription.clone(),
            snapshot.as_ref().and_then(|s| s.period_start()),
            snapshot.as_ref().and_then(|s| s.period_end()),
            plan.amount_in(church.currency),
            church.currency,
        );

        session.mark_created()?;
        self.subscriptions
            .insert_with_session(&subscription, &session)
            .await?;

        Ok(ReconcileWebhookResult::SubscriptionActivated {
            church_id: session.church_id,
            provider_session_id: session.provider_session_id.clone(),
        })
    }

    /// checkout.session.expired: expire the pending session. No
    /// subscription side effect.
    async fn handle_checkout_expired(
        &self,
        event: &ProviderEvent,
    ) -> Result<ReconcileWebhookResult, DomainError> {
        let checkout = match &event.payload {
            EventPayload::CheckoutSession(checkout) => checkout,
            _ => {
                warn!("event {} carried no checkout session object", event.id);
                return Ok(ReconcileWebhookResult::Acknowledged);
            }
        };

        let mut session = match self
            .sessions
            .find_by_provider_session_and_status(&checkout.id, SessionStatus::Pending)
            .await?
        {
            Some(session) => session,
            None => {
                debug!("no pending session for checkout {}, skipping", checkout.id);
                return Ok(ReconcileWebhookResult::Acknowledged);
            }
        };

        session.expire()?;
        self.sessions.update(&session).await?;

        Ok(ReconcileWebhookResult::SessionExpired {
            provider_session_id: session.provider_session_id.clone(),
        })
    }

    /// customer.subscription.updated: mirror provider status and period
    /// bookkeeping onto the ledger row.
    async fn handle_subscription_updated(
        &self,
        event: &ProviderEvent,
        hints: CorrelationHints,
    ) -> Result<ReconcileWebhookResult, DomainError> {
        let object = match &event.payload {
            EventPayload::Subscription(object) => object,
            _ => {
                warn!("event {} carried no subscription object", event.id);
                return Ok(ReconcileWebhookResult::Acknowledged);
            }
        };

        let mut subscription = match self.locate_for_update(&object.id, hints).await? {
            Some(row) => row,
            None => {
                debug!("no ledger row for subscription {}, skipping", object.id);
                return Ok(ReconcileWebhookResult::Acknowledged);
            }
        };

        subscription.attach_provider_subscription(&object.id);

        // Unrecognized provider status strings leave the local status
        // untouched, as do absent or invalid timestamps
        let status = object
            .status
            .as_deref()
            .and_then(SubscriptionStatus::from_provider);
        subscription.sync_from_provider(
            status,
            object.period_start(),
            object.period_end(),
            object.cancel_at(),
            object.canceled_at(),
        )?;
        self.subscriptions.update(&subscription).await?;

        Ok(ReconcileWebhookResult::SubscriptionSynced {
            church_id: subscription.church_id,
        })
    }

    /// customer.subscription.deleted: cancel the ledger row, preferring
    /// the provider's cancellation timestamp when it is valid.
    async fn handle_subscription_deleted(
        &self,
        event: &ProviderEvent,
        hints: CorrelationHints,
    ) -> Result<ReconcileWebhookResult, DomainError> {
        let object = match &event.payload {
            EventPayload::Subscription(object) => object,
            _ => {
                warn!("event {} carried no subscription object", event.id);
                return Ok(ReconcileWebhookResult::Acknowledged);
            }
        };

        let mut subscription = match self.locate_for_update(&object.id, hints).await? {
            Some(row) => row,
            None => {
                debug!("no ledger row for subscription {}, skipping", object.id);
                return Ok(ReconcileWebhookResult::Acknowledged);
            }
        };

        subscription.attach_provider_subscription(&object.id);
        subscription.sync_from_provider(
            Some(SubscriptionStatus::Canceled),
            object.period_start(),
            object.period_end(),
            object.cancel_at(),
            object.canceled_at(),
        )?;
        if subscription.canceled_at.is_none() {
            subscription.cancel()?;
        }
        self.subscriptions.update(&subscription).await?;

        Ok(ReconcileWebhookResult::SubscriptionCanceled {
            church_id: subscription.church_id,
        })
    }

    /// invoice.paid: promote a gating `created` session to `completed`
    /// and make sure the subscription is active.
    async fn handle_invoice_paid(
        &self,
        event: &ProviderEvent,
        hints: CorrelationHints,
    ) -> Result<ReconcileWebhookResult, DomainError> {
        let provider_subscription_id = event.payload.provider_subscription_id();
        let mut subscription = match self
            .locate_for_invoice(provider_subscription_id, hints)
            .await?
        {
            Some(row) => row,
            None => {
                debug!("no ledger row for invoice event {}, skipping", event.id);
                return Ok(ReconcileWebhookResult::Acknowledged);
            }
        };

        if let Some(subscription_id) = provider_subscription_id {
            subscription.attach_provider_subscription(subscription_id);
        }

        // First invoice after checkout: a session in `created` gates the
        // promotion to `completed`
        let gating_session = self
            .sessions
            .find_by_church_plan_status(
                subscription.church_id,
                subscription.plan_id,
                SessionStatus::Created,
            )
            .await?;
        if let Some(mut session) = gating_session {
            session.complete()?;
            self.sessions.update(&session).await?;
        }

        // Recovery path: a paid invoice reactivates past_due rows
        if !subscription.is_active() {
            subscription.reactivate()?;
        }
        self.subscriptions.update(&subscription).await?;

        Ok(ReconcileWebhookResult::InvoiceSettled {
            church_id: subscription.church_id,
        })
    }

    /// invoice.payment_failed: past_due plus a best-effort notice.
    async fn handle_invoice_payment_failed(
        &self,
        event: &ProviderEvent,
        hints: CorrelationHints,
    ) -> Result<ReconcileWebhookResult, DomainError> {
        let provider_subscription_id = event.payload.provider_subscription_id();
        let mut subscription = match self
            .locate_for_invoice(provider_subscription_id, hints)
            .await?
        {
            Some(row) => row,
            None => {
                debug!("no ledger row for invoice event {}, skipping", event.id);
                return Ok(ReconcileWebhookResult::Acknowledged);
            }
        };

        if let Some(subscription_id) = provider_subscription_id {
            subscription.attach_provider_subscription(subscription_id);
        }
        subscription.mark_past_due()?;
        self.subscriptions.update(&subscription).await?;

        // Ledger state is committed before the notice is attempted;
        // delivery failure must not undo or fail the reconciliation
        self.notify_best_effort(
            self.notifier.send_payment_failed(subscription.church_id),
            "payment failed notice",
        )
        .await;

        Ok(ReconcileWebhookResult::MarkedPastDue {
            church_id: subscription.church_id,
        })
    }

    /// invoice.payment_action_required: forward the hosted payment URL.
    /// No ledger mutation.
    async fn handle_invoice_action_required(
        &self,
        event: &ProviderEvent,
        hints: CorrelationHints,
    ) -> Result<ReconcileWebhookResult, DomainError> {
        let invoice = match &event.payload {
            EventPayload::Invoice(invoice) => invoice,
            _ => {
                warn!("event {} carried no invoice object", event.id);
                return Ok(ReconcileWebhookResult::Acknowledged);
            }
        };

        let subscription = match self
            .locate_for_invoice(event.payload.provider_subscription_id(), hints)
            .await?
        {
            Some(row) => row,
            None => {
                debug!("no ledger row for invoice event {}, skipping", event.id);
                return Ok(ReconcileWebhookResult::Acknowledged);
            }
        };

        let url = match invoice.hosted_invoice_url.as_deref() {
            Some(url) => url,
            None => {
                warn!("invoice {} has no hosted payment URL, skipping notice", invoice.id);
                return Ok(ReconcileWebhookResult::Acknowledged);
            }
        };

        self.notify_best_effort(
            self.notifier
                .send_payment_action_required(subscription.church_id, url),
            "action required notice",
        )
        .await;

        Ok(ReconcileWebhookResult::ActionRequiredForwarded {
            church_id: subscription.church_id,
        })
    }

    /// Locate strategy for subscription lifecycle events: provider
    /// subscription id first, then the resolved church and plan against
    /// the active row.
    async fn locate_for_update(
        &self,
        provider_subscription_id: &str,
        hints: CorrelationHints,
    ) -> Result<Option<ChurchSubscription>, DomainError> {
        if let Some(row) = self
            .subscriptions
            .find_by_provider_subscription_id(provider_subscription_id)
            .await?
        {
            return Ok(Some(row));
        }

        match (hints.church_id, hints.plan_id) {
            (Some(church_id), Some(plan_id)) => {
                self.subscriptions
                    .find_by_church_plan_status(church_id, plan_id, SubscriptionStatus::Active)
                    .await
            }
            _ => Ok(None),
        }
    }

    /// Locate strategy for invoice events: provider subscription id
    /// first, then church and plan regardless of status (a past_due row
    /// must be findable for recovery). Incomplete hints are topped up
    /// from a provider snapshot lookup; a failed lookup is a miss, not
    /// an error.
    async fn locate_for_invoice(
        &self,
        provider_subscription_id: Option<&str>,
        hints: CorrelationHints,
    ) -> Result<Option<ChurchSubscription>, DomainError> {
        if let Some(subscription_id) = provider_subscription_id {
            if let Some(row) = self
                .subscriptions
                .find_by_provider_subscription_id(subscription_id)
                .await?
            {
                return Ok(Some(row));
            }
        }

        let hints = match (hints.church_id, hints.plan_id, provider_subscription_id) {
            (Some(_), Some(_), _) | (_, _, None) => hints,
            (_, _, Some(subscription_id)) => {
                match self.gateway.retrieve_subscription(subscription_id).await {
                    Ok(snapshot) => CorrelationHints::from_metadata(&snapshot.metadata),
                    Err(err) => {
                        debug!(
                            "snapshot lookup for subscription {} failed: {}",
                            subscription_id, err
                        );
                        hints
                    }
                }
            }
        };

        match (hints.church_id, hints.plan_id) {
            (Some(church_id), Some(plan_id)) => {
                self.subscriptions
                    .find_by_church_and_plan(church_id, plan_id)
                    .await
            }
            _ => Ok(None),
        }
    }

    /// Run one notification attempt with a bounded timeout, swallowing
    /// and logging any failure.
    async fn notify_best_effort(
        &self,
        attempt: impl Future<Output = Result<(), DomainError>>,
        what: &str,
    ) {
        match tokio::time::timeout(NOTIFICATION_TIMEOUT, attempt).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!("{} delivery failed: {}", what, err),
            Err(_) => warn!("{} timed out after {:?}", what, NOTIFICATION_TIMEOUT),
        }
    }
}
