//! CreateCheckoutSessionHandler - Command handler for initiating subscription checkout.

use std::sync::Arc;

use crate::domain::billing::PaymentSession;
use crate::domain::foundation::{ChurchId, DomainError, ErrorCode, PaymentSessionId, PlanId};
use crate::ports::{
    BillingGateway, ChurchDirectory, CreateCheckoutRequest, PlanCatalog, SessionLedger,
    SubscriptionLedger,
};

/// Command to start a checkout for a church and plan.
#[derive(Debug, Clone)]
pub struct CreateCheckoutSessionCommand {
    pub church_id: ChurchId,
    pub plan_id: PlanId,
}

/// Result of successful checkout initiation.
#[derive(Debug, Clone)]
pub struct CreateCheckoutSessionResult {
    pub session: PaymentSession,
    /// Client secret consumed by the embedded checkout UI.
    pub client_secret: String,
}

/// Handler for initiating subscription checkout.
///
/// Creates the provider checkout object with correlation metadata embedded
/// at both nesting levels, then persists a pending PaymentSession to be
/// advanced by the webhook reconciliation engine. Church and plan are
/// validated before any state is written.
pub struct CreateCheckoutSessionHandler {
    churches: Arc<dyn ChurchDirectory>,
    plans: Arc<dyn PlanCatalog>,
    subscriptions: Arc<dyn SubscriptionLedger>,
    sessions: Arc<dyn SessionLedger>,
    gateway: Arc<dyn BillingGateway>,
}

impl CreateCheckoutSessionHandler {
    pub fn new(
        churches: Arc<dyn ChurchDirectory>,
        plans: Arc<dyn PlanCatalog>,
        subscriptions: Arc<dyn SubscriptionLedger>,
        sessions: Arc<dyn SessionLedger>,
        gateway: Arc<dyn BillingGateway>,
    ) -> Self {
        Self {
            churches,
            plans,
            subscriptions,
            sessions,
            gateway,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateCheckoutSessionCommand,
    ) -> Result<CreateCheckoutSessionResult, DomainError> {
        // 1. Validate the church exists
        let church = self
            .churches
            .find_by_id(cmd.church_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(ErrorCode::ChurchNotFound, "Church not found")
                    .with_detail("church_id", cmd.church_id.to_string())
            })?;

        // 2. Validate the plan exists
        let plan = self.plans.find_by_id(cmd.plan_id).await?.ok_or_else(|| {
            DomainError::new(ErrorCode::PlanNotFound, "Plan not found")
                .with_detail("plan_id", cmd.plan_id.to_string())
        })?;

        // 3. Localize the price to the church's preferred currency
        let amount_cents = plan.amount_in(church.currency);

        // 4. Reuse the provider customer from the latest active
        //    subscription, if any, to avoid duplicate customer records
        let customer_id = self
            .subscriptions
            .find_active_by_church(cmd.church_id)
            .await?
            .map(|row| row.provider_customer_id);

        // 5. Create the external checkout object
        let handle = self
            .gateway
            .create_checkout_session(CreateCheckoutRequest {
                church_id: cmd.church_id,
                plan_id: cmd.plan_id,
                plan_name: plan.name.clone(),
                amount_cents,
                currency: church.currency,
                trial_days: plan.trial_days,
                customer_id,
                billing_email: church.billing_email.clone(),
            })
            .await?;

        // 6. Persist the pending session row
        let session = PaymentSession::initiate(
            PaymentSessionId::new(),
            cmd.church_id,
            cmd.plan_id,
            handle.session_id.clone(),
        );
        self.sessions.insert(&session).await?;

        Ok(CreateCheckoutSessionResult {
            session,
            client_secret: handle.client_secret,
        })
    }
}
