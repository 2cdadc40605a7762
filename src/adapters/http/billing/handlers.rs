//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command handlers.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::http::middleware::RequireChurch;
use crate::application::handlers::billing::{
    CreateCheckoutSessionCommand, CreateCheckoutSessionHandler, ReconcileWebhookCommand,
    ReconcileWebhookHandler,
};
use crate::domain::foundation::{DomainError, ErrorCode, PlanId};
use crate::ports::{
    BillingGateway, BillingNotifier, ChurchDirectory, EventStore, PlanCatalog, SessionLedger,
    SubscriptionLedger,
};

use super::dto::{CreateSessionRequest, CreateSessionResponse, ErrorResponse};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// This struct is cloned for each request and contains Arc-wrapped dependencies
/// for efficient sharing across handlers.
#[derive(Clone)]
pub struct BillingAppState {
    pub church_directory: Arc<dyn ChurchDirectory>,
    pub plan_catalog: Arc<dyn PlanCatalog>,
    pub subscription_ledger: Arc<dyn SubscriptionLedger>,
    pub session_ledger: Arc<dyn SessionLedger>,
    pub event_store: Arc<dyn EventStore>,
    pub billing_gateway: Arc<dyn BillingGateway>,
    pub billing_notifier: Arc<dyn BillingNotifier>,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn create_session_handler(&self) -> CreateCheckoutSessionHandler {
        CreateCheckoutSessionHandler::new(
            self.church_directory.clone(),
            self.plan_catalog.clone(),
            self.subscription_ledger.clone(),
            self.session_ledger.clone(),
            self.billing_gateway.clone(),
        )
    }

    pub fn webhook_handler(&self) -> ReconcileWebhookHandler {
        ReconcileWebhookHandler::new(
            self.billing_gateway.clone(),
            self.event_store.clone(),
            self.session_ledger.clone(),
            self.subscription_ledger.clone(),
            self.church_directory.clone(),
            self.plan_catalog.clone(),
            self.billing_notifier.clone(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /payment/create-session - Start subscription checkout for a plan
pub async fn create_session(
    State(state): State<BillingAppState>,
    RequireChurch(church): RequireChurch,
    Json(request): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let plan_id = request.plan_id.parse::<PlanId>().map_err(|_| {
        DomainError::validation("planId", "Plan id must be a UUID")
            .with_detail("planId", request.plan_id.clone())
    })?;

    let handler = state.create_session_handler();
    let cmd = CreateCheckoutSessionCommand {
        church_id: church.church_id,
        plan_id,
    };

    let result = handler.handle(cmd).await?;

    let response = CreateSessionResponse::from(result);
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /payment/webhook - Receive payment provider webhook deliveries
///
/// Always acknowledges with 200 so the provider does not retry against a
/// full queue. Rejected signatures are dropped silently; processing
/// failures are logged and the audit row stays unprocessed for replay.
pub async fn handle_provider_webhook(
    State(state): State<BillingAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> StatusCode {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok());

    let Some(signature) = signature else {
        tracing::warn!("Webhook delivery without stripe-signature header dropped");
        return StatusCode::OK;
    };

    let handler = state.webhook_handler();
    let cmd = ReconcileWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    match handler.handle(cmd).await {
        Ok(outcome) => {
            tracing::debug!(?outcome, "Webhook delivery reconciled");
        }
        Err(err) => {
            tracing::error!(error = %err, "Webhook reconciliation failed; event kept for replay");
        }
    }

    StatusCode::OK
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(DomainError);

impl From<DomainError> for BillingApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let DomainError {
            code,
            message,
            details,
        } = self.0;

        let status = match code {
            ErrorCode::PlanNotFound
            | ErrorCode::ChurchNotFound
            | ErrorCode::SessionNotFound
            | ErrorCode::SubscriptionNotFound
            | ErrorCode::EventNotFound => StatusCode::NOT_FOUND,
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => StatusCode::BAD_REQUEST,
            ErrorCode::InvalidStateTransition => StatusCode::CONFLICT,
            ErrorCode::Unauthorized | ErrorCode::InvalidSignature => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::ProviderError => StatusCode::BAD_GATEWAY,
            ErrorCode::DatabaseError | ErrorCode::NotificationError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = if details.is_empty() {
            ErrorResponse::new(code.to_string(), message)
        } else {
            let details = serde_json::to_value(&details).unwrap_or_default();
            ErrorResponse::with_details(code.to_string(), message, details)
        };
        (status, Json(body)).into_response()
    }
}
