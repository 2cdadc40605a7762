//! PostgreSQL implementation of SubscriptionLedger.
//!
//! Provides persistent storage for ChurchSubscription rows using PostgreSQL.
//! Subscription history is append-heavy: superseded rows stay in place and
//! every "current row" lookup orders by creation time descending.

use crate::domain::billing::{ChurchSubscription, Currency, PaymentSession, SubscriptionStatus};
use crate::domain::foundation::{
    ChurchId, DomainError, ErrorCode, PlanId, SubscriptionId, Timestamp,
};
use crate::ports::SubscriptionLedger;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::session_ledger::session_status_to_string;

/// PostgreSQL implementation of the SubscriptionLedger port.
///
/// Uses sqlx for type-safe database operations with connection pooling.
pub struct PostgresSubscriptionLedger {
    pool: PgPool,
}

impl PostgresSubscriptionLedger {
    /// Creates a new PostgresSubscriptionLedger with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a church subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    church_id: Uuid,
    plan_id: Uuid,
    provider_customer_id: String,
    provider_subscription_id: Option<String>,
    status: String,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    cancel_at: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
    amount_cents: i64,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[allow(dead_code)]
    version: i32,
}

impl TryFrom<SubscriptionRow> for ChurchSubscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status = parse_subscription_status(&row.status)?;
        let currency = parse_currency(&row.currency)?;

        Ok(ChurchSubscription {
            id: SubscriptionId::from_uuid(row.id),
            church_id: ChurchId::from_uuid(row.church_id),
            plan_id: PlanId::from_uuid(row.plan_id),
            provider_customer_id: row.provider_customer_id,
            provider_subscription_id: row.provider_subscription_id,
            status,
            current_period_start: row.current_period_start.map(Timestamp::from_datetime),
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            cancel_at: row.cancel_at.map(Timestamp::from_datetime),
            canceled_at: row.canceled_at.map(Timestamp::from_datetime),
            amount_cents: row.amount_cents,
            currency,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_subscription_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    match s.to_lowercase().as_str() {
        "pending" => Ok(SubscriptionStatus::Pending),
        "active" => Ok(SubscriptionStatus::Active),
        "past_due" => Ok(SubscriptionStatus::PastDue),
        "canceled" => Ok(SubscriptionStatus::Canceled),
        "expired" => Ok(SubscriptionStatus::Expired),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid subscription status value: {}", s),
        )),
    }
}

fn subscription_status_to_string(status: &SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::Pending => "pending",
        SubscriptionStatus::Active => "active",
        SubscriptionStatus::PastDue => "past_due",
        SubscriptionStatus::Canceled => "canceled",
        SubscriptionStatus::Expired => "expired",
    }
}

pub(crate) fn parse_currency(s: &str) -> Result<Currency, DomainError> {
    Currency::from_code(&s.to_lowercase()).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid currency value: {}", s),
        )
    })
}

#[async_trait]
impl SubscriptionLedger for PostgresSubscriptionLedger {
    async fn insert(&self, subscription: &ChurchSubscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO church_subscriptions (
                id, church_id, plan_id, provider_customer_id, provider_subscription_id,
                status, current_period_start, current_period_end, cancel_at, canceled_at,
                amount_cents, currency, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.church_id.as_uuid())
        .bind(subscription.plan_id.as_uuid())
        .bind(&subscription.provider_customer_id)
        .bind(&subscription.provider_subscription_id)
        .bind(subscription_status_to_string(&subscription.status))
        .bind(subscription.current_period_start.as_ref().map(Timestamp::as_datetime))
        .bind(subscription.current_period_end.as_ref().map(Timestamp::as_datetime))
        .bind(subscription.cancel_at.as_ref().map(Timestamp::as_datetime))
        .bind(subscription.canceled_at.as_ref().map(Timestamp::as_datetime))
        .bind(subscription.amount_cents)
        .bind(subscription.currency.code())
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to insert subscription: {}", e),
            )
        })?;

        Ok(())
    }

    async fn insert_with_session(
        &self,
        subscription: &ChurchSubscription,
        session: &PaymentSession,
    ) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to begin transaction: {}", e),
            )
        })?;

        sqlx::query(
            r#"
            INSERT INTO church_subscriptions (
                id, church_id, plan_id, provider_customer_id, provider_subscription_id,
                status, current_period_start, current_period_end, cancel_at, canceled_at,
                amount_cents, currency, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.church_id.as_uuid())
        .bind(subscription.plan_id.as_uuid())
        .bind(&subscription.provider_customer_id)
        .bind(&subscription.provider_subscription_id)
        .bind(subscription_status_to_string(&subscription.status))
        .bind(subscription.current_period_start.as_ref().map(Timestamp::as_datetime))
        .bind(subscription.current_period_end.as_ref().map(Timestamp::as_datetime))
        .bind(subscription.cancel_at.as_ref().map(Timestamp::as_datetime))
        .bind(subscription.canceled_at.as_ref().map(Timestamp::as_datetime))
        .bind(subscription.amount_cents)
        .bind(subscription.currency.code())
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to insert subscription: {}", e),
            )
        })?;

        let result = sqlx::query(
            r#"
            UPDATE payment_sessions SET
                status = $2,
                updated_at = $3,
                version = version + 1
            WHERE id = $1
            "#,
        )
        .bind(session.id.as_uuid())
        .bind(session_status_to_string(&session.status))
        .bind(session.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update payment session: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            // Dropping the transaction rolls back the subscription insert
            return Err(DomainError::new(
                ErrorCode::SessionNotFound,
                "Payment session not found",
            ));
        }

        tx.commit().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to commit transaction: {}", e),
            )
        })?;

        Ok(())
    }

    async fn update(&self, subscription: &ChurchSubscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE church_subscriptions SET
                provider_customer_id = $2,
                provider_subscription_id = $3,
                status = $4,
                current_period_start = $5,
                current_period_end = $6,
                cancel_at = $7,
                canceled_at = $8,
                updated_at = $9,
                version = version + 1
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(&subscription.provider_customer_id)
        .bind(&subscription.provider_subscription_id)
        .bind(subscription_status_to_string(&subscription.status))
        .bind(subscription.current_period_start.as_ref().map(Timestamp::as_datetime))
        .bind(subscription.current_period_end.as_ref().map(Timestamp::as_datetime))
        .bind(subscription.cancel_at.as_ref().map(Timestamp::as_datetime))
        .bind(subscription.canceled_at.as_ref().map(Timestamp::as_datetime))
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update subscription: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                "Subscription not found",
            ));
        }

        Ok(())
    }

    async fn find_by_provider_subscription_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<ChurchSubscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, church_id, plan_id, provider_customer_id, provider_subscription_id,
                   status, current_period_start, current_period_end, cancel_at, canceled_at,
                   amount_cents, currency, created_at, updated_at, version
            FROM church_subscriptions
            WHERE provider_subscription_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(provider_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find subscription: {}", e),
            )
        })?;

        row.map(ChurchSubscription::try_from).transpose()
    }

    async fn find_by_church_plan_status(
        &self,
        church_id: ChurchId,
        plan_id: PlanId,
        status: SubscriptionStatus,
    ) -> Result<Option<ChurchSubscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, church_id, plan_id, provider_customer_id, provider_subscription_id,
                   status, current_period_start, current_period_end, cancel_at, canceled_at,
                   amount_cents, currency, created_at, updated_at, version
            FROM church_subscriptions
            WHERE church_id = $1 AND plan_id = $2 AND status = $3
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(church_id.as_uuid())
        .bind(plan_id.as_uuid())
        .bind(subscription_status_to_string(&status))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find subscription: {}", e),
            )
        })?;

        row.map(ChurchSubscription::try_from).transpose()
    }

    async fn find_by_church_and_plan(
        &self,
        church_id: ChurchId,
        plan_id: PlanId,
    ) -> Result<Option<ChurchSubscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, church_id, plan_id, provider_customer_id, provider_subscription_id,
                   status, current_period_start, current_period_end, cancel_at, canceled_at,
                   amount_cents, currency, created_at, updated_at, version
            FROM church_subscriptions
            WHERE church_id = $1 AND plan_id = $2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(church_id.as_uuid())
        .bind(plan_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find subscription: {}", e),
            )
        })?;

        row.map(ChurchSubscription::try_from).transpose()
    }

    async fn find_active_by_church(
        &self,
        church_id: ChurchId,
    ) -> Result<Option<ChurchSubscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, church_id, plan_id, provider_customer_id, provider_subscription_id,
                   status, current_period_start, current_period_end, cancel_at, canceled_at,
                   amount_cents, currency, created_at, updated_at, version
            FROM church_subscriptions
            WHERE church_id = $1 AND status = $2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(church_id.as_uuid())
        .bind(subscription_status_to_string(&SubscriptionStatus::Active))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find subscription: {}", e),
            )
        })?;

        row.map(ChurchSubscription::try_from).transpose()
    }
}
