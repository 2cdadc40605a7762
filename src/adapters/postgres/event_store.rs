//! PostgreSQL implementation of EventStore.
//!
//! Provides the append-only payment event audit log. Rows are written
//! before reconciliation runs and only ever mutated to flip the
//! processed marker, so the log stays complete even when handling fails.

use crate::domain::billing::PaymentEvent;
use crate::domain::foundation::{ChurchId, DomainError, ErrorCode, PaymentEventId, Timestamp};
use crate::ports::EventStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the EventStore port.
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new PostgresEventStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment event.
#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    church_id: Option<Uuid>,
    provider_event_id: String,
    event_type: String,
    payload: serde_json::Value,
    provider_session_id: Option<String>,
    provider_subscription_id: Option<String>,
    provider_customer_id: Option<String>,
    processed: bool,
    processed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<EventRow> for PaymentEvent {
    fn from(row: EventRow) -> Self {
        PaymentEvent {
            id: PaymentEventId::from_uuid(row.id),
            church_id: row.church_id.map(ChurchId::from_uuid),
            provider_event_id: row.provider_event_id,
            event_type: row.event_type,
            payload: row.payload,
            provider_session_id: row.provider_session_id,
            provider_subscription_id: row.provider_subscription_id,
            provider_customer_id: row.provider_customer_id,
            processed: row.processed,
            processed_at: row.processed_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
        }
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn append(&self, event: &PaymentEvent) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payment_events (
                id, church_id, provider_event_id, event_type, payload,
                provider_session_id, provider_subscription_id, provider_customer_id,
                processed, processed_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.church_id.as_ref().map(ChurchId::as_uuid))
        .bind(&event.provider_event_id)
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(&event.provider_session_id)
        .bind(&event.provider_subscription_id)
        .bind(&event.provider_customer_id)
        .bind(event.processed)
        .bind(event.processed_at.as_ref().map(Timestamp::as_datetime))
        .bind(event.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to append payment event: {}", e),
            )
        })?;

        Ok(())
    }

    async fn mark_processed(&self, id: PaymentEventId) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_events SET
                processed = TRUE,
                processed_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to mark payment event processed: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::EventNotFound,
                "Payment event not found",
            ));
        }

        Ok(())
    }

    async fn find_unprocessed(&self, limit: u32) -> Result<Vec<PaymentEvent>, DomainError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT id, church_id, provider_event_id, event_type, payload,
                   provider_session_id, provider_subscription_id, provider_customer_id,
                   processed, processed_at, created_at
            FROM payment_events
            WHERE processed = FALSE
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to list unprocessed payment events: {}", e),
            )
        })?;

        Ok(rows.into_iter().map(PaymentEvent::from).collect())
    }
}
