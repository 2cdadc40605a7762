//! PostgreSQL implementation of SessionLedger.
//!
//! Provides persistent storage for PaymentSession rows using PostgreSQL.

use crate::domain::billing::{PaymentSession, SessionStatus};
use crate::domain::foundation::{
    ChurchId, DomainError, ErrorCode, PaymentSessionId, PlanId, Timestamp,
};
use crate::ports::SessionLedger;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the SessionLedger port.
///
/// Uses sqlx for type-safe database operations with connection pooling.
/// Multi-row lookups order by `created_at DESC, id DESC` so "most recent"
/// is deterministic even when rows share a creation timestamp.
pub struct PostgresSessionLedger {
    pool: PgPool,
}

impl PostgresSessionLedger {
    /// Creates a new PostgresSessionLedger with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment session.
#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    church_id: Uuid,
    plan_id: Uuid,
    provider_session_id: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[allow(dead_code)]
    version: i32,
}

impl TryFrom<SessionRow> for PaymentSession {
    type Error = DomainError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let status = parse_session_status(&row.status)?;

        Ok(PaymentSession {
            id: PaymentSessionId::from_uuid(row.id),
            church_id: ChurchId::from_uuid(row.church_id),
            plan_id: PlanId::from_uuid(row.plan_id),
            provider_session_id: row.provider_session_id,
            status,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

pub(crate) fn parse_session_status(s: &str) -> Result<SessionStatus, DomainError> {
    match s.to_lowercase().as_str() {
        "pending" => Ok(SessionStatus::Pending),
        "created" => Ok(SessionStatus::Created),
        "completed" => Ok(SessionStatus::Completed),
        "expired" => Ok(SessionStatus::Expired),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid session status value: {}", s),
        )),
    }
}

pub(crate) fn session_status_to_string(status: &SessionStatus) -> &'static str {
    match status {
        SessionStatus::Pending => "pending",
        SessionStatus::Created => "created",
        SessionStatus::Completed => "completed",
        SessionStatus::Expired => "expired",
    }
}

#[async_trait]
impl SessionLedger for PostgresSessionLedger {
    async fn insert(&self, session: &PaymentSession) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payment_sessions (
                id, church_id, plan_id, provider_session_id, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(session.id.as_uuid())
        .bind(session.church_id.as_uuid())
        .bind(session.plan_id.as_uuid())
        .bind(&session.provider_session_id)
        .bind(session_status_to_string(&session.status))
        .bind(session.created_at.as_datetime())
        .bind(session.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("payment_sessions_provider_session_id_key") {
                    return DomainError::new(
                        ErrorCode::ValidationFailed,
                        "Provider session id already recorded",
                    )
                    .with_detail("provider_session_id", session.provider_session_id.clone());
                }
            }
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to insert payment session: {}", e),
            )
        })?;

        Ok(())
    }

    async fn update(&self, session: &PaymentSession) -> Result<(), DomainError> {
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
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update payment session: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SessionNotFound,
                "Payment session not found",
            ));
        }

        Ok(())
    }

    async fn find_by_provider_session_and_status(
        &self,
        provider_session_id: &str,
        status: SessionStatus,
    ) -> Result<Option<PaymentSession>, DomainError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, church_id, plan_id, provider_session_id, status,
                   created_at, updated_at, version
            FROM payment_sessions
            WHERE provider_session_id = $1 AND status = $2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(provider_session_id)
        .bind(session_status_to_string(&status))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find payment session: {}", e),
            )
        })?;

        row.map(PaymentSession::try_from).transpose()
    }

    async fn find_by_church_plan_status(
        &self,
        church_id: ChurchId,
        plan_id: PlanId,
        status: SessionStatus,
    ) -> Result<Option<PaymentSession>, DomainError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, church_id, plan_id, provider_session_id, status,
                   created_at, updated_at, version
            FROM payment_sessions
            WHERE church_id = $1 AND plan_id = $2 AND status = $3
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(church_id.as_uuid())
        .bind(plan_id.as_uuid())
        .bind(session_status_to_string(&status))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find payment session: {}", e),
            )
        })?;

        row.map(PaymentSession::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_session_status_works_for_all_values() {
        assert_eq!(
            parse_session_status("pending").unwrap(),
            SessionStatus::Pending
        );
        assert_eq!(
            parse_session_status("created").unwrap(),
            SessionStatus::Created
        );
        assert_eq!(
            parse_session_status("completed").unwrap(),
            SessionStatus::Completed
        );
        assert_eq!(
            parse_session_status("expired").unwrap(),
            SessionStatus::Expired
        );
        assert_eq!(
            parse_session_status("PENDING").unwrap(),
            SessionStatus::Pending
        );
    }

    #[test]
    fn parse_session_status_rejects_invalid_values() {
        assert!(parse_session_status("invalid").is_err());
        assert!(parse_session_status("").is_err());
    }

    #[test]
    fn session_status_to_string_is_consistent() {
        assert_eq!(session_status_to_string(&SessionStatus::Pending), "pending");
        assert_eq!(session_status_to_string(&SessionStatus::Created), "created");
        assert_eq!(
            session_status_to_string(&SessionStatus::Completed),
            "completed"
        );
        assert_eq!(session_status_to_string(&SessionStatus::Expired), "expired");
    }

    #[test]
    fn roundtrip_session_status_conversion() {
        for status in [
            SessionStatus::Pending,
            SessionStatus::Created,
            SessionStatus::Completed,
            SessionStatus::Expired,
        ] {
            let s = session_status_to_string(&status);
            let parsed = parse_session_status(s).unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn row_converts_to_session() {
        let row = SessionRow {
            id: Uuid::new_v4(),
            church_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            provider_session_id: "cs_live_a1b2c3".to_string(),
            status: "pending".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 1,
        };
        let id = row.id;

        let session = PaymentSession::try_from(row).unwrap();
        assert_eq!(*session.id.as_uuid(), id);
        assert_eq!(session.status, SessionStatus::Pending);
        assert_eq!(session.provider_session_id, "cs_live_a1b2c3");
    }

    #[test]
    fn row_with_unknown_status_fails_conversion() {
        let row = SessionRow {
            id: Uuid::new_v4(),
            church_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            provider_session_id: "cs_live_a1b2c3".to_string(),
            status: "limbo".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 1,
        };

        let result = PaymentSession::try_from(row);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code, ErrorCode::DatabaseError);
    }
}
