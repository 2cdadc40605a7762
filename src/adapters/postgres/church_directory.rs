//! PostgreSQL implementation of ChurchDirectory.
//!
//! Read-only lookup of tenant churches. Church onboarding lives in the
//! platform's tenant service; billing only reads the fields it needs.

use crate::domain::billing::Church;
use crate::domain::foundation::{ChurchId, DomainError, ErrorCode};
use crate::ports::ChurchDirectory;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::subscription_ledger::parse_currency;

/// PostgreSQL implementation of the ChurchDirectory port.
pub struct PostgresChurchDirectory {
    pool: PgPool,
}

impl PostgresChurchDirectory {
    /// Creates a new PostgresChurchDirectory with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a church.
#[derive(Debug, sqlx::FromRow)]
struct ChurchRow {
    id: Uuid,
    name: String,
    billing_email: String,
    currency: String,
}

impl TryFrom<ChurchRow> for Church {
    type Error = DomainError;

    fn try_from(row: ChurchRow) -> Result<Self, Self::Error> {
        let currency = parse_currency(&row.currency)?;

        Ok(Church {
            id: ChurchId::from_uuid(row.id),
            name: row.name,
            billing_email: row.billing_email,
            currency,
        })
    }
}

#[async_trait]
impl ChurchDirectory for PostgresChurchDirectory {
    async fn find_by_id(&self, id: ChurchId) -> Result<Option<Church>, DomainError> {
        let row: Option<ChurchRow> = sqlx::query_as(
            r#"
            SELECT id, name, billing_email, currency
            FROM churches
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find church: {}", e),
            )
        })?;

        row.map(Church::try_from).transpose()
    }
}
