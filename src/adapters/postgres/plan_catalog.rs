//! PostgreSQL implementation of PlanCatalog.
//!
//! Read-only lookup of subscription plans. Plan rows are managed by the
//! platform's admin tooling; this adapter never writes.

use crate::domain::billing::{Plan, PlanTier};
use crate::domain::foundation::{DomainError, ErrorCode, PlanId};
use crate::ports::PlanCatalog;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the PlanCatalog port.
pub struct PostgresPlanCatalog {
    pool: PgPool,
}

impl PostgresPlanCatalog {
    /// Creates a new PostgresPlanCatalog with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a plan.
#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    id: Uuid,
    tier: String,
    name: String,
    member_limit: Option<i32>,
    trial_days: i32,
    price_usd_cents: i64,
    price_eur_cents: i64,
    price_brl_cents: i64,
}

impl TryFrom<PlanRow> for Plan {
    type Error = DomainError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        let tier = parse_plan_tier(&row.tier)?;

        let member_limit = row
            .member_limit
            .map(|n| {
                u32::try_from(n).map_err(|_| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Invalid member limit: {}", n),
                    )
                })
            })
            .transpose()?;

        let trial_days = u32::try_from(row.trial_days).map_err(|_| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid trial days: {}", row.trial_days),
            )
        })?;

        Ok(Plan {
            id: PlanId::from_uuid(row.id),
            tier,
            name: row.name,
            member_limit,
            trial_days,
            price_usd_cents: row.price_usd_cents,
            price_eur_cents: row.price_eur_cents,
            price_brl_cents: row.price_brl_cents,
        })
    }
}

fn parse_plan_tier(s: &str) -> Result<PlanTier, DomainError> {
    match s.to_lowercase().as_str() {
        "basic" => Ok(PlanTier::Basic),
        "pro" => Ok(PlanTier::Pro),
        "enterprise" => Ok(PlanTier::Enterprise),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid plan tier value: {}", s),
        )),
    }
}

#[async_trait]
impl PlanCatalog for PostgresPlanCatalog {
    async fn find_by_id(&self, id: PlanId) -> Result<Option<Plan>, DomainError> {
        let row: Option<PlanRow> = sqlx::query_as(
            r#"
            SELECT id, tier, name, member_limit, trial_days,
                   price_usd_cents, price_eur_cents, price_brl_cents
            FROM plans
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find plan: {}", e),
            )
        })?;

        row.map(Plan::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plan_tier_works_for_all_values() {
        assert_eq!(parse_plan_tier("basic").unwrap(), PlanTier::Basic);
        assert_eq!(parse_plan_tier("pro").unwrap(), PlanTier::Pro);
        assert_eq!(parse_plan_tier("enterprise").unwrap(), PlanTier::Enterprise);
        assert_eq!(parse_plan_tier("Pro").unwrap(), PlanTier::Pro);
    }

    #[test]
    fn parse_plan_tier_rejects_invalid_values() {
        assert!(parse_plan_tier("platinum").is_err());
        assert!(parse_plan_tier("").is_err());
    }

    #[test]
    fn row_converts_to_plan() {
        let row = PlanRow {
            id: Uuid::new_v4(),
            tier: "pro".to_string(),
            name: "Pro".to_string(),
            member_limit: Some(500),
            trial_days: 14,
            price_usd_cents: 2900,
            price_eur_cents: 2700,
            price_brl_cents: 14900,
        };

        let plan = Plan::try_from(row).unwrap();
        assert_eq!(plan.tier, PlanTier::Pro);
        assert_eq!(plan.member_limit, Some(500));
        assert_eq!(plan.trial_days, 14);
        assert_eq!(plan.price_brl_cents, 14900);
    }

    #[test]
    fn row_with_unlimited_members_converts() {
        let row = PlanRow {
            id: Uuid::new_v4(),
            tier: "enterprise".to_string(),
            name: "Enterprise".to_string(),
            member_limit: None,
            trial_days: 30,
            price_usd_cents: 9900,
            price_eur_cents: 9500,
            price_brl_cents: 49900,
        };

        let plan = Plan::try_from(row).unwrap();
        assert!(plan.member_limit.is_none());
    }

    #[test]
    fn row_with_negative_trial_days_fails_conversion() {
        let row = PlanRow {
            id: Uuid::new_v4(),
            tier: "basic".to_string(),
            name: "Basic".to_string(),
            member_limit: Some(100),
            trial_days: -1,
            price_usd_cents: 900,
            price_eur_cents: 900,
            price_brl_cents: 4900,
        };

        assert!(Plan::try_from(row).is_err());
    }
}
