//! Subscription plan definitions.
//!
//! Plans carry per-currency pricing so checkout can charge a church in its
//! preferred currency without a conversion step at payment time.

use crate::domain::foundation::PlanId;
use serde::{Deserialize, Serialize};

/// Plan tier level.
///
/// Determines member capacity and feature access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    /// Entry tier for small congregations.
    Basic,

    /// Mid tier with reporting and finance modules.
    Pro,

    /// Top tier with unlimited members and priority support.
    Enterprise,
}

impl PlanTier {
    /// Returns the display name for this tier.
    pub fn display_name(&self) -> &'static str {
        match self {
            PlanTier::Basic => "Basic",
            PlanTier::Pro => "Pro",
            PlanTier::Enterprise => "Enterprise",
        }
    }

    /// Returns the numeric rank of this tier for comparison.
    pub fn rank(&self) -> u8 {
        match self {
            PlanTier::Basic => 0,
            PlanTier::Pro => 1,
            PlanTier::Enterprise => 2,
        }
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Billing currency.
///
/// The set of currencies a church can be billed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    /// US dollars.
    Usd,
    /// Euros.
    Eur,
    /// Brazilian reais.
    Brl,
}

impl Currency {
    /// Lowercase ISO 4217 code as the payment provider expects it.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "usd",
            Currency::Eur => "eur",
            Currency::Brl => "brl",
        }
    }

    /// Parse a lowercase ISO 4217 code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "usd" => Some(Currency::Usd),
            "eur" => Some(Currency::Eur),
            "brl" => Some(Currency::Brl),
            _ => None,
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Subscription plan with localized monthly pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,

    /// Tier level this plan sells.
    pub tier: PlanTier,

    /// Human-readable plan name.
    pub name: String,

    /// Maximum registered members, `None` for unlimited.
    pub member_limit: Option<u32>,

    /// Trial period granted at checkout, in days.
    pub trial_days: u32,

    /// Monthly price in US cents.
    pub price_usd_cents: i64,

    /// Monthly price in euro cents.
    pub price_eur_cents: i64,

    /// Monthly price in centavos.
    pub price_brl_cents: i64,
}

impl Plan {
    /// Returns the monthly price in minor units for the given currency.
    pub fn amount_in(&self, currency: Currency) -> i64 {
        match currency {
            Currency::Usd => self.price_usd_cents,
            Currency::Eur => self.price_eur_cents,
            Currency::Brl => self.price_brl_cents,
        }
    }
}
