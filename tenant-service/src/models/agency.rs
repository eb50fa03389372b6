//! Agency model - the tenant organization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::AgencyTier;

/// Agency record as returned by the directory.
///
/// This is the shape stored in the resolution cache, so it must stay
/// JSON round-trippable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agency {
    pub id: String,
    pub name: String,
    pub subdomain: String,
    pub slug: String,
    pub is_active: bool,
    pub subscription_tier: AgencyTier,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub user_limit: i64,
    pub agent_limit: i64,
    pub storage_limit_mb: i64,
    pub custom_domain: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Agency {
    /// Create an active agency with the persisted limits of its tier.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        subdomain: impl Into<String>,
        tier: AgencyTier,
    ) -> Self {
        let name = name.into();
        let (user_limit, agent_limit, storage_limit_mb) = tier_limits(tier);
        Self {
            id: id.into(),
            slug: slugify(&name),
            name,
            subdomain: subdomain.into(),
            is_active: true,
            subscription_tier: tier,
            trial_ends_at: None,
            user_limit,
            agent_limit,
            storage_limit_mb,
            custom_domain: None,
            created_at: Utc::now(),
        }
    }

    /// A trial is expired only when the tier is TRIAL and the end date has passed.
    pub fn trial_expired(&self, now: DateTime<Utc>) -> bool {
        self.subscription_tier == AgencyTier::Trial
            && self.trial_ends_at.is_some_and(|ends_at| now > ends_at)
    }
}

/// Row shape of the `agencies` table. The tier is stored as text.
#[derive(Debug, Clone, FromRow)]
pub struct AgencyRow {
    pub id: String,
    pub name: String,
    pub subdomain: String,
    pub slug: String,
    pub is_active: bool,
    pub subscription_tier: String,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub user_limit: i64,
    pub agent_limit: i64,
    pub storage_limit_mb: i64,
    pub custom_domain: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AgencyRow> for Agency {
    type Error = String;

    fn try_from(row: AgencyRow) -> Result<Self, Self::Error> {
        let subscription_tier = row
            .subscription_tier
            .parse()
            .map_err(|e: String| format!("agency {}: {}", row.id, e))?;

        Ok(Self {
            id: row.id,
            name: row.name,
            subdomain: row.subdomain,
            slug: row.slug,
            is_active: row.is_active,
            subscription_tier,
            trial_ends_at: row.trial_ends_at,
            user_limit: row.user_limit,
            agent_limit: row.agent_limit,
            storage_limit_mb: row.storage_limit_mb,
            custom_domain: row.custom_domain,
            created_at: row.created_at,
        })
    }
}

/// Persisted per-agency limits. Unlimited tiers are capped to concrete numbers
/// because the columns are plain integers.
fn tier_limits(tier: AgencyTier) -> (i64, i64, i64) {
    let features = super::AgencyFeatures::for_tier(tier);
    let cap = |value: i64, ceiling: i64| if value == super::UNLIMITED { ceiling } else { value };
    (
        cap(features.max_users, 10_000),
        cap(features.max_agents, 10_000),
        cap(features.max_storage_mb, 1_000_000),
    )
}

fn slugify(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    cleaned
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
