//! Subscription tiers and the capabilities each one unlocks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel limit value meaning "no limit".
pub const UNLIMITED: i64 = -1;

/// Subscription level of an agency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgencyTier {
    Trial,
    Starter,
    Professional,
    Enterprise,
    WhiteLabel,
}

impl AgencyTier {
    pub const ALL: [AgencyTier; 5] = [
        AgencyTier::Trial,
        AgencyTier::Starter,
        AgencyTier::Professional,
        AgencyTier::Enterprise,
        AgencyTier::WhiteLabel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgencyTier::Trial => "TRIAL",
            AgencyTier::Starter => "STARTER",
            AgencyTier::Professional => "PROFESSIONAL",
            AgencyTier::Enterprise => "ENTERPRISE",
            AgencyTier::WhiteLabel => "WHITE_LABEL",
        }
    }
}

impl fmt::Display for AgencyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgencyTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TRIAL" => Ok(AgencyTier::Trial),
            "STARTER" => Ok(AgencyTier::Starter),
            "PROFESSIONAL" => Ok(AgencyTier::Professional),
            "ENTERPRISE" => Ok(AgencyTier::Enterprise),
            "WHITE_LABEL" => Ok(AgencyTier::WhiteLabel),
            _ => Err(format!("Invalid agency tier: {}", s)),
        }
    }
}

/// Capabilities and resource limits granted by a tier.
///
/// Always derived from [`AgencyTier`] through [`AgencyFeatures::for_tier`];
/// never read from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgencyFeatures {
    pub max_users: i64,
    pub max_agents: i64,
    /// Megabytes.
    pub max_storage_mb: i64,
    pub custom_branding: bool,
    pub custom_domain: bool,
    pub white_label: bool,
    pub advanced_analytics: bool,
    pub priority_support: bool,
    pub api_access: bool,
    pub sso: bool,
}

impl AgencyFeatures {
    pub const fn for_tier(tier: AgencyTier) -> Self {
        match tier {
            AgencyTier::Trial => Self {
                max_users: 3,
                max_agents: 5,
                max_storage_mb: 100,
                custom_branding: false,
                custom_domain: false,
                white_label: false,
                advanced_analytics: false,
                priority_support: false,
                api_access: false,
                sso: false,
            },
            AgencyTier::Starter => Self {
                max_users: 10,
                max_agents: 25,
                max_storage_mb: 1_000,
                custom_branding: false,
                custom_domain: false,
                white_label: false,
                advanced_analytics: false,
                priority_support: false,
                api_access: true,
                sso: false,
            },
            AgencyTier::Professional => Self {
                max_users: 50,
                max_agents: 100,
                max_storage_mb: 10_000,
                custom_branding: true,
                custom_domain: true,
                white_label: false,
                advanced_analytics: true,
                priority_support: true,
                api_access: true,
                sso: true,
            },
            AgencyTier::Enterprise => Self {
                max_users: 500,
                max_agents: 1_000,
                max_storage_mb: 100_000,
                custom_branding: true,
                custom_domain: true,
                white_label: false,
                advanced_analytics: true,
                priority_support: true,
                api_access: true,
                sso: true,
            },
            AgencyTier::WhiteLabel => Self {
                max_users: UNLIMITED,
                max_agents: UNLIMITED,
                max_storage_mb: UNLIMITED,
                custom_branding: true,
                custom_domain: true,
                white_label: true,
                advanced_analytics: true,
                priority_support: true,
                api_access: true,
                sso: true,
            },
        }
    }

    pub fn flag(&self, feature: Feature) -> bool {
        match feature {
            Feature::CustomBranding => self.custom_branding,
            Feature::CustomDomain => self.custom_domain,
            Feature::WhiteLabel => self.white_label,
            Feature::AdvancedAnalytics => self.advanced_analytics,
            Feature::PrioritySupport => self.priority_support,
            Feature::ApiAccess => self.api_access,
            Feature::Sso => self.sso,
        }
    }

    pub fn limit(&self, resource: Resource) -> i64 {
        match resource {
            Resource::Users => self.max_users,
            Resource::Agents => self.max_agents,
            Resource::StorageMb => self.max_storage_mb,
        }
    }
}

/// Boolean capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    CustomBranding,
    CustomDomain,
    WhiteLabel,
    AdvancedAnalytics,
    PrioritySupport,
    ApiAccess,
    Sso,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::CustomBranding => "custom_branding",
            Feature::CustomDomain => "custom_domain",
            Feature::WhiteLabel => "white_label",
            Feature::AdvancedAnalytics => "advanced_analytics",
            Feature::PrioritySupport => "priority_support",
            Feature::ApiAccess => "api_access",
            Feature::Sso => "sso",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric, usage-bounded resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Agents,
    StorageMb,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Users => "users",
            Resource::Agents => "agents",
            Resource::StorageMb => "storage",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "users" | "max_users" => Ok(Resource::Users),
            "agents" | "max_agents" => Ok(Resource::Agents),
            "storage" | "storage_mb" | "max_storage_mb" => Ok(Resource::StorageMb),
            _ => Err(format!("Unknown resource: {}", s)),
        }
    }
}
