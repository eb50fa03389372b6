//! Request-scoped tenant context.

use serde::Serialize;

use super::{Agency, AgencyFeatures, AgencyTier};

/// Agency id of the synthetic context served on the `app`/`admin` subdomains.
pub const MASTER_AGENCY_ID: &str = "master";

/// How the tenant of a request was identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    Subdomain,
    Header,
    User,
    Master,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionSource::Subdomain => "subdomain",
            ResolutionSource::Header => "header",
            ResolutionSource::User => "user",
            ResolutionSource::Master => "master",
        }
    }
}

/// Tenant context attached to a request once resolution succeeds.
///
/// Built once per request by the resolver and only read afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct TenantContext {
    pub agency_id: String,
    /// Snapshot at resolution time. `None` for the master context.
    pub agency: Option<Agency>,
    pub tier: AgencyTier,
    pub features: AgencyFeatures,
    /// Resolved subdomain, or the source name for header/user resolution.
    pub subdomain: String,
    pub is_active: bool,
    pub source: ResolutionSource,
}

impl TenantContext {
    pub fn for_agency(agency: Agency, subdomain: String, source: ResolutionSource) -> Self {
        let tier = agency.subscription_tier;
        Self {
            agency_id: agency.id.clone(),
            tier,
            features: AgencyFeatures::for_tier(tier),
            subdomain,
            is_active: agency.is_active,
            agency: Some(agency),
            source,
        }
    }

    pub fn master(subdomain: &str) -> Self {
        let tier = AgencyTier::WhiteLabel;
        Self {
            agency_id: MASTER_AGENCY_ID.to_string(),
            agency: None,
            tier,
            features: AgencyFeatures::for_tier(tier),
            subdomain: subdomain.to_string(),
            is_active: true,
            source: ResolutionSource::Master,
        }
    }

    pub fn is_master(&self) -> bool {
        self.source == ResolutionSource::Master
    }
}

/// Caller identity forwarded by the trusted BFF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    /// Home agency of the user, if any.
    pub agency_id: Option<String>,
}
