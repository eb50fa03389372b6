//! Role and tier authorization gates.
//!
//! Both gates are pure over their inputs. Only [`RoleGate::authorize`] touches
//! a collaborator, to fetch the caller's role before deciding.

use serde::Serialize;

use super::directory::MembershipDirectory;
use super::error::AuthzError;
use crate::models::{role_level, AgencyFeatures, AgencyTier, Feature, Resource, Role, UNLIMITED};

pub struct RoleGate;

impl RoleGate {
    /// Decide whether a caller holding `user_role` satisfies any of `required`.
    ///
    /// `None` means the caller has no role record for the agency at all. An
    /// empty `required` list admits any associated caller.
    pub fn check(user_role: Option<&str>, required: &[Role]) -> Result<(), AuthzError> {
        let user_role = user_role.ok_or(AuthzError::NotAssociated)?;
        if required.is_empty() {
            return Ok(());
        }

        let user_level = role_level(user_role);
        if required.iter().any(|role| user_level >= role.level()) {
            Ok(())
        } else {
            Err(AuthzError::InsufficientPermissions)
        }
    }

    /// Look up the caller's role in `agency_id` and check it against `required`.
    /// Returns the stored role name on success.
    pub async fn authorize(
        members: &dyn MembershipDirectory,
        user_id: &str,
        agency_id: &str,
        required: &[Role],
    ) -> Result<String, AuthzError> {
        let role = members.find_role(user_id, agency_id).await?;

        match Self::check(role.as_deref(), required) {
            Ok(()) => Ok(role.unwrap_or_default()),
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    agency_id = %agency_id,
                    role = ?role,
                    required = ?required,
                    reason = %e,
                    "Role check denied"
                );
                Err(e)
            }
        }
    }
}

/// Outcome of a resource limit check. `-1` in `limit`/`remaining` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LimitCheck {
    pub allowed: bool,
    pub limit: i64,
    pub remaining: i64,
}

pub struct FeatureGate;

impl FeatureGate {
    pub fn is_enabled(features: &AgencyFeatures, feature: Feature) -> bool {
        features.flag(feature)
    }

    pub fn check_limit(features: &AgencyFeatures, resource: Resource, current_usage: i64) -> LimitCheck {
        let limit = features.limit(resource);
        if limit == UNLIMITED {
            return LimitCheck {
                allowed: true,
                limit: UNLIMITED,
                remaining: UNLIMITED,
            };
        }

        // Negative usage counts as none
        let usage = current_usage.max(0);
        LimitCheck {
            allowed: usage < limit,
            limit,
            remaining: limit.saturating_sub(usage).max(0),
        }
    }

    pub fn require_feature(
        features: &AgencyFeatures,
        tier: AgencyTier,
        feature: Feature,
    ) -> Result<(), AuthzError> {
        if Self::is_enabled(features, feature) {
            Ok(())
        } else {
            Err(AuthzError::FeatureUnavailable {
                feature: feature.to_string(),
                tier: tier.to_string(),
            })
        }
    }

    pub fn require_capacity(
        features: &AgencyFeatures,
        resource: Resource,
        current_usage: i64,
    ) -> Result<LimitCheck, AuthzError> {
        let check = Self::check_limit(features, resource, current_usage);
        if check.allowed {
            Ok(check)
        } else {
            Err(AuthzError::LimitReached {
                resource: resource.to_string(),
                limit: check.limit,
            })
        }
    }
}
