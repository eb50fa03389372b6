//! Tenant-scoped endpoints. Every handler here sits behind the tenant
//! resolution layer and receives the resolved [`TenantContext`].

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

use crate::middleware::MemberRole;
use crate::models::{AgencyFeatures, AgencyTier, Feature, Resource, TenantContext};
use crate::services::{FeatureGate, LimitCheck};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TenantResponse {
    #[serde(flatten)]
    pub context: TenantContext,
    pub role: String,
}

pub async fn get_tenant(
    context: TenantContext,
    Extension(MemberRole(role)): Extension<MemberRole>,
) -> Json<TenantResponse> {
    Json(TenantResponse { context, role })
}

#[derive(Debug, Serialize)]
pub struct FeaturesResponse {
    pub agency_id: String,
    pub tier: AgencyTier,
    pub features: AgencyFeatures,
}

pub async fn get_features(context: TenantContext) -> Json<FeaturesResponse> {
    Json(FeaturesResponse {
        agency_id: context.agency_id,
        tier: context.tier,
        features: context.features,
    })
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub current_usage: i64,
}

#[derive(Debug, Serialize)]
pub struct LimitResponse {
    pub resource: String,
    pub current_usage: i64,
    #[serde(flatten)]
    pub check: LimitCheck,
}

pub async fn get_limit(
    context: TenantContext,
    Path(resource): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<LimitResponse>, AppError> {
    let resource: Resource = resource
        .parse()
        .map_err(|e: String| AppError::BadRequest(anyhow::anyhow!(e)))?;

    if query.current_usage < 0 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "current_usage must not be negative"
        )));
    }

    let check = FeatureGate::check_limit(&context.features, resource, query.current_usage);

    Ok(Json(LimitResponse {
        resource: resource.to_string(),
        current_usage: query.current_usage,
        check,
    }))
}

#[derive(Debug, Serialize)]
pub struct BrandingResponse {
    pub agency_id: String,
    pub name: Option<String>,
    pub subdomain: String,
    pub custom_domain: Option<String>,
    pub white_label: bool,
}

pub async fn get_branding(context: TenantContext) -> Result<Json<BrandingResponse>, AppError> {
    FeatureGate::require_feature(&context.features, context.tier, Feature::CustomBranding)?;

    let agency = context.agency.as_ref();
    Ok(Json(BrandingResponse {
        agency_id: context.agency_id.clone(),
        name: agency.map(|a| a.name.clone()),
        subdomain: agency
            .map(|a| a.subdomain.clone())
            .unwrap_or_else(|| context.subdomain.clone()),
        custom_domain: agency.and_then(|a| a.custom_domain.clone()),
        white_label: FeatureGate::is_enabled(&context.features, Feature::WhiteLabel),
    }))
}

#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub scope: &'static str,
    pub agency_id: String,
    pub removed: Option<u64>,
}

/// Drop cached resolutions for the caller's agency. On the master context
/// every cached agency is dropped.
pub async fn invalidate_cache(
    State(state): State<AppState>,
    context: TenantContext,
) -> Json<InvalidateResponse> {
    match &context.agency {
        Some(agency) => {
            state.resolver.invalidate_agency(agency).await;
            Json(InvalidateResponse {
                scope: "agency",
                agency_id: context.agency_id.clone(),
                removed: None,
            })
        }
        None => {
            let removed = state.resolver.invalidate_all().await;
            Json(InvalidateResponse {
                scope: "all",
                agency_id: context.agency_id.clone(),
                removed: Some(removed),
            })
        }
    }
}
