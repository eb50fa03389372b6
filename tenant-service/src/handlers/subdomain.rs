use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use service_core::error::AppError;

use crate::services::subdomain::{check_availability, SubdomainAvailability};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub subdomain: String,
    pub available: bool,
    pub status: SubdomainAvailability,
}

pub async fn subdomain_availability(
    State(state): State<AppState>,
    Path(subdomain): Path<String>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let status = check_availability(state.directory.as_ref(), &subdomain).await?;

    Ok(Json(AvailabilityResponse {
        available: status == SubdomainAvailability::Available,
        subdomain,
        status,
    }))
}
