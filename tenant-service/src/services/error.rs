use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use service_core::error::AppError;
use thiserror::Error;

/// Failures of the agency system of record.
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid agency record: {0}")]
    InvalidRecord(String),

    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            DirectoryError::InvalidRecord(msg) => AppError::InternalError(anyhow::anyhow!(msg)),
            DirectoryError::Unavailable(_) => AppError::ServiceUnavailable,
        }
    }
}

/// Reasons a request could not be bound to a tenant.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Agency not found")]
    AgencyNotFound { subdomain: Option<String> },

    #[error("Agency suspended")]
    AgencySuspended { subdomain: Option<String> },

    #[error("Trial expired")]
    TrialExpired { subdomain: Option<String> },

    #[error("Error resolving agency: {0}")]
    ResolutionFailed(#[source] DirectoryError),
}

impl ResolutionError {
    pub fn code(&self) -> &'static str {
        match self {
            ResolutionError::AgencyNotFound { .. } => "AGENCY_NOT_FOUND",
            ResolutionError::AgencySuspended { .. } => "AGENCY_SUSPENDED",
            ResolutionError::TrialExpired { .. } => "TRIAL_EXPIRED",
            ResolutionError::ResolutionFailed(_) => "AGENCY_RESOLUTION_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ResolutionError::AgencyNotFound { .. } => StatusCode::NOT_FOUND,
            ResolutionError::AgencySuspended { .. } => StatusCode::FORBIDDEN,
            ResolutionError::TrialExpired { .. } => StatusCode::PAYMENT_REQUIRED,
            ResolutionError::ResolutionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            ResolutionError::AgencyNotFound { .. } => "Agency not found",
            ResolutionError::AgencySuspended { .. } => "Agency suspended",
            ResolutionError::TrialExpired { .. } => "Trial expired",
            ResolutionError::ResolutionFailed(_) => "Error resolving agency",
        }
    }

    fn subdomain(&self) -> Option<&str> {
        match self {
            ResolutionError::AgencyNotFound { subdomain }
            | ResolutionError::AgencySuspended { subdomain }
            | ResolutionError::TrialExpired { subdomain } => subdomain.as_deref(),
            ResolutionError::ResolutionFailed(_) => None,
        }
    }

    fn message(&self) -> Option<&'static str> {
        match self {
            ResolutionError::AgencySuspended { .. } => {
                Some("This agency has been suspended. Please contact support.")
            }
            ResolutionError::TrialExpired { .. } => {
                Some("Your trial has expired. Please upgrade your subscription.")
            }
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ResolutionErrorBody<'a> {
    error: &'a str,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    subdomain: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

impl IntoResponse for ResolutionError {
    fn into_response(self) -> Response {
        // Directory details stay in the logs
        let body = ResolutionErrorBody {
            error: self.title(),
            code: self.code(),
            subdomain: self.subdomain(),
            message: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Authorization gate denials.
#[derive(Error, Debug)]
pub enum AuthzError {
    #[error("not associated with this agency")]
    NotAssociated,

    #[error("insufficient permissions")]
    InsufficientPermissions,

    #[error("feature '{feature}' not available on {tier} tier")]
    FeatureUnavailable { feature: String, tier: String },

    #[error("{resource} limit reached ({limit})")]
    LimitReached { resource: String, limit: i64 },

    #[error("Tenant context not available")]
    MissingTenantContext,

    #[error("Authenticated user required")]
    Unauthenticated,

    #[error("Role lookup failed: {0}")]
    Lookup(#[from] DirectoryError),
}

impl From<AuthzError> for AppError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Unauthenticated => AppError::Unauthorized(anyhow::anyhow!(err)),
            AuthzError::Lookup(e) => AppError::from(e),
            other => AppError::Forbidden(anyhow::anyhow!(other)),
        }
    }
}
