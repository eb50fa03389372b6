//! Authenticated user context.
//!
//! Authentication happens upstream in the BFF, which forwards the caller
//! through `X-User-ID` and, when known, the user's home agency through
//! `X-User-Agency-ID`. The headers are only trusted because the service is
//! not reachable except through the BFF.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use super::tenant::header_value;
use crate::models::AuthenticatedUser;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_AGENCY_ID_HEADER: &str = "x-user-agency-id";

/// Turn the BFF user headers into an [`AuthenticatedUser`] extension.
/// Requests without `X-User-ID` continue anonymously.
pub async fn user_context_middleware(mut request: Request, next: Next) -> Response {
    // Owned copies only: no borrow of the request may live across the await
    let user_id = header_value(request.headers(), USER_ID_HEADER);
    let agency_id = header_value(request.headers(), USER_AGENCY_ID_HEADER);

    if let Some(user_id) = user_id {
        tracing::Span::current().record("user_id", user_id.as_str());
        request
            .extensions_mut()
            .insert(AuthenticatedUser { user_id, agency_id });
    }

    next.run(request).await
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!(
                    "Missing X-User-ID header (required from BFF)"
                ))
            })
    }
}
