//! Tenant resolution middleware.
//!
//! Runs the [`TenantResolver`](crate::services::TenantResolver) for every
//! request and stores the resulting [`TenantContext`] in the request
//! extensions. Resolution failures short-circuit with the structured
//! resolution error body.

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use service_core::error::AppError;
use std::net::SocketAddr;

use crate::models::{AuthenticatedUser, TenantContext};
use crate::services::ResolutionRequest;
use crate::AppState;

pub const AGENCY_ID_HEADER: &str = "x-agency-id";

pub async fn tenant_resolution_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let resolution = resolution_request(&request);

    match state.resolver.resolve(&resolution).await {
        Ok(Some(context)) => {
            tracing::Span::current().record("agency_id", context.agency_id.as_str());
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

fn resolution_request(request: &Request) -> ResolutionRequest {
    let headers = request.headers();

    let host = header_value(headers, header::HOST.as_str())
        .or_else(|| request.uri().host().map(str::to_string))
        .unwrap_or_default();

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    ResolutionRequest {
        host,
        path: request.uri().path().to_string(),
        method: request.method().to_string(),
        agency_header: header_value(headers, AGENCY_ID_HEADER),
        user: request.extensions().get::<AuthenticatedUser>().cloned(),
        user_agent: header_value(headers, header::USER_AGENT.as_str()),
        client_ip: client_ip(headers, peer),
    }
}

pub(super) fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Client address: first `X-Forwarded-For` hop, then `X-Real-IP`, then the
/// socket peer, else `"unknown"`.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = header_value(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|ip| !ip.is_empty()) {
            return first.to_string();
        }
    }

    header_value(headers, "x-real-ip")
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Extractor for handlers that need a resolved tenant.
#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or_else(|| AppError::Forbidden(anyhow::anyhow!("Tenant context not available")))
    }
}
