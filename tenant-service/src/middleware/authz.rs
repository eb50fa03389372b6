//! Role guards for tenant-scoped routes.
//!
//! Layered with `route_layer(from_fn_with_state(state, require_*))` inside
//! the tenant resolution layer, so the context is already in the request
//! extensions when a guard runs.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::models::{AuthenticatedUser, Role, TenantContext};
use crate::services::{AuthzError, RoleGate};
use crate::AppState;

/// Role the caller holds in the resolved agency, inserted by the guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRole(pub String);

/// Admit the caller if their role in the resolved agency meets any of
/// `required`.
pub async fn require_roles(
    state: &AppState,
    required: &[Role],
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or(AuthzError::Unauthenticated)?;

    let agency_id = request
        .extensions()
        .get::<TenantContext>()
        .map(|ctx| ctx.agency_id.clone())
        .ok_or(AuthzError::MissingTenantContext)?;

    let role =
        RoleGate::authorize(state.members.as_ref(), &user.user_id, &agency_id, required).await?;

    request.extensions_mut().insert(MemberRole(role));
    Ok(next.run(request).await)
}

pub async fn require_viewer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_roles(&state, &[Role::AgencyViewer], request, next).await
}

pub async fn require_user(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_roles(&state, &[Role::AgencyUser], request, next).await
}

pub async fn require_manager(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_roles(&state, &[Role::AgencyManager], request, next).await
}

pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_roles(&state, &[Role::AgencyAdmin], request, next).await
}
