pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::TenantConfig;
use crate::services::{AgencyDirectory, CacheStore, MembershipDirectory, TenantResolver};

#[derive(Clone)]
pub struct AppState {
    pub config: TenantConfig,
    pub resolver: TenantResolver,
    pub directory: Arc<dyn AgencyDirectory>,
    pub members: Arc<dyn MembershipDirectory>,
    pub cache: Arc<dyn CacheStore>,
}

impl AppState {
    /// Wire the resolver onto the given collaborators.
    pub fn new(
        config: TenantConfig,
        directory: Arc<dyn AgencyDirectory>,
        members: Arc<dyn MembershipDirectory>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        let resolver = TenantResolver::new(&config.base_domain, directory.clone(), cache.clone());
        Self {
            config,
            resolver,
            directory,
            members,
            cache,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let tenant_routes = Router::new()
        .route(
            "/api/tenant",
            get(handlers::get_tenant)
                .route_layer(from_fn_with_state(state.clone(), middleware::require_viewer)),
        )
        .route("/api/tenant/features", get(handlers::get_features))
        .route(
            "/api/tenant/limits/:resource",
            get(handlers::get_limit)
                .route_layer(from_fn_with_state(state.clone(), middleware::require_user)),
        )
        .route(
            "/api/tenant/branding",
            get(handlers::get_branding)
                .route_layer(from_fn_with_state(state.clone(), middleware::require_manager)),
        )
        .route(
            "/api/tenant/cache/invalidate",
            post(handlers::invalidate_cache)
                .route_layer(from_fn_with_state(state.clone(), middleware::require_admin)),
        )
        // Resolution needs the caller, so the user layer wraps it
        .layer(from_fn_with_state(
            state.clone(),
            middleware::tenant_resolution_middleware,
        ))
        .layer(from_fn(middleware::user_context_middleware));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route(
            "/api/subdomains/:subdomain/availability",
            get(handlers::subdomain_availability),
        )
        .merge(tenant_routes)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    agency_id = tracing::field::Empty,
                    user_id = tracing::field::Empty,
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
}
