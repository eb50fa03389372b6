//! Shared harness for tenant-service integration tests.
//!
//! Builds the full router over in-memory directories and cache so tests can
//! drive it with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use service_core::config::Config;
use std::sync::Arc;
use tenant_service::{
    build_router,
    config::{Environment, TenantConfig},
    models::Agency,
    services::{InMemoryAgencyDirectory, InMemoryCache, InMemoryMembershipDirectory},
    AppState,
};
use tower::util::ServiceExt;

pub const BASE_DOMAIN: &str = "example.com";

pub struct TestApp {
    pub state: AppState,
    pub directory: Arc<InMemoryAgencyDirectory>,
    pub members: Arc<InMemoryMembershipDirectory>,
    pub cache: Arc<InMemoryCache>,
}

impl TestApp {
    pub fn spawn() -> Self {
        let directory = Arc::new(InMemoryAgencyDirectory::new());
        let members = Arc::new(InMemoryMembershipDirectory::new());
        let cache = Arc::new(InMemoryCache::new());

        let state = AppState::new(
            test_config(),
            directory.clone(),
            members.clone(),
            cache.clone(),
        );

        Self {
            state,
            directory,
            members,
            cache,
        }
    }

    pub fn with_agency(self, agency: Agency) -> Self {
        self.directory.insert(agency);
        self
    }

    pub fn with_member(self, user_id: &str, agency_id: &str, role: &str) -> Self {
        self.members.assign(user_id, agency_id, role);
        self
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Send a request and return the status with the parsed JSON body
    /// (`Null` for empty or non-JSON bodies).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self
            .router()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);

        (status, body)
    }
}

pub fn test_config() -> TenantConfig {
    TenantConfig {
        common: Config {
            port: 0,
            ..Config::default()
        },
        environment: Environment::Dev,
        service_name: "tenant-service-test".to_string(),
        service_version: "0.0.0".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        base_domain: BASE_DOMAIN.to_string(),
        database: None,
        redis: None,
        run_migrations: false,
    }
}

/// GET request against `host`, optionally carrying BFF user headers.
pub fn get(host: &str, path: &str) -> RequestBuilder {
    RequestBuilder::new("GET", host, path)
}

pub fn post(host: &str, path: &str) -> RequestBuilder {
    RequestBuilder::new("POST", host, path)
}

pub struct RequestBuilder {
    inner: axum::http::request::Builder,
}

impl RequestBuilder {
    fn new(method: &str, host: &str, path: &str) -> Self {
        Self {
            inner: Request::builder()
                .method(method)
                .uri(path)
                .header("host", host),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.inner = self.inner.header(name, value);
        self
    }

    pub fn user(self, user_id: &str) -> Self {
        self.header("x-user-id", user_id)
    }

    pub fn build(self) -> Request<Body> {
        self.inner.body(Body::empty()).expect("Failed to build request")
    }
}
