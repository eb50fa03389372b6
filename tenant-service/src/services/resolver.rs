//! Tenant resolution.
//!
//! Maps an inbound request to a [`TenantContext`]. Resolution order, first
//! match wins:
//! 1. agency subdomain of the base domain (cache key `agency:subdomain:{s}`)
//! 2. `x-agency-id` header (cache key `agency:id:{id}`)
//! 3. home agency of the authenticated user (same key as 2)
//! 4. `app`/`admin` subdomain -> synthetic master context
//!
//! Anything else proceeds without a tenant.

use chrono::{DateTime, Utc};
use metrics::counter;
use std::sync::Arc;

use super::access_log::{record_access, AccessLogEntry};
use super::agency_cache::{id_key, subdomain_key, AgencyCache, AGENCY_KEY_PREFIX};
use super::cache::CacheStore;
use super::directory::AgencyDirectory;
use super::error::{DirectoryError, ResolutionError};
use super::subdomain::{
    extract_subdomain, is_master_subdomain, is_resolution_reserved, should_skip_resolution,
};
use crate::models::{Agency, AuthenticatedUser, ResolutionSource, TenantContext};

/// Source of "now" for trial expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The parts of an HTTP request that resolution depends on.
#[derive(Debug, Clone, Default)]
pub struct ResolutionRequest {
    pub host: String,
    pub path: String,
    pub method: String,
    pub agency_header: Option<String>,
    pub user: Option<AuthenticatedUser>,
    pub user_agent: Option<String>,
    pub client_ip: String,
}

enum Lookup<'a> {
    Subdomain(&'a str),
    Id(&'a str, ResolutionSource),
}

impl Lookup<'_> {
    fn cache_key(&self) -> String {
        match self {
            Lookup::Subdomain(subdomain) => subdomain_key(subdomain),
            Lookup::Id(agency_id, _) => id_key(agency_id),
        }
    }

    fn source(&self) -> ResolutionSource {
        match self {
            Lookup::Subdomain(_) => ResolutionSource::Subdomain,
            Lookup::Id(_, source) => *source,
        }
    }

    /// Subdomain reported on the context and in error bodies.
    fn subdomain(&self) -> Option<String> {
        match self {
            Lookup::Subdomain(subdomain) => Some(subdomain.to_string()),
            Lookup::Id(..) => None,
        }
    }
}

#[derive(Clone)]
pub struct TenantResolver {
    base_domain: String,
    directory: Arc<dyn AgencyDirectory>,
    cache: AgencyCache,
    clock: Arc<dyn Clock>,
}

impl TenantResolver {
    pub fn new(
        base_domain: impl Into<String>,
        directory: Arc<dyn AgencyDirectory>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            base_domain: base_domain.into(),
            directory,
            cache: AgencyCache::new(cache),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    /// Resolve the tenant of a request.
    ///
    /// `Ok(None)` means the request legitimately has no tenant (skip-listed
    /// path, bare domain, `www`, reserved subdomain without other hints).
    pub async fn resolve(
        &self,
        request: &ResolutionRequest,
    ) -> Result<Option<TenantContext>, ResolutionError> {
        if should_skip_resolution(&request.path) {
            return Ok(None);
        }

        let subdomain = extract_subdomain(&request.host, &self.base_domain);

        if let Some(subdomain) = subdomain.as_deref() {
            if !is_resolution_reserved(subdomain) {
                tracing::debug!(subdomain = %subdomain, "Agency subdomain access");
                return self
                    .resolve_agency(Lookup::Subdomain(subdomain), request)
                    .await
                    .map(Some);
            }
        }

        if let Some(agency_id) = request.agency_header.as_deref().filter(|id| !id.is_empty()) {
            tracing::debug!(agency_id = %agency_id, "Agency header access");
            return self
                .resolve_agency(Lookup::Id(agency_id, ResolutionSource::Header), request)
                .await
                .map(Some);
        }

        if let Some(agency_id) = request
            .user
            .as_ref()
            .and_then(|user| user.agency_id.as_deref())
            .filter(|id| !id.is_empty())
        {
            tracing::debug!(agency_id = %agency_id, "Resolving tenant from authenticated user");
            return self
                .resolve_agency(Lookup::Id(agency_id, ResolutionSource::User), request)
                .await
                .map(Some);
        }

        match subdomain.as_deref() {
            Some(subdomain) if is_master_subdomain(subdomain) => {
                tracing::debug!(subdomain = %subdomain, "Master admin access detected");
                record_outcome(ResolutionSource::Master, "resolved");
                Ok(Some(TenantContext::master(subdomain)))
            }
            _ => {
                tracing::debug!("Main platform access detected");
                Ok(None)
            }
        }
    }

    async fn resolve_agency(
        &self,
        lookup: Lookup<'_>,
        request: &ResolutionRequest,
    ) -> Result<TenantContext, ResolutionError> {
        let source = lookup.source();
        let subdomain = lookup.subdomain();

        let agency = match self.lookup_agency(&lookup).await {
            Ok(agency) => agency,
            Err(e) => {
                tracing::error!(
                    key = %lookup.cache_key(),
                    error = %e,
                    "Error resolving agency"
                );
                record_outcome(source, "error");
                return Err(ResolutionError::ResolutionFailed(e));
            }
        };

        let Some(agency) = agency else {
            tracing::warn!(key = %lookup.cache_key(), "Agency not found");
            record_outcome(source, "not_found");
            return Err(ResolutionError::AgencyNotFound { subdomain });
        };

        if !agency.is_active {
            tracing::warn!(agency_id = %agency.id, "Agency suspended");
            record_outcome(source, "suspended");
            return Err(ResolutionError::AgencySuspended { subdomain });
        }

        if agency.trial_expired(self.clock.now()) {
            tracing::warn!(agency_id = %agency.id, "Agency trial expired");
            record_outcome(source, "trial_expired");
            return Err(ResolutionError::TrialExpired { subdomain });
        }

        let label = subdomain.unwrap_or_else(|| source.as_str().to_string());
        let context = TenantContext::for_agency(agency, label, source);

        tracing::debug!(agency_id = %context.agency_id, "Tenant context resolved");
        record_outcome(source, "resolved");
        self.log_access(&context, request).await;

        Ok(context)
    }

    /// Cache-first lookup. Population after a miss is not atomic with the
    /// miss; concurrent requests may both hit the directory.
    async fn lookup_agency(&self, lookup: &Lookup<'_>) -> Result<Option<Agency>, DirectoryError> {
        let key = lookup.cache_key();

        if let Some(agency) = self.cache.get(&key).await {
            return Ok(Some(agency));
        }

        let agency = match lookup {
            Lookup::Subdomain(subdomain) => self.directory.find_by_subdomain(subdomain).await?,
            Lookup::Id(agency_id, _) => self.directory.find_by_id(agency_id).await?,
        };

        if let Some(agency) = &agency {
            self.cache.put(&key, agency).await;
        }

        Ok(agency)
    }

    async fn log_access(&self, context: &TenantContext, request: &ResolutionRequest) {
        let entry = AccessLogEntry {
            agency_id: context.agency_id.clone(),
            subdomain: context.subdomain.clone(),
            path: request.path.clone(),
            method: request.method.clone(),
            user_agent: request.user_agent.clone(),
            ip: request.client_ip.clone(),
            timestamp: self.clock.now(),
        };
        record_access(self.cache.store().as_ref(), &entry).await;
    }

    /// Drop both cached resolutions of an agency.
    pub async fn invalidate_agency(&self, agency: &Agency) {
        self.cache.evict(&subdomain_key(&agency.subdomain)).await;
        self.cache.evict(&id_key(&agency.id)).await;
        tracing::info!(agency_id = %agency.id, "Agency cache invalidated");
    }

    /// Drop every cached agency resolution.
    pub async fn invalidate_all(&self) -> u64 {
        let removed = self.cache.evict_prefix(AGENCY_KEY_PREFIX).await;
        tracing::info!(removed, "Agency cache cleared");
        removed
    }
}

fn record_outcome(source: ResolutionSource, outcome: &'static str) {
    counter!(
        "tenant_resolutions_total",
        "source" => source.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgencyTier;
    use crate::services::cache::InMemoryCache;
    use crate::services::directory::InMemoryAgencyDirectory;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const BASE: &str = "example.com";

    /// Counts directory hits so cache behaviour can be observed.
    #[derive(Default)]
    struct CountingDirectory {
        inner: InMemoryAgencyDirectory,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AgencyDirectory for CountingDirectory {
        async fn find_by_subdomain(&self, s: &str) -> Result<Option<Agency>, DirectoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_subdomain(s).await
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<Agency>, DirectoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_id(id).await
        }

        async fn subdomain_exists(&self, s: &str) -> Result<bool, DirectoryError> {
            self.inner.subdomain_exists(s).await
        }
    }

    struct FailingDirectory;

    #[async_trait]
    impl AgencyDirectory for FailingDirectory {
        async fn find_by_subdomain(&self, _: &str) -> Result<Option<Agency>, DirectoryError> {
            Err(DirectoryError::Unavailable("connection refused".to_string()))
        }

        async fn find_by_id(&self, _: &str) -> Result<Option<Agency>, DirectoryError> {
            Err(DirectoryError::Unavailable("connection refused".to_string()))
        }

        async fn subdomain_exists(&self, _: &str) -> Result<bool, DirectoryError> {
            Err(DirectoryError::Unavailable("connection refused".to_string()))
        }
    }

    struct BrokenCache;

    #[async_trait]
    impl CacheStore for BrokenCache {
        async fn get(&self, _: &str) -> Result<Option<String>, anyhow::Error> {
            Err(anyhow::anyhow!("cache down"))
        }
        async fn set(&self, _: &str, _: &str, _: std::time::Duration) -> Result<(), anyhow::Error> {
            Err(anyhow::anyhow!("cache down"))
        }
        async fn delete(&self, _: &str) -> Result<(), anyhow::Error> {
            Err(anyhow::anyhow!("cache down"))
        }
        async fn delete_pattern(&self, _: &str) -> Result<u64, anyhow::Error> {
            Err(anyhow::anyhow!("cache down"))
        }
        async fn push_capped(&self, _: &str, _: &str, _: usize) -> Result<(), anyhow::Error> {
            Err(anyhow::anyhow!("cache down"))
        }
        async fn health_check(&self) -> Result<(), anyhow::Error> {
            Err(anyhow::anyhow!("cache down"))
        }
    }

    fn request(host: &str) -> ResolutionRequest {
        ResolutionRequest {
            host: host.to_string(),
            path: "/api/projects".to_string(),
            method: "GET".to_string(),
            client_ip: "127.0.0.1".to_string(),
            ..Default::default()
        }
    }

    fn setup(agencies: Vec<Agency>) -> (TenantResolver, Arc<CountingDirectory>, Arc<InMemoryCache>) {
        let directory = Arc::new(CountingDirectory::default());
        for agency in agencies {
            directory.inner.insert(agency);
        }
        let cache = Arc::new(InMemoryCache::new());
        let resolver = TenantResolver::new(BASE, directory.clone(), cache.clone());
        (resolver, directory, cache)
    }

    #[tokio::test]
    async fn resolves_agency_subdomain() {
        let (resolver, _, _) = setup(vec![Agency::new("a1", "Acme", "acme", AgencyTier::Starter)]);

        let ctx = resolver
            .resolve(&request("acme.example.com"))
            .await
            .unwrap()
            .expect("tenant context");

        assert_eq!(ctx.agency_id, "a1");
        assert_eq!(ctx.subdomain, "acme");
        assert_eq!(ctx.source, ResolutionSource::Subdomain);
        assert!(ctx.features.api_access);
        assert!(!ctx.features.custom_branding);
    }

    #[tokio::test]
    async fn second_resolution_is_served_from_cache() {
        let (resolver, directory, _) =
            setup(vec![Agency::new("a1", "Acme", "acme", AgencyTier::Starter)]);

        let first = resolver.resolve(&request("acme.example.com")).await.unwrap().unwrap();
        let second = resolver.resolve(&request("acme.example.com")).await.unwrap().unwrap();

        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.agency_id, second.agency_id);
        assert_eq!(first.features, second.features);
    }

    #[tokio::test]
    async fn misses_are_not_cached() {
        let (resolver, directory, _) = setup(vec![]);

        for _ in 0..2 {
            let err = resolver.resolve(&request("ghost.example.com")).await.unwrap_err();
            assert_eq!(err.code(), "AGENCY_NOT_FOUND");
        }
        assert_eq!(directory.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn resolution_is_deterministic_with_fresh_cache() {
        let agency = Agency::new("a1", "Acme", "acme", AgencyTier::Professional);
        let (first_resolver, _, _) = setup(vec![agency.clone()]);
        let (second_resolver, _, _) = setup(vec![agency]);

        let a = first_resolver.resolve(&request("acme.example.com")).await.unwrap().unwrap();
        let b = second_resolver.resolve(&request("acme.example.com")).await.unwrap().unwrap();

        assert_eq!(a.agency_id, b.agency_id);
        assert_eq!(a.tier, b.tier);
        assert_eq!(a.features, b.features);
    }

    #[tokio::test]
    async fn suspended_agency_is_rejected_on_every_tier() {
        for tier in AgencyTier::ALL {
            let mut agency = Agency::new("a1", "Acme", "acme", tier);
            agency.is_active = false;
            let (resolver, _, _) = setup(vec![agency]);

            let err = resolver.resolve(&request("acme.example.com")).await.unwrap_err();
            assert_eq!(err.code(), "AGENCY_SUSPENDED", "tier {}", tier);
        }
    }

    #[tokio::test]
    async fn expired_trial_is_rejected() {
        let mut agency = Agency::new("a1", "Acme", "acme", AgencyTier::Trial);
        agency.trial_ends_at = Some(Utc::now() - ChronoDuration::days(1));
        let (resolver, _, _) = setup(vec![agency]);

        let err = resolver.resolve(&request("acme.example.com")).await.unwrap_err();
        assert_eq!(err.code(), "TRIAL_EXPIRED");
    }

    #[tokio::test]
    async fn trial_expiry_uses_injected_clock() {
        struct Fixed(DateTime<Utc>);
        impl Clock for Fixed {
            fn now(&self) -> DateTime<Utc> {
                self.0
            }
        }

        let ends_at = Utc::now();
        let mut agency = Agency::new("a1", "Acme", "acme", AgencyTier::Trial);
        agency.trial_ends_at = Some(ends_at);
        let (resolver, _, _) = setup(vec![agency]);

        let before = resolver
            .clone()
            .with_clock(Arc::new(Fixed(ends_at - ChronoDuration::hours(1))));
        assert!(before.resolve(&request("acme.example.com")).await.is_ok());

        let after = resolver.with_clock(Arc::new(Fixed(ends_at + ChronoDuration::hours(1))));
        let err = after.resolve(&request("acme.example.com")).await.unwrap_err();
        assert_eq!(err.code(), "TRIAL_EXPIRED");
    }

    #[tokio::test]
    async fn reserved_subdomains_proceed_without_tenant() {
        let (resolver, directory, _) = setup(vec![]);

        for host in ["api.example.com", "www.example.com", "example.com", "other.org"] {
            assert!(resolver.resolve(&request(host)).await.unwrap().is_none(), "{}", host);
        }
        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn header_resolves_by_id() {
        let (resolver, _, cache) = setup(vec![Agency::new("xyz", "Xyz", "xyz", AgencyTier::Enterprise)]);
        let mut req = request("api.example.com");
        req.agency_header = Some("xyz".to_string());

        let ctx = resolver.resolve(&req).await.unwrap().unwrap();

        assert_eq!(ctx.agency_id, "xyz");
        assert_eq!(ctx.subdomain, "header");
        assert_eq!(ctx.source, ResolutionSource::Header);
        assert!(cache.get("agency:id:xyz").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unknown_header_agency_is_not_found() {
        let (resolver, _, _) = setup(vec![]);
        let mut req = request("example.com");
        req.agency_header = Some("xyz".to_string());

        let err = resolver.resolve(&req).await.unwrap_err();
        assert_eq!(err.code(), "AGENCY_NOT_FOUND");
    }

    #[tokio::test]
    async fn subdomain_takes_precedence_over_header() {
        let (resolver, _, _) = setup(vec![
            Agency::new("a1", "Acme", "acme", AgencyTier::Starter),
            Agency::new("a2", "Globex", "globex", AgencyTier::Enterprise),
        ]);
        let mut req = request("acme.example.com");
        req.agency_header = Some("a2".to_string());

        let ctx = resolver.resolve(&req).await.unwrap().unwrap();
        assert_eq!(ctx.agency_id, "a1");
    }

    #[tokio::test]
    async fn authenticated_user_agency_is_used_last() {
        let (resolver, _, _) = setup(vec![Agency::new("a1", "Acme", "acme", AgencyTier::Starter)]);
        let mut req = request("www.example.com");
        req.user = Some(AuthenticatedUser {
            user_id: "u1".to_string(),
            agency_id: Some("a1".to_string()),
        });

        let ctx = resolver.resolve(&req).await.unwrap().unwrap();
        assert_eq!(ctx.source, ResolutionSource::User);
        assert_eq!(ctx.subdomain, "user");
    }

    #[tokio::test]
    async fn admin_subdomain_gets_master_context() {
        let (resolver, directory, _) = setup(vec![]);

        let ctx = resolver.resolve(&request("admin.example.com")).await.unwrap().unwrap();

        assert!(ctx.is_master());
        assert_eq!(ctx.agency_id, "master");
        assert_eq!(ctx.tier, AgencyTier::WhiteLabel);
        assert!(ctx.agency.is_none());
        assert!(ctx.is_active);
        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn skip_listed_paths_bypass_resolution() {
        let (resolver, directory, _) = setup(vec![]);
        let mut req = request("ghost.example.com");
        req.path = "/health".to_string();

        assert!(resolver.resolve(&req).await.unwrap().is_none());
        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn directory_failure_is_a_resolution_error() {
        let resolver = TenantResolver::new(
            BASE,
            Arc::new(FailingDirectory),
            Arc::new(InMemoryCache::new()),
        );

        let err = resolver.resolve(&request("acme.example.com")).await.unwrap_err();
        assert_eq!(err.code(), "AGENCY_RESOLUTION_ERROR");
    }

    #[tokio::test]
    async fn broken_cache_falls_back_to_directory() {
        let directory = Arc::new(InMemoryAgencyDirectory::new());
        directory.insert(Agency::new("a1", "Acme", "acme", AgencyTier::Starter));
        let resolver = TenantResolver::new(BASE, directory, Arc::new(BrokenCache));

        let ctx = resolver.resolve(&request("acme.example.com")).await.unwrap().unwrap();
        assert_eq!(ctx.agency_id, "a1");
    }

    #[tokio::test]
    async fn successful_resolution_is_logged() {
        let (resolver, _, cache) = setup(vec![Agency::new("a1", "Acme", "acme", AgencyTier::Starter)]);

        resolver.resolve(&request("acme.example.com")).await.unwrap();

        let logs = cache.list("access:logs:a1");
        assert_eq!(logs.len(), 1);
        let entry: AccessLogEntry = serde_json::from_str(&logs[0]).unwrap();
        assert_eq!(entry.path, "/api/projects");
        assert_eq!(entry.ip, "127.0.0.1");
    }

    #[tokio::test]
    async fn invalidation_forces_directory_lookup() {
        let agency = Agency::new("a1", "Acme", "acme", AgencyTier::Starter);
        let (resolver, directory, _) = setup(vec![agency.clone()]);

        resolver.resolve(&request("acme.example.com")).await.unwrap();
        resolver.invalidate_agency(&agency).await;
        resolver.resolve(&request("acme.example.com")).await.unwrap();

        assert_eq!(directory.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_all_clears_every_agency_key() {
        let (resolver, _, cache) = setup(vec![
            Agency::new("a1", "Acme", "acme", AgencyTier::Starter),
            Agency::new("a2", "Globex", "globex", AgencyTier::Starter),
        ]);
        resolver.resolve(&request("acme.example.com")).await.unwrap();
        resolver.resolve(&request("globex.example.com")).await.unwrap();

        assert_eq!(resolver.invalidate_all().await, 2);
        assert!(cache.is_empty());
    }
}
