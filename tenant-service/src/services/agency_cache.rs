//! Typed agency records in the shared cache.

use metrics::counter;
use std::sync::Arc;
use std::time::Duration;

use super::cache::CacheStore;
use crate::models::Agency;

/// TTL of cached agency resolutions.
pub const AGENCY_CACHE_TTL: Duration = Duration::from_secs(300);

pub const AGENCY_KEY_PREFIX: &str = "agency:";

pub fn subdomain_key(subdomain: &str) -> String {
    format!("agency:subdomain:{}", subdomain)
}

pub fn id_key(agency_id: &str) -> String {
    format!("agency:id:{}", agency_id)
}

/// Typed, failure-tolerant view of the cache for agency records.
///
/// Backend errors are logged and degrade to a miss or a no-op; they never
/// reach the resolver.
#[derive(Clone)]
pub struct AgencyCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl AgencyCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            ttl: AGENCY_CACHE_TTL,
        }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub async fn get(&self, key: &str) -> Option<Agency> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                counter!("tenant_cache_lookups_total", "result" => "miss").increment(1);
                return None;
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, falling back to directory");
                counter!("tenant_cache_lookups_total", "result" => "error").increment(1);
                return None;
            }
        };

        match serde_json::from_str::<Agency>(&raw) {
            Ok(agency) => {
                counter!("tenant_cache_lookups_total", "result" => "hit").increment(1);
                Some(agency)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                counter!("tenant_cache_lookups_total", "result" => "corrupt").increment(1);
                self.evict(key).await;
                None
            }
        }
    }

    pub async fn put(&self, key: &str, agency: &Agency) {
        let raw = match serde_json::to_string(agency) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to encode agency for cache");
                return;
            }
        };

        if let Err(e) = self.store.set(key, &raw, self.ttl).await {
            tracing::warn!(key = %key, error = %e, "Cache write failed");
        }
    }

    pub async fn evict(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            tracing::warn!(key = %key, error = %e, "Cache delete failed");
        }
    }

    pub async fn evict_prefix(&self, prefix: &str) -> u64 {
        match self.store.delete_pattern(prefix).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(prefix = %prefix, error = %e, "Cache pattern delete failed");
                0
            }
        }
    }
}
