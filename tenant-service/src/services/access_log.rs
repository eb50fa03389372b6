//! Per-agency access log kept in the cache for real-time analytics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cache::CacheStore;

/// Entries kept per agency.
pub const ACCESS_LOG_CAPACITY: usize = 1000;

pub fn access_log_key(agency_id: &str) -> String {
    format!("access:logs:{}", agency_id)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub agency_id: String,
    pub subdomain: String,
    pub path: String,
    pub method: String,
    pub user_agent: Option<String>,
    pub ip: String,
    pub timestamp: DateTime<Utc>,
}

/// Record an access. Failures are logged and never surface to the request.
pub async fn record_access(store: &dyn CacheStore, entry: &AccessLogEntry) {
    let payload = match serde_json::to_string(entry) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "Error encoding tenant access log entry");
            return;
        }
    };

    if let Err(e) = store
        .push_capped(&access_log_key(&entry.agency_id), &payload, ACCESS_LOG_CAPACITY)
        .await
    {
        tracing::error!(agency_id = %entry.agency_id, error = %e, "Error logging tenant access");
    }
}
