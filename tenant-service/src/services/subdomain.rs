//! Host parsing and subdomain policy.
//!
//! Two reserved lists are kept on purpose: a short one that is never resolved
//! to a real agency, and a longer one that is refused when an agency claims a
//! subdomain.

use serde::Serialize;

use super::directory::AgencyDirectory;
use super::error::DirectoryError;

/// Subdomains that never resolve to an agency.
pub const RESOLUTION_RESERVED: [&str; 4] = ["www", "api", "admin", "app"];

/// Subdomains served with the synthetic master context.
pub const MASTER_SUBDOMAINS: [&str; 2] = ["app", "admin"];

/// Subdomains an agency may not claim.
pub const CREATION_RESERVED: [&str; 21] = [
    "www", "api", "admin", "app", "mail", "email", "smtp", "ftp", "blog", "forum", "shop",
    "store", "support", "help", "docs", "staging", "test", "dev", "demo", "beta", "alpha",
];

/// Path prefixes that bypass tenant resolution entirely.
pub const SKIP_PATH_PREFIXES: [&str; 7] = [
    "/health",
    "/metrics",
    "/api/master",
    "/api/auth/master",
    "/webhook",
    "/static",
    "/public",
];

/// Extract the subdomain label(s) in front of `base_domain`.
///
/// Returns `None` when the host is the base domain itself or lies outside it.
pub fn extract_subdomain(host: &str, base_domain: &str) -> Option<String> {
    let host = host.split(':').next().unwrap_or_default().trim().to_lowercase();
    let base = base_domain.trim().trim_start_matches('.').to_lowercase();
    if base.is_empty() {
        return None;
    }

    let subdomain = host.strip_suffix(&base)?.strip_suffix('.')?;
    if subdomain.is_empty() {
        None
    } else {
        Some(subdomain.to_string())
    }
}

pub fn should_skip_resolution(path: &str) -> bool {
    SKIP_PATH_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

pub fn is_resolution_reserved(subdomain: &str) -> bool {
    RESOLUTION_RESERVED.contains(&subdomain)
}

pub fn is_master_subdomain(subdomain: &str) -> bool {
    MASTER_SUBDOMAINS.contains(&subdomain)
}

pub fn is_creation_reserved(subdomain: &str) -> bool {
    CREATION_RESERVED.contains(&subdomain.to_lowercase().as_str())
}

/// 3 to 63 characters of `[a-z0-9-]`, not starting or ending with a hyphen.
pub fn is_valid_format(subdomain: &str) -> bool {
    let len = subdomain.len();
    (3..=63).contains(&len)
        && subdomain
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !subdomain.starts_with('-')
        && !subdomain.ends_with('-')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubdomainAvailability {
    Available,
    InvalidFormat,
    Reserved,
    Taken,
}

/// Whether a new agency could claim `subdomain`.
pub async fn check_availability(
    directory: &dyn AgencyDirectory,
    subdomain: &str,
) -> Result<SubdomainAvailability, DirectoryError> {
    if !is_valid_format(subdomain) {
        return Ok(SubdomainAvailability::InvalidFormat);
    }
    if is_creation_reserved(subdomain) {
        return Ok(SubdomainAvailability::Reserved);
    }
    if directory.subdomain_exists(subdomain).await? {
        return Ok(SubdomainAvailability::Taken);
    }
    Ok(SubdomainAvailability::Available)
}
