pub mod health;
pub mod metrics;
pub mod subdomain;
pub mod tenant;

pub use health::{health_check, readiness_check};
pub use subdomain::subdomain_availability;
pub use tenant::{get_branding, get_features, get_limit, get_tenant, invalidate_cache};
