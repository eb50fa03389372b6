//! Tenant resolution core: cache, directory, resolver and authorization gates.

pub mod access_log;
pub mod agency_cache;
pub mod authz;
pub mod cache;
mod database;
pub mod directory;
pub mod error;
pub mod metrics;
pub mod resolver;
pub mod subdomain;

pub use authz::{FeatureGate, LimitCheck, RoleGate};
pub use cache::{CacheStore, InMemoryCache, RedisCache};
pub use database::Database;
pub use directory::{
    AgencyDirectory, InMemoryAgencyDirectory, InMemoryMembershipDirectory, MembershipDirectory,
};
pub use error::{AuthzError, DirectoryError, ResolutionError};
pub use self::metrics::{get_metrics, init_metrics};
pub use resolver::{Clock, ResolutionRequest, SystemClock, TenantResolver};
