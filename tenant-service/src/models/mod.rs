mod agency;
mod context;
mod role;
mod tier;

pub use agency::{Agency, AgencyRow};
pub use context::{AuthenticatedUser, ResolutionSource, TenantContext, MASTER_AGENCY_ID};
pub use role::{role_level, Role};
pub use tier::{AgencyFeatures, AgencyTier, Feature, Resource, UNLIMITED};
