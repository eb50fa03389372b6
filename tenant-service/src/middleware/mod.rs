pub mod authz;
pub mod tenant;
pub mod user;

pub use authz::{require_admin, require_manager, require_roles, require_user, require_viewer, MemberRole};
pub use tenant::{client_ip, tenant_resolution_middleware, AGENCY_ID_HEADER};
pub use user::{user_context_middleware, USER_AGENCY_ID_HEADER, USER_ID_HEADER};
