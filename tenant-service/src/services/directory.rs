//! Collaborator interfaces onto the agency system of record.
//!
//! The resolver and the role gate only see these traits. Postgres-backed
//! implementations live in [`super::database`]; the in-memory ones here back
//! local development and tests.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use super::error::DirectoryError;
use crate::models::Agency;

/// Agency lookup. Soft-deleted agencies are never returned.
#[async_trait]
pub trait AgencyDirectory: Send + Sync {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Agency>, DirectoryError>;
    async fn find_by_id(&self, agency_id: &str) -> Result<Option<Agency>, DirectoryError>;

    /// Whether any record, soft-deleted or not, holds `subdomain`.
    async fn subdomain_exists(&self, subdomain: &str) -> Result<bool, DirectoryError>;

    async fn health_check(&self) -> Result<(), DirectoryError> {
        Ok(())
    }
}

/// Role lookup for `(user, agency)` pairs.
///
/// Returns the raw stored role name; interpreting it is up to the role gate.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    async fn find_role(
        &self,
        user_id: &str,
        agency_id: &str,
    ) -> Result<Option<String>, DirectoryError>;
}

#[derive(Clone, Default)]
pub struct InMemoryAgencyDirectory {
    by_id: Arc<DashMap<String, Agency>>,
    deleted: Arc<DashMap<String, Agency>>,
}

impl InMemoryAgencyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, agency: Agency) {
        self.deleted.remove(&agency.id);
        self.by_id.insert(agency.id.clone(), agency);
    }

    pub fn remove(&self, agency_id: &str) -> Option<Agency> {
        self.deleted.remove(agency_id);
        self.by_id.remove(agency_id).map(|(_, agency)| agency)
    }

    /// Hide the agency from lookups while it keeps its subdomain.
    pub fn soft_delete(&self, agency_id: &str) -> bool {
        match self.by_id.remove(agency_id) {
            Some((id, agency)) => {
                self.deleted.insert(id, agency);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl AgencyDirectory for InMemoryAgencyDirectory {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Agency>, DirectoryError> {
        Ok(self
            .by_id
            .iter()
            .find(|entry| entry.subdomain == subdomain)
            .map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, agency_id: &str) -> Result<Option<Agency>, DirectoryError> {
        Ok(self.by_id.get(agency_id).map(|entry| entry.value().clone()))
    }

    async fn subdomain_exists(&self, subdomain: &str) -> Result<bool, DirectoryError> {
        Ok(self
            .by_id
            .iter()
            .chain(self.deleted.iter())
            .any(|entry| entry.subdomain == subdomain))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryMembershipDirectory {
    roles: Arc<DashMap<(String, String), String>>,
}

impl InMemoryMembershipDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&self, user_id: &str, agency_id: &str, role: impl Into<String>) {
        self.roles
            .insert((user_id.to_string(), agency_id.to_string()), role.into());
    }
}

#[async_trait]
impl MembershipDirectory for InMemoryMembershipDirectory {
    async fn find_role(
        &self,
        user_id: &str,
        agency_id: &str,
    ) -> Result<Option<String>, DirectoryError> {
        Ok(self
            .roles
            .get(&(user_id.to_string(), agency_id.to_string()))
            .map(|role| role.value().clone()))
    }
}
