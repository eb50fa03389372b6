//! PostgreSQL-backed agency and membership directory.

use async_trait::async_trait;
use sqlx::postgres::PgPool;

use super::directory::{AgencyDirectory, MembershipDirectory};
use super::error::DirectoryError;
use crate::models::{Agency, AgencyRow};

const AGENCY_COLUMNS: &str = "id, name, subdomain, slug, is_active, subscription_tier, \
     trial_ends_at, user_limit, agent_limit, storage_limit_mb, custom_domain, created_at";

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_agency(
        &self,
        column: &'static str,
        value: &str,
    ) -> Result<Option<Agency>, DirectoryError> {
        let sql = format!(
            "SELECT {} FROM agencies WHERE {} = $1 AND deleted_at IS NULL",
            AGENCY_COLUMNS, column
        );

        let row = sqlx::query_as::<_, AgencyRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Agency::try_from)
            .transpose()
            .map_err(DirectoryError::InvalidRecord)
    }
}

#[async_trait]
impl AgencyDirectory for Database {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Agency>, DirectoryError> {
        self.fetch_agency("subdomain", subdomain).await
    }

    async fn find_by_id(&self, agency_id: &str) -> Result<Option<Agency>, DirectoryError> {
        self.fetch_agency("id", agency_id).await
    }

    // No deleted_at filter: the unique constraint still covers deleted rows
    async fn subdomain_exists(&self, subdomain: &str) -> Result<bool, DirectoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM agencies WHERE subdomain = $1)",
        )
        .bind(subdomain)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn health_check(&self) -> Result<(), DirectoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl MembershipDirectory for Database {
    async fn find_role(
        &self,
        user_id: &str,
        agency_id: &str,
    ) -> Result<Option<String>, DirectoryError> {
        let role = sqlx::query_scalar::<_, String>(
            "SELECT role FROM agency_members WHERE user_id = $1 AND agency_id = $2",
        )
        .bind(user_id)
        .bind(agency_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;

    #[tokio::test]
    #[ignore] // Requires running PostgreSQL
    async fn test_unknown_subdomain_is_none() {
        let config = DatabaseConfig {
            url: "postgres://localhost/tenant_test".to_string(),
            max_connections: 5,
            min_connections: 1,
        };

        let pool = crate::db::create_pool(&config).await.unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        let db = Database::new(pool);

        let agency = db.find_by_subdomain("does-not-exist").await.unwrap();
        assert!(agency.is_none());
    }

    #[tokio::test]
    #[ignore] // Requires running PostgreSQL
    async fn test_soft_deleted_subdomain_still_exists() {
        let config = DatabaseConfig {
            url: "postgres://localhost/tenant_test".to_string(),
            max_connections: 5,
            min_connections: 1,
        };

        let pool = crate::db::create_pool(&config).await.unwrap();
        crate::db::run_migrations(&pool).await.unwrap();

        let id = format!("deleted-{}", std::process::id());
        sqlx::query(
            "INSERT INTO agencies \
             (id, name, subdomain, slug, user_limit, agent_limit, storage_limit_mb, deleted_at) \
             VALUES ($1, 'Gone', $1, $1, 3, 5, 1000, NOW())",
        )
        .bind(&id)
        .execute(&pool)
        .await
        .unwrap();

        let db = Database::new(pool);
        assert!(db.find_by_subdomain(&id).await.unwrap().is_none());
        assert!(db.subdomain_exists(&id).await.unwrap());

        sqlx::query("DELETE FROM agencies WHERE id = $1")
            .bind(&id)
            .execute(db.pool())
            .await
            .unwrap();
    }
}
