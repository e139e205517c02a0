//! Application Repository
//!
//! Handles storage of applications: identity, instance list, current
//! deployment pointer and activity flag.

use async_trait::async_trait;
use convoy_core::domain::application::{Application, NO_DEPLOYMENT};
use convoy_core::domain::instance::InstanceSet;
use sqlx::PgPool;

use super::{RepositoryError, Result};

/// Storage operations for applications
///
/// Narrow updates report whether a row was touched so callers can detect an
/// application deleted underneath them.
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// Insert a new application; fails with `DuplicateKey` if the name is taken
    async fn create(&self, name: &str, instances: &InstanceSet) -> Result<Application>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Application>>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Application>>;

    /// All applications in ascending id order
    async fn list_all(&self) -> Result<Vec<Application>>;

    async fn set_instances(&self, id: i64, instances: &InstanceSet) -> Result<bool>;

    async fn set_current_deployment(&self, id: i64, deployment_id: i64) -> Result<bool>;

    async fn set_active(&self, id: i64, active: bool) -> Result<bool>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// Postgres-backed application repository
#[derive(Clone)]
pub struct PgApplicationRepository {
    pool: PgPool,
}

impl PgApplicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplicationRepository for PgApplicationRepository {
    async fn create(&self, name: &str, instances: &InstanceSet) -> Result<Application> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            r#"
            INSERT INTO applications (name, instances, current_deployment, active)
            VALUES ($1, $2, $3, FALSE)
            RETURNING id, name, instances, current_deployment, active
            "#,
        )
        .bind(name)
        .bind(instances.as_slice())
        .bind(NO_DEPLOYMENT)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::DuplicateKey(name.to_string())
            }
            other => RepositoryError::Database(other),
        })?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            r#"
            SELECT id, name, instances, current_deployment, active
            FROM applications
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            r#"
            SELECT id, name, instances, current_deployment, active
            FROM applications
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_all(&self) -> Result<Vec<Application>> {
        let rows = sqlx::query_as::<_, ApplicationRow>(
            r#"
            SELECT id, name, instances, current_deployment, active
            FROM applications
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn set_instances(&self, id: i64, instances: &InstanceSet) -> Result<bool> {
        let result = sqlx::query("UPDATE applications SET instances = $1 WHERE id = $2")
            .bind(instances.as_slice())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_current_deployment(&self, id: i64, deployment_id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE applications SET current_deployment = $1 WHERE id = $2")
            .bind(deployment_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_active(&self, id: i64, active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE applications SET active = $1 WHERE id = $2")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ApplicationRow {
    id: i64,
    name: String,
    instances: Vec<String>,
    current_deployment: i64,
    active: bool,
}

impl From<ApplicationRow> for Application {
    fn from(row: ApplicationRow) -> Self {
        Application {
            id: row.id,
            name: row.name,
            instances: row.instances.into(),
            current_deployment: row.current_deployment,
            active: row.active,
        }
    }
}
