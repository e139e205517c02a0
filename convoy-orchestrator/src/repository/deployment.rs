//! Deployment Repository
//!
//! Append-only log of deployments per application.

use async_trait::async_trait;
use convoy_core::domain::command::ContainerCommand;
use convoy_core::domain::deployment::Deployment;
use sqlx::PgPool;

use super::{RepositoryError, Result};

/// Storage operations for deployments
#[async_trait]
pub trait DeploymentRepository: Send + Sync {
    async fn create(
        &self,
        app_id: i64,
        command: &ContainerCommand,
        creator: &str,
    ) -> Result<Deployment>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Deployment>>;

    /// Deployments of an application, newest first, optionally limited
    async fn list_by_application(&self, app_id: i64, limit: Option<i64>)
    -> Result<Vec<Deployment>>;

    /// Only used to undo a deployment whose rollout failed
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// Postgres-backed deployment repository
#[derive(Clone)]
pub struct PgDeploymentRepository {
    pool: PgPool,
}

impl PgDeploymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeploymentRepository for PgDeploymentRepository {
    async fn create(
        &self,
        app_id: i64,
        command: &ContainerCommand,
        creator: &str,
    ) -> Result<Deployment> {
        let row = sqlx::query_as::<_, DeploymentRow>(
            r#"
            INSERT INTO deployments (app_id, command, creator, date)
            VALUES ($1, $2, $3, $4)
            RETURNING id, app_id, command, creator, date
            "#,
        )
        .bind(app_id)
        .bind(command.as_value())
        .bind(creator)
        .bind(chrono::Utc::now())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Deployment>> {
        let row = sqlx::query_as::<_, DeploymentRow>(
            r#"
            SELECT id, app_id, command, creator, date
            FROM deployments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Deployment::try_from).transpose()
    }

    async fn list_by_application(
        &self,
        app_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Deployment>> {
        // A NULL limit means no limit in Postgres
        let rows = sqlx::query_as::<_, DeploymentRow>(
            r#"
            SELECT id, app_id, command, creator, date
            FROM deployments
            WHERE app_id = $1
            ORDER BY date DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(app_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Deployment::try_from).collect()
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM deployments WHERE id = $1")
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
struct DeploymentRow {
    id: i64,
    app_id: i64,
    command: serde_json::Value,
    creator: String,
    date: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<DeploymentRow> for Deployment {
    type Error = RepositoryError;

    fn try_from(row: DeploymentRow) -> Result<Self> {
        let command = ContainerCommand::try_from(row.command)
            .map_err(|e| RepositoryError::InvalidRow(format!("deployment {}: {}", row.id, e)))?;

        Ok(Deployment {
            id: row.id,
            app_id: row.app_id,
            command,
            creator: row.creator,
            date: row.date,
        })
    }
}
