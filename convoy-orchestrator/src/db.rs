use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Applications: one row per fleet, current_deployment = -1 until deployed
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS applications (
            id BIGSERIAL PRIMARY KEY,
            name VARCHAR(255) NOT NULL UNIQUE,
            instances TEXT[] NOT NULL DEFAULT '{}',
            current_deployment BIGINT NOT NULL DEFAULT -1,
            active BOOLEAN NOT NULL DEFAULT FALSE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Deployments are append-only; rows only disappear with a failed rollout
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS deployments (
            id BIGSERIAL PRIMARY KEY,
            app_id BIGINT NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
            command JSONB NOT NULL,
            creator VARCHAR(255) NOT NULL,
            date TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_deployments_app_date ON deployments(app_id, date DESC, id DESC)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
