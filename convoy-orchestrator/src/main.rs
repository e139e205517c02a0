//! Convoy Orchestrator
//!
//! Control plane for multi-container applications spread over a fleet of
//! Docker hosts.
//!
//! Architecture:
//! - API: axum handlers, progress streamed as NDJSON
//! - Services: creation, update, start/stop and revert orchestrations
//! - Batch: concurrent fan-out of Docker Engine calls to every instance
//! - Transport: reqwest client routed through beacons when configured
//! - Repositories: Postgres, or in memory when no database is configured

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod batch;
pub mod config;
pub mod db;
pub mod repository;
pub mod service;
pub mod state;
pub mod transport;

use crate::batch::BatchProcessor;
use crate::config::Config;
use crate::repository::{
    ApplicationRepository, DeploymentRepository, InMemoryApplicationRepository,
    InMemoryDeploymentRepository, PgApplicationRepository, PgDeploymentRepository,
};
use crate::service::{OpenPermissions, OwnerPermissions, PermissionOracle};
use crate::state::{AppState, ApplicationLocks};
use crate::transport::{HttpTransport, StaticBeaconResolver};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "convoy_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Convoy Orchestrator...");

    let config = Config::from_env()?;
    config.validate().context("Invalid configuration")?;

    let (applications, deployments) = open_stores(&config).await?;
    let permissions = build_permissions(&config, &*applications, &*deployments).await?;

    let resolver = StaticBeaconResolver::new(
        config
            .beacons
            .iter()
            .map(|b| (b.instance.clone(), b.address.clone(), b.token.clone())),
    );
    tracing::info!("{} instance(s) routed through beacons", resolver.len());

    let transport = HttpTransport::new(
        config.request_timeout,
        Arc::new(resolver),
        config.docker_api_version.clone(),
        config.beacon_token_header.clone(),
    )
    .context("Failed to build HTTP transport")?;

    let state = AppState {
        applications,
        deployments,
        permissions,
        batch: BatchProcessor::new(Arc::new(transport)),
        locks: ApplicationLocks::new(),
        user_header: config.user_header.clone(),
    };

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}

async fn open_stores(
    config: &Config,
) -> Result<(Arc<dyn ApplicationRepository>, Arc<dyn DeploymentRepository>)> {
    let Some(database_url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set, state is kept in memory and lost on restart");
        return Ok((
            Arc::new(InMemoryApplicationRepository::new()),
            Arc::new(InMemoryDeploymentRepository::new()),
        ));
    };

    tracing::info!("Connecting to database...");

    // Create database connection pool
    let pool = db::create_pool(database_url)
        .await
        .context("Failed to create database pool")?;

    tracing::info!("Database connection pool created");

    // Run migrations
    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok((
        Arc::new(PgApplicationRepository::new(pool.clone())),
        Arc::new(PgDeploymentRepository::new(pool)),
    ))
}

async fn build_permissions(
    config: &Config,
    applications: &dyn ApplicationRepository,
    deployments: &dyn DeploymentRepository,
) -> Result<Arc<dyn PermissionOracle>> {
    if !config.restricts_access() {
        tracing::warn!("No admins or viewers configured, every caller may modify every application");
        return Ok(Arc::new(OpenPermissions));
    }

    let permissions = OwnerPermissions::new(config.admins.clone(), config.viewers.clone());
    let owned = permissions
        .seed(applications, deployments)
        .await
        .context("Failed to restore application owners")?;
    tracing::info!(
        "{} admin(s), {} viewer(s), {} owned application(s)",
        config.admins.len(),
        config.viewers.len(),
        owned
    );

    Ok(Arc::new(permissions))
}
