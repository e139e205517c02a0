//! Repository Module
//!
//! Data access layer for the orchestrator.
//! Each repository handles storage for a specific domain entity. Repositories
//! are trait-based so the service layer runs against Postgres in production
//! and against the in-memory store in tests or database-less runs.

pub mod application;
pub mod deployment;
pub mod memory;

use thiserror::Error;

// Re-export for convenience
pub use application::{ApplicationRepository, PgApplicationRepository};
pub use deployment::{DeploymentRepository, PgDeploymentRepository};
pub use memory::{InMemoryApplicationRepository, InMemoryDeploymentRepository};

/// Repository error type
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("stored row is invalid: {0}")]
    InvalidRow(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
