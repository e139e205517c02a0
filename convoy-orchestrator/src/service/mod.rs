//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services drive the batch processor and the repositories; handlers only
//! translate HTTP to service calls.

pub mod application;
pub mod deployment;
pub mod error;
pub mod instances;
pub mod permission;
pub mod revert;
pub mod toggle;

// Re-export for convenience
pub use application as application_service;
pub use error::{Result, ServiceError};
pub use permission::{CurrentUser, OpenPermissions, OwnerPermissions, PermissionOracle};
