//! Service errors
//!
//! One error type for every use case. The API layer maps each variant onto
//! exactly one HTTP status.

use convoy_core::domain::application::ContainerState;
use convoy_core::domain::command::CommandError;
use convoy_core::domain::instance::InstanceSet;
use thiserror::Error;

use crate::repository::RepositoryError;

/// Service error type
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unknown application `{0}`")]
    UnknownApplication(String),

    #[error("unknown deployment {0}")]
    UnknownDeployment(i64),

    #[error("deployment {deployment} does not belong to application {application}")]
    DeploymentMismatch { deployment: i64, application: i64 },

    #[error("requested deployment {requested} back but only {available} deployment(s) exist")]
    NotEnoughDeployments { requested: u64, available: usize },

    #[error("image `{image}` could not be pulled on any instance")]
    ImageNotPulled { image: String },

    #[error("missing or invalid parameter: {0}")]
    NotEnoughParameters(String),

    #[error("invalid command: {0}")]
    InvalidCommand(#[from] CommandError),

    #[error("not allowed to modify application `{0}`")]
    ApplicationPermission(String),

    #[error("application `{0}` already exists")]
    DuplicateKey(String),

    #[error("no rows updated for application `{0}`")]
    NoRowsUpdated(String),

    #[error("application `{name}` is already in state `{state}`")]
    StateNotChanged { name: String, state: ContainerState },

    #[error("deployment failed on {}", join(.failed))]
    DeploymentFailed {
        /// Instances whose container was replaced before the failure surfaced
        replaced: InstanceSet,
        failed: InstanceSet,
    },

    #[error("{state} failed on {}, fleet rolled back", join(.failed))]
    StateChangeFailed {
        state: ContainerState,
        failed: InstanceSet,
    },

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateKey(name) => ServiceError::DuplicateKey(name),
            other => ServiceError::Repository(other),
        }
    }
}

fn join(instances: &InstanceSet) -> String {
    instances.as_slice().join(", ")
}

pub type Result<T> = std::result::Result<T, ServiceError>;
