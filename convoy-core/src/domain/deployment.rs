//! Deployment domain types

use serde::{Deserialize, Serialize};

use crate::domain::command::ContainerCommand;

/// One immutable recorded container-launch command of an application
///
/// Reverting never creates a row; it moves `Application::current_deployment`
/// to an existing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: i64,
    pub app_id: i64,
    pub command: ContainerCommand,
    pub creator: String,
    pub date: chrono::DateTime<chrono::Utc>,
}
