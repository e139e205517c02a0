//! Application domain types

use serde::{Deserialize, Serialize};

use crate::domain::instance::InstanceSet;

/// Sentinel for an application that has never been deployed
pub const NO_DEPLOYMENT: i64 = -1;

/// A multi-container application deployed across a fleet of Docker hosts
///
/// Structure shared between orchestrator (persists) and client (renders).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    pub name: String,
    pub instances: InstanceSet,
    /// Deployment currently believed to be running, or [`NO_DEPLOYMENT`]
    pub current_deployment: i64,
    /// Whether the containers are believed to be running fleet-wide
    pub active: bool,
}

impl Application {
    pub fn has_deployment(&self) -> bool {
        self.current_deployment != NO_DEPLOYMENT
    }

    /// Container name used for the replacement container during a deployment
    pub fn staging_container(&self) -> String {
        format!("{}_tmp", self.name)
    }
}

/// Fleet-wide container state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Start,
    Stop,
}

impl ContainerState {
    /// State that undoes this one
    pub fn opposite(self) -> Self {
        match self {
            ContainerState::Start => ContainerState::Stop,
            ContainerState::Stop => ContainerState::Start,
        }
    }

    /// Docker endpoint verb for this transition
    pub fn as_str(self) -> &'static str {
        match self {
            ContainerState::Start => "start",
            ContainerState::Stop => "stop",
        }
    }

    /// Value of `Application::active` once this transition completes
    pub fn is_active(self) -> bool {
        matches!(self, ContainerState::Start)
    }
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
