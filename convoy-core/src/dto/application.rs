//! Application DTOs

use serde::{Deserialize, Serialize};

use crate::domain::instance::InstanceSet;

/// Request to create an application and deploy its first command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApplication {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub instances: InstanceSet,
    /// Body of the Docker `containers/create` call
    #[serde(default)]
    pub command: serde_json::Value,
    /// Pull the command's image on every instance before creating containers
    #[serde(default)]
    pub force_pull: bool,
}

/// Request to change an application's instances and/or command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateApplication {
    #[serde(default)]
    pub add: InstanceSet,
    #[serde(default)]
    pub remove: InstanceSet,
    /// New launch command; a new deployment is recorded only when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<serde_json::Value>,
    /// Redeploy the whole fleet even without a new command
    #[serde(default)]
    pub restart: bool,
    #[serde(default)]
    pub force_pull: bool,
}

impl UpdateApplication {
    /// Whether the request asks for anything at all
    pub fn is_noop(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty() && self.command.is_none() && !self.restart
    }
}

/// Query string of `PUT /revert/{id}`
///
/// A non-negative target is an absolute deployment id; a negative one counts
/// back from the most recent deployment.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RevertQuery {
    pub target: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_update_is_noop() {
        let req: UpdateApplication = serde_json::from_str("{}").unwrap();
        assert!(req.is_noop());
    }

    #[test]
    fn test_restart_is_not_noop() {
        let req: UpdateApplication = serde_json::from_str(r#"{"restart": true}"#).unwrap();
        assert!(!req.is_noop());
    }

    #[test]
    fn test_revert_query_target_is_optional() {
        let query: RevertQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.target, None);

        let query: RevertQuery = serde_json::from_str(r#"{"target": -2}"#).unwrap();
        assert_eq!(query.target, Some(-2));
    }
}
