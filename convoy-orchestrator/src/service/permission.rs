//! Permissions
//!
//! Boolean oracle deciding whether a caller may view or modify an
//! application, keyed by application name.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use crate::repository::{ApplicationRepository, DeploymentRepository};

/// Caller of a request, identified by email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub email: String,
}

impl CurrentUser {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

#[async_trait]
pub trait PermissionOracle: Send + Sync {
    async fn can_view(&self, user: &CurrentUser, application: &str) -> bool;

    async fn can_modify(&self, user: &CurrentUser, application: &str) -> bool;

    /// Record `user` as owner of a newly created application
    async fn grant_owner(&self, user: &CurrentUser, application: &str);

    /// Forget every grant on an application that no longer exists
    async fn revoke(&self, application: &str);
}

/// Everybody may do everything
///
/// Used when no administrators are configured.
pub struct OpenPermissions;

#[async_trait]
impl PermissionOracle for OpenPermissions {
    async fn can_view(&self, _user: &CurrentUser, _application: &str) -> bool {
        true
    }

    async fn can_modify(&self, _user: &CurrentUser, _application: &str) -> bool {
        true
    }

    async fn grant_owner(&self, _user: &CurrentUser, _application: &str) {}

    async fn revoke(&self, _application: &str) {}
}

/// Owner-based permissions
///
/// Admins view and modify everything, viewers see everything, and every
/// other user sees and modifies the applications they own.
pub struct OwnerPermissions {
    admins: HashSet<String>,
    viewers: HashSet<String>,
    owners: RwLock<HashMap<String, String>>,
}

impl OwnerPermissions {
    pub fn new(
        admins: impl IntoIterator<Item = String>,
        viewers: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            admins: admins.into_iter().collect(),
            viewers: viewers.into_iter().collect(),
            owners: RwLock::new(HashMap::new()),
        }
    }

    /// Restore ownership from the registry
    ///
    /// The creator of an application's oldest deployment is its owner.
    pub async fn seed(
        &self,
        applications: &dyn ApplicationRepository,
        deployments: &dyn DeploymentRepository,
    ) -> crate::repository::Result<usize> {
        let mut owners = self.owners.write().await;
        for app in applications.list_all().await? {
            let history = deployments.list_by_application(app.id, None).await?;
            if let Some(first) = history.last() {
                owners.insert(app.name, first.creator.clone());
            }
        }

        Ok(owners.len())
    }

    fn is_admin(&self, user: &CurrentUser) -> bool {
        self.admins.contains(&user.email)
    }

    async fn is_owner(&self, user: &CurrentUser, application: &str) -> bool {
        self.owners
            .read()
            .await
            .get(application)
            .is_some_and(|owner| *owner == user.email)
    }
}

#[async_trait]
impl PermissionOracle for OwnerPermissions {
    async fn can_view(&self, user: &CurrentUser, application: &str) -> bool {
        self.is_admin(user)
            || self.viewers.contains(&user.email)
            || self.is_owner(user, application).await
    }

    async fn can_modify(&self, user: &CurrentUser, application: &str) -> bool {
        self.is_admin(user) || self.is_owner(user, application).await
    }

    async fn grant_owner(&self, user: &CurrentUser, application: &str) {
        self.owners
            .write()
            .await
            .insert(application.to_string(), user.email.clone());
    }

    async fn revoke(&self, application: &str) {
        self.owners.write().await.remove(application);
    }
}
