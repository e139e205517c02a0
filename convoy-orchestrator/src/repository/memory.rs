//! In-memory repositories
//!
//! Same contract as the Postgres repositories, kept behind a tokio `RwLock`.
//! Used when no `DATABASE_URL` is configured and as fixtures in tests.

use async_trait::async_trait;
use convoy_core::domain::application::{Application, NO_DEPLOYMENT};
use convoy_core::domain::command::ContainerCommand;
use convoy_core::domain::deployment::Deployment;
use convoy_core::domain::instance::InstanceSet;
use tokio::sync::RwLock;

use super::{ApplicationRepository, DeploymentRepository, RepositoryError, Result};

struct Table<T> {
    rows: Vec<T>,
    next_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// In-memory application repository
#[derive(Default)]
pub struct InMemoryApplicationRepository {
    table: RwLock<Table<Application>>,
}

impl InMemoryApplicationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update<F>(&self, id: i64, apply: F) -> Result<bool>
    where
        F: FnOnce(&mut Application) + Send,
    {
        let mut table = self.table.write().await;
        match table.rows.iter_mut().find(|a| a.id == id) {
            Some(app) => {
                apply(app);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ApplicationRepository for InMemoryApplicationRepository {
    async fn create(&self, name: &str, instances: &InstanceSet) -> Result<Application> {
        let mut table = self.table.write().await;
        if table.rows.iter().any(|a| a.name == name) {
            return Err(RepositoryError::DuplicateKey(name.to_string()));
        }

        let app = Application {
            id: table.allocate_id(),
            name: name.to_string(),
            instances: instances.clone(),
            current_deployment: NO_DEPLOYMENT,
            active: false,
        };
        table.rows.push(app.clone());

        Ok(app)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Application>> {
        let table = self.table.read().await;
        Ok(table.rows.iter().find(|a| a.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Application>> {
        let table = self.table.read().await;
        Ok(table.rows.iter().find(|a| a.name == name).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Application>> {
        Ok(self.table.read().await.rows.clone())
    }

    async fn set_instances(&self, id: i64, instances: &InstanceSet) -> Result<bool> {
        let instances = instances.clone();
        self.update(id, move |app| app.instances = instances).await
    }

    async fn set_current_deployment(&self, id: i64, deployment_id: i64) -> Result<bool> {
        self.update(id, move |app| app.current_deployment = deployment_id)
            .await
    }

    async fn set_active(&self, id: i64, active: bool) -> Result<bool> {
        self.update(id, move |app| app.active = active).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut table = self.table.write().await;
        let before = table.rows.len();
        table.rows.retain(|a| a.id != id);
        Ok(table.rows.len() < before)
    }
}

/// In-memory deployment repository
#[derive(Default)]
pub struct InMemoryDeploymentRepository {
    table: RwLock<Table<Deployment>>,
}

impl InMemoryDeploymentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeploymentRepository for InMemoryDeploymentRepository {
    async fn create(
        &self,
        app_id: i64,
        command: &ContainerCommand,
        creator: &str,
    ) -> Result<Deployment> {
        let mut table = self.table.write().await;
        let deployment = Deployment {
            id: table.allocate_id(),
            app_id,
            command: command.clone(),
            creator: creator.to_string(),
            date: chrono::Utc::now(),
        };
        table.rows.push(deployment.clone());

        Ok(deployment)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Deployment>> {
        let table = self.table.read().await;
        Ok(table.rows.iter().find(|d| d.id == id).cloned())
    }

    async fn list_by_application(
        &self,
        app_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Deployment>> {
        let table = self.table.read().await;
        let mut rows: Vec<Deployment> = table
            .rows
            .iter()
            .filter(|d| d.app_id == app_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));

        if let Some(limit) = limit {
            rows.truncate(usize::try_from(limit).unwrap_or(0));
        }

        Ok(rows)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let mut table = self.table.write().await;
        let before = table.rows.len();
        table.rows.retain(|d| d.id != id);
        Ok(table.rows.len() < before)
    }
}
