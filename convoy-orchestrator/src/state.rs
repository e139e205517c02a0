//! Shared application state handed to every handler

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

use crate::batch::BatchProcessor;
use crate::repository::{ApplicationRepository, DeploymentRepository};
use crate::service::PermissionOracle;

#[derive(Clone)]
pub struct AppState {
    pub applications: Arc<dyn ApplicationRepository>,
    pub deployments: Arc<dyn DeploymentRepository>,
    pub permissions: Arc<dyn PermissionOracle>,
    pub batch: BatchProcessor,
    pub locks: ApplicationLocks,
    /// Header carrying the authenticated caller's email
    pub user_header: String,
}

/// One async mutex per application id
///
/// Orchestrations on the same application run one at a time; different
/// applications never wait on each other.
#[derive(Clone, Default)]
pub struct ApplicationLocks {
    inner: Arc<Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>>,
}

impl ApplicationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other orchestration holds `app_id`
    ///
    /// Entries nobody holds or waits on are pruned first, so the map only
    /// tracks applications with an orchestration in flight.
    pub async fn acquire(&self, app_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(app_id).or_default())
        };

        lock.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> Vec<i64> {
        let locks = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<i64> = locks.keys().copied().collect();
        ids.sort();
        ids
    }
}
