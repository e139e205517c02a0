//! Revert Resolver
//!
//! Finds the deployment a revert targets and redeploys it.

use convoy_core::domain::application::Application;
use convoy_core::domain::deployment::Deployment;

use super::deployment::do_deployment;
use super::{Result, ServiceError};
use crate::batch::ProgressSink;
use crate::repository::DeploymentRepository;
use crate::state::AppState;

/// Resolve a revert target for application `app_id`
///
/// A non-negative `target` is an absolute deployment id. A negative one walks
/// the application's deployments newest first, where index `0` is the most
/// recent deployment, and picks index `|target|`: `-1` is the deployment
/// before the most recent one.
pub async fn get_revert_deployment(
    deployments: &dyn DeploymentRepository,
    app_id: i64,
    target: i64,
) -> Result<Deployment> {
    if target >= 0 {
        let deployment = deployments
            .find_by_id(target)
            .await?
            .ok_or(ServiceError::UnknownDeployment(target))?;

        if deployment.app_id != app_id {
            return Err(ServiceError::DeploymentMismatch {
                deployment: deployment.id,
                application: app_id,
            });
        }

        return Ok(deployment);
    }

    let back = target.unsigned_abs();
    let limit = i64::try_from(back.saturating_add(1)).unwrap_or(i64::MAX);
    let history = deployments.list_by_application(app_id, Some(limit)).await?;

    if history.is_empty() {
        return Err(ServiceError::UnknownApplication(app_id.to_string()));
    }

    let available = history.len();
    usize::try_from(back)
        .ok()
        .and_then(|index| history.into_iter().nth(index))
        .ok_or(ServiceError::NotEnoughDeployments {
            requested: back,
            available,
        })
}

/// Redeploy `deployment` on every instance of `app` without starting it
///
/// The running container is force deleted and its replacement is left
/// created but stopped, while `active` keeps its previous value. An active
/// application therefore has to be started again once the revert succeeded.
///
/// Reverting to the current deployment changes nothing and succeeds.
/// Returns whether anything was redeployed.
pub async fn revert_application(
    state: &AppState,
    app: &Application,
    deployment: &Deployment,
    progress: &ProgressSink,
) -> Result<bool> {
    if deployment.id == app.current_deployment {
        tracing::info!(
            "Application {} already at deployment {}",
            app.name,
            deployment.id
        );
        return Ok(false);
    }

    tracing::info!(
        "Reverting {} from deployment {} to {}",
        app.name,
        app.current_deployment,
        deployment.id
    );
    do_deployment(state, app, deployment, &app.instances, false, false, progress).await?;

    Ok(true)
}
