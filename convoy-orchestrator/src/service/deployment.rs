//! Deployment Orchestrator
//!
//! Rolls a deployment out to a set of instances:
//!
//! 1. pull the image (optional)
//! 2. create `<app>_tmp` from the deployment's command
//! 3. force-delete the previous `<app>` container
//! 4. rename `<app>_tmp` to `<app>`
//! 5. start `<app>` (optional)
//!
//! Each step is one batch over the instances that survived the previous
//! step. Instances failing step 3 or 4 have their staging container removed
//! before the failure is reported. The registry is only touched when every
//! instance that began step 2 finished the last requested step.

use convoy_core::domain::application::{Application, ContainerState};
use convoy_core::domain::deployment::Deployment;
use convoy_core::domain::instance::InstanceSet;

use super::{Result, ServiceError};
use crate::batch::{ProgressSink, default_classifier, missing_ok_classifier};
use crate::state::AppState;
use crate::transport::docker;

/// Deploy `deployment` of `app` on `targets`
///
/// On full success the application's current deployment is moved to
/// `deployment` and, when `start` is set, it is marked active.
pub async fn do_deployment(
    state: &AppState,
    app: &Application,
    deployment: &Deployment,
    targets: &InstanceSet,
    start: bool,
    force_pull: bool,
    progress: &ProgressSink,
) -> Result<()> {
    tracing::info!(
        "Deploying {} (deployment {}) on {} instance(s)",
        app.name,
        deployment.id,
        targets.len()
    );

    let mut working = targets.clone();

    if force_pull {
        working = pull(state, deployment, working, progress).await?;
    }

    let staging = app.staging_container();
    let mut failed: Vec<String> = Vec::new();

    let created = state
        .batch
        .execute(
            "create",
            &working,
            &[docker::create_container(&staging, &deployment.command)],
            default_classifier,
            progress,
        )
        .await;
    failed.extend(created.failed.into_vec());

    // No previous container on a first deployment is fine
    let cleared = state
        .batch
        .execute(
            "remove previous",
            &created.succeeded,
            &[docker::remove_container(&app.name)],
            missing_ok_classifier,
            progress,
        )
        .await;
    discard_staging(state, &staging, &cleared.failed, progress).await;
    failed.extend(cleared.failed.into_vec());

    let renamed = state
        .batch
        .execute(
            "rename",
            &cleared.succeeded,
            &[docker::rename_container(&staging, &app.name)],
            default_classifier,
            progress,
        )
        .await;
    discard_staging(state, &staging, &renamed.failed, progress).await;
    failed.extend(renamed.failed.into_vec());

    let replaced = renamed.succeeded;

    if start {
        let started = state
            .batch
            .execute(
                "start",
                &replaced,
                &[docker::set_state(&app.name, ContainerState::Start)],
                default_classifier,
                progress,
            )
            .await;
        failed.extend(started.failed.into_vec());
    }

    if !failed.is_empty() {
        tracing::warn!(
            "Deployment {} of {} failed on {} of {} instance(s)",
            deployment.id,
            app.name,
            failed.len(),
            working.len()
        );
        return Err(ServiceError::DeploymentFailed {
            replaced,
            failed: failed.into(),
        });
    }

    if !state
        .applications
        .set_current_deployment(app.id, deployment.id)
        .await?
    {
        return Err(ServiceError::NoRowsUpdated(app.name.clone()));
    }

    if start && !state.applications.set_active(app.id, true).await? {
        return Err(ServiceError::NoRowsUpdated(app.name.clone()));
    }

    tracing::info!(
        "Application {} now at deployment {}",
        app.name,
        deployment.id
    );

    Ok(())
}

/// Pull the deployment's image, keeping only the instances that got it
async fn pull(
    state: &AppState,
    deployment: &Deployment,
    working: InstanceSet,
    progress: &ProgressSink,
) -> Result<InstanceSet> {
    let image = deployment.command.image()?;

    let report = state
        .batch
        .execute(
            "pull",
            &working,
            &[docker::pull_image(image)],
            default_classifier,
            progress,
        )
        .await;

    if report.succeeded.is_empty() && !working.is_empty() {
        return Err(ServiceError::ImageNotPulled {
            image: image.to_string(),
        });
    }

    if !report.failed.is_empty() {
        tracing::warn!(
            "Image {} not pulled on {} instance(s), continuing without them",
            image,
            report.failed.len()
        );
    }

    Ok(report.succeeded)
}

async fn discard_staging(
    state: &AppState,
    staging: &str,
    instances: &InstanceSet,
    progress: &ProgressSink,
) {
    if instances.is_empty() {
        return;
    }

    tracing::warn!(
        "Removing {} from {} instance(s) after a failed step",
        staging,
        instances.len()
    );
    state
        .batch
        .execute(
            "discard staging",
            instances,
            &[docker::remove_container(staging)],
            missing_ok_classifier,
            progress,
        )
        .await;
}

/// Force-remove the application container from `instances`, best effort
pub async fn remove_containers(
    state: &AppState,
    app: &Application,
    instances: &InstanceSet,
    progress: &ProgressSink,
) {
    if instances.is_empty() {
        return;
    }

    let report = state
        .batch
        .execute(
            "remove",
            instances,
            &[docker::remove_container(&app.name)],
            missing_ok_classifier,
            progress,
        )
        .await;

    if !report.is_complete() {
        tracing::warn!(
            "Container {} left behind on {} instance(s)",
            app.name,
            report.failed.len()
        );
    }
}
