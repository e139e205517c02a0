//! Application Service
//!
//! Use cases over applications: lookup with permission filtering, creation,
//! update, and the locking that serializes orchestrations per application.

use convoy_core::domain::application::Application;
use convoy_core::domain::command::ContainerCommand;
use convoy_core::domain::deployment::Deployment;
use convoy_core::domain::instance::InstanceSet;
use convoy_core::dto::application::{CreateApplication, UpdateApplication};
use tokio::sync::OwnedMutexGuard;

use super::deployment::{do_deployment, remove_containers};
use super::instances::{InstanceChanges, apply_changes};
use super::permission::CurrentUser;
use super::{Result, ServiceError};
use crate::batch::ProgressSink;
use crate::state::AppState;

const MAX_NAME_LENGTH: usize = 255;

/// Validated creation request
#[derive(Debug, Clone)]
pub struct CreatePlan {
    pub name: String,
    pub instances: InstanceSet,
    pub command: ContainerCommand,
    pub force_pull: bool,
}

/// Validated, non-empty update request
#[derive(Debug, Clone)]
pub struct UpdatePlan {
    pub changes: InstanceChanges,
    pub command: Option<ContainerCommand>,
    pub restart: bool,
    pub force_pull: bool,
}

/// Look an application up by id, falling back to its name
pub async fn resolve_application(state: &AppState, identifier: &str) -> Result<Application> {
    let found = match identifier.parse::<i64>() {
        Ok(id) => state.applications.find_by_id(id).await?,
        Err(_) => None,
    };

    let found = match found {
        Some(app) => Some(app),
        None => state.applications.find_by_name(identifier).await?,
    };

    found.ok_or_else(|| ServiceError::UnknownApplication(identifier.to_string()))
}

/// Resolve an application the caller may view
///
/// Unviewable applications are reported as unknown so their existence is
/// not confirmed.
pub async fn get_application(
    state: &AppState,
    user: &CurrentUser,
    identifier: &str,
) -> Result<Application> {
    let app = resolve_application(state, identifier).await?;

    if !state.permissions.can_view(user, &app.name).await {
        return Err(ServiceError::UnknownApplication(identifier.to_string()));
    }

    Ok(app)
}

/// Resolve an application the caller may modify
pub async fn authorize_modify(
    state: &AppState,
    user: &CurrentUser,
    identifier: &str,
) -> Result<Application> {
    let app = get_application(state, user, identifier).await?;

    if !state.permissions.can_modify(user, &app.name).await {
        return Err(ServiceError::ApplicationPermission(app.name));
    }

    Ok(app)
}

/// Authorize a modification and take the application's orchestration lock
///
/// The application is reloaded once the lock is held so the caller acts on
/// the state left by the previous orchestration.
pub async fn lock_for_modify(
    state: &AppState,
    user: &CurrentUser,
    identifier: &str,
) -> Result<(Application, OwnedMutexGuard<()>)> {
    let app = authorize_modify(state, user, identifier).await?;
    let guard = state.locks.acquire(app.id).await;

    let app = state
        .applications
        .find_by_id(app.id)
        .await?
        .ok_or_else(|| ServiceError::UnknownApplication(identifier.to_string()))?;

    Ok((app, guard))
}

/// Every application the caller may view, in registry order
pub async fn list_accessible(state: &AppState, user: &CurrentUser) -> Result<Vec<Application>> {
    let mut visible = Vec::new();
    for app in state.applications.list_all().await? {
        if state.permissions.can_view(user, &app.name).await {
            visible.push(app);
        }
    }

    Ok(visible)
}

/// Deployments of a viewable application, newest first
pub async fn application_history(
    state: &AppState,
    user: &CurrentUser,
    identifier: &str,
) -> Result<Vec<Deployment>> {
    let app = get_application(state, user, identifier).await?;
    let history = state.deployments.list_by_application(app.id, None).await?;

    Ok(history)
}

// =============================================================================
// Create
// =============================================================================

/// Validate a creation request before anything is stored or sent
pub fn prepare_create(req: CreateApplication) -> Result<CreatePlan> {
    validate_name(&req.name)?;

    if req.instances.is_empty() {
        return Err(ServiceError::NotEnoughParameters(
            "at least one instance is required".to_string(),
        ));
    }

    if req.command.is_null() {
        return Err(ServiceError::NotEnoughParameters(
            "command is required".to_string(),
        ));
    }

    let command = ContainerCommand::try_from(req.command)?;
    if req.force_pull {
        command.image()?;
    }

    Ok(CreatePlan {
        name: req.name.trim().to_string(),
        instances: req.instances,
        command,
        force_pull: req.force_pull,
    })
}

/// Register an application and deploy its first command, started
///
/// A failed rollout leaves nothing behind: containers that were already
/// replaced are removed, and the deployment, the application and its
/// ownership grant are deleted.
pub async fn create_application(
    state: &AppState,
    user: &CurrentUser,
    plan: CreatePlan,
    progress: &ProgressSink,
) -> Result<Application> {
    let app = state
        .applications
        .create(&plan.name, &plan.instances)
        .await?;
    let _guard = state.locks.acquire(app.id).await;
    state.permissions.grant_owner(user, &app.name).await;

    tracing::info!("Application created: {} ({})", app.name, app.id);

    let deployment = match state
        .deployments
        .create(app.id, &plan.command, &user.email)
        .await
    {
        Ok(deployment) => deployment,
        Err(e) => {
            discard_application(state, &app).await;
            return Err(e.into());
        }
    };

    if let Err(e) = do_deployment(
        state,
        &app,
        &deployment,
        &app.instances,
        true,
        plan.force_pull,
        progress,
    )
    .await
    {
        if let ServiceError::DeploymentFailed { replaced, .. } = &e {
            remove_containers(state, &app, replaced, progress).await;
        }
        discard_deployment(state, &deployment).await;
        discard_application(state, &app).await;
        return Err(e);
    }

    reload(state, &app).await
}

// =============================================================================
// Update
// =============================================================================

/// Validate an update against the application it targets
///
/// Returns `None` when the request changes nothing.
pub fn prepare_update(app: &Application, req: UpdateApplication) -> Result<Option<UpdatePlan>> {
    let changes = apply_changes(&app.instances, &req.add, &req.remove);

    let command = req.command.map(ContainerCommand::try_from).transpose()?;
    if req.force_pull {
        if let Some(command) = &command {
            command.image()?;
        }
    }

    if command.is_none() && !req.restart && changes.is_empty() {
        return Ok(None);
    }

    if changes.instances.is_empty() {
        return Err(ServiceError::NotEnoughParameters(
            "an application needs at least one instance".to_string(),
        ));
    }

    if req.restart && command.is_none() && !app.has_deployment() {
        return Err(ServiceError::NotEnoughParameters(format!(
            "application `{}` has no deployment to restart",
            app.name
        )));
    }

    Ok(Some(UpdatePlan {
        changes,
        command,
        restart: req.restart,
        force_pull: req.force_pull,
    }))
}

/// Apply an update plan to `app`
///
/// A new command becomes a new deployment on the whole new fleet. A restart
/// redeploys the current deployment on the whole new fleet. Otherwise only
/// the added instances receive the current deployment. Removed instances
/// lose their container once the rollout succeeded.
pub async fn update_application(
    state: &AppState,
    user: &CurrentUser,
    app: &Application,
    plan: UpdatePlan,
    progress: &ProgressSink,
) -> Result<Application> {
    let changes = &plan.changes;

    if let Some(command) = &plan.command {
        let deployment = state
            .deployments
            .create(app.id, command, &user.email)
            .await?;
        tracing::info!("Deployment {} recorded for {}", deployment.id, app.name);

        if let Err(e) = do_deployment(
            state,
            app,
            &deployment,
            &changes.instances,
            app.active,
            plan.force_pull,
            progress,
        )
        .await
        {
            discard_deployment(state, &deployment).await;
            return Err(e);
        }
    } else if plan.restart {
        let deployment = current_deployment(state, app).await?;
        do_deployment(
            state,
            app,
            &deployment,
            &changes.instances,
            app.active,
            plan.force_pull,
            progress,
        )
        .await?;
    } else if !changes.added.is_empty() && app.has_deployment() {
        let deployment = current_deployment(state, app).await?;
        do_deployment(
            state,
            app,
            &deployment,
            &changes.added,
            app.active,
            plan.force_pull,
            progress,
        )
        .await?;
    }

    if app.has_deployment() {
        remove_containers(state, app, &changes.removed, progress).await;
    }

    if !state
        .applications
        .set_instances(app.id, &changes.instances)
        .await?
    {
        return Err(ServiceError::NoRowsUpdated(app.name.clone()));
    }

    tracing::info!(
        "Application {} now on {} instance(s)",
        app.name,
        changes.instances.len()
    );

    reload(state, app).await
}

// =============================================================================
// Helpers
// =============================================================================

fn validate_name(name: &str) -> Result<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ServiceError::NotEnoughParameters(
            "name is required".to_string(),
        ));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(ServiceError::NotEnoughParameters(format!(
            "name is too long (max {} characters)",
            MAX_NAME_LENGTH
        )));
    }

    // Docker container names: [a-zA-Z0-9][a-zA-Z0-9_.-]*
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphanumeric())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !valid {
        return Err(ServiceError::NotEnoughParameters(format!(
            "`{}` is not a valid container name",
            name
        )));
    }

    Ok(())
}

async fn current_deployment(state: &AppState, app: &Application) -> Result<Deployment> {
    state
        .deployments
        .find_by_id(app.current_deployment)
        .await?
        .ok_or(ServiceError::UnknownDeployment(app.current_deployment))
}

async fn reload(state: &AppState, app: &Application) -> Result<Application> {
    state
        .applications
        .find_by_id(app.id)
        .await?
        .ok_or_else(|| ServiceError::UnknownApplication(app.name.clone()))
}

async fn discard_deployment(state: &AppState, deployment: &Deployment) {
    tracing::warn!("Discarding deployment {}", deployment.id);
    if let Err(e) = state.deployments.delete(deployment.id).await {
        tracing::error!("Failed to discard deployment {}: {}", deployment.id, e);
    }
}

async fn discard_application(state: &AppState, app: &Application) {
    tracing::warn!("Discarding application {} ({})", app.name, app.id);
    if let Err(e) = state.applications.delete(app.id).await {
        tracing::error!("Failed to discard application {}: {}", app.name, e);
    }
    state.permissions.revoke(&app.name).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::permission::{OwnerPermissions, PermissionOracle};
    use crate::state::testing;
    use crate::transport::mock::MockTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn set(names: &[&str]) -> InstanceSet {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn user() -> CurrentUser {
        CurrentUser::new("dev@example.com")
    }

    fn create_request(name: &str, instances: &[&str]) -> CreateApplication {
        CreateApplication {
            name: name.to_string(),
            instances: set(instances),
            command: json!({"Image": "x"}),
            force_pull: false,
        }
    }

    async fn deployed(state: &AppState, instances: &[&str]) -> Application {
        let plan = prepare_create(create_request("web", instances)).unwrap();
        let (sink, _rx) = ProgressSink::channel();
        create_application(state, &user(), plan, &sink).await.unwrap()
    }

    #[test]
    fn test_prepare_create_validation() {
        assert!(matches!(
            prepare_create(create_request("", &["h1"])),
            Err(ServiceError::NotEnoughParameters(_))
        ));
        assert!(matches!(
            prepare_create(create_request("web", &[])),
            Err(ServiceError::NotEnoughParameters(_))
        ));
        assert!(matches!(
            prepare_create(create_request("my app", &["h1"])),
            Err(ServiceError::NotEnoughParameters(_))
        ));

        let mut req = create_request("web", &["h1"]);
        req.command = json!("nginx");
        assert!(matches!(
            prepare_create(req),
            Err(ServiceError::InvalidCommand(_))
        ));

        let mut req = create_request("web", &["h1"]);
        req.command = json!({"Cmd": ["true"]});
        req.force_pull = true;
        assert!(matches!(
            prepare_create(req),
            Err(ServiceError::InvalidCommand(_))
        ));

        assert!(prepare_create(create_request("web-1.prod", &["h1"])).is_ok());
    }

    #[tokio::test]
    async fn test_create_deploys_and_starts() {
        let transport = MockTransport::new();
        let state = testing::state(transport.clone());

        let app = deployed(&state, &["h1", "h2"]).await;

        assert!(app.active);
        assert!(app.has_deployment());
        assert_eq!(transport.instances_hit("containers/web/start").len(), 2);
        let history = state.deployments.list_by_application(app.id, None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].creator, "dev@example.com");
    }

    #[tokio::test]
    async fn test_failed_create_leaves_nothing_behind() {
        let transport = MockTransport::new();
        transport.respond("h2", "containers/create", 500);
        let state = testing::state(transport.clone());
        let plan = prepare_create(create_request("TestApp", &["h1", "h2"])).unwrap();
        let (sink, _rx) = ProgressSink::channel();

        let err = create_application(&state, &user(), plan, &sink).await.unwrap_err();

        assert!(matches!(err, ServiceError::DeploymentFailed { .. }));
        assert!(state.applications.find_by_name("TestApp").await.unwrap().is_none());
        assert!(state.applications.list_all().await.unwrap().is_empty());
        assert!(!transport.paths_for("h2").iter().any(|p| p.ends_with("start")));
        // h1 completed the rollout, so its container is removed again
        assert_eq!(
            transport.paths_for("h1").last().map(String::as_str),
            Some("containers/TestApp")
        );
    }

    #[tokio::test]
    async fn test_duplicate_name() {
        let transport = MockTransport::new();
        let state = testing::state(transport.clone());
        deployed(&state, &["h1"]).await;

        let plan = prepare_create(create_request("web", &["h2"])).unwrap();
        let (sink, _rx) = ProgressSink::channel();
        let err = create_application(&state, &user(), plan, &sink).await.unwrap_err();

        assert!(matches!(err, ServiceError::DuplicateKey(name) if name == "web"));
        assert!(transport.paths_for("h2").is_empty());
    }

    #[tokio::test]
    async fn test_resolve_by_id_or_name() {
        let transport = MockTransport::new();
        let state = testing::state(transport);
        let app = deployed(&state, &["h1"]).await;

        assert_eq!(resolve_application(&state, &app.id.to_string()).await.unwrap(), app);
        assert_eq!(resolve_application(&state, "web").await.unwrap(), app);
        assert!(matches!(
            resolve_application(&state, "nope").await,
            Err(ServiceError::UnknownApplication(_))
        ));
    }

    #[tokio::test]
    async fn test_permissions_hide_and_forbid() {
        let transport = MockTransport::new();
        let permissions = Arc::new(OwnerPermissions::new(
            Vec::new(),
            vec!["ops@example.com".to_string()],
        ));
        let state = testing::with_permissions(transport, permissions.clone());
        let app = deployed(&state, &["h1"]).await;
        let stranger = CurrentUser::new("stranger@example.com");
        let viewer = CurrentUser::new("ops@example.com");

        assert!(permissions.can_modify(&user(), "web").await);
        assert!(list_accessible(&state, &stranger).await.unwrap().is_empty());
        assert!(matches!(
            get_application(&state, &stranger, "web").await,
            Err(ServiceError::UnknownApplication(_))
        ));
        assert!(matches!(
            application_history(&state, &stranger, "web").await,
            Err(ServiceError::UnknownApplication(_))
        ));
        assert!(matches!(
            authorize_modify(&state, &stranger, "web").await,
            Err(ServiceError::UnknownApplication(_))
        ));

        assert_eq!(list_accessible(&state, &viewer).await.unwrap(), vec![app.clone()]);
        assert!(matches!(
            authorize_modify(&state, &viewer, &app.id.to_string()).await,
            Err(ServiceError::ApplicationPermission(_))
        ));
    }

    #[test]
    fn test_noop_update() {
        let app = Application {
            id: 0,
            name: "web".to_string(),
            instances: set(&["h1"]),
            current_deployment: 0,
            active: true,
        };
        let req = UpdateApplication {
            add: set(&["h1"]),
            remove: set(&["h7"]),
            ..Default::default()
        };

        assert!(prepare_update(&app, req).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_added_instances_get_partial_deployment() {
        let transport = MockTransport::new();
        let state = testing::state(transport.clone());
        let app = deployed(&state, &["h1"]).await;
        let calls_before = transport.paths_for("h1").len();

        let req = UpdateApplication {
            add: set(&["h2"]),
            ..Default::default()
        };
        let plan = prepare_update(&app, req).unwrap().unwrap();
        let (sink, _rx) = ProgressSink::channel();
        let updated = update_application(&state, &user(), &app, plan, &sink).await.unwrap();

        assert_eq!(updated.instances, set(&["h1", "h2"]));
        assert_eq!(transport.paths_for("h1").len(), calls_before);
        assert!(transport.paths_for("h2").contains(&"containers/web/start".to_string()));
    }

    #[tokio::test]
    async fn test_new_command_and_removal() {
        let transport = MockTransport::new();
        let state = testing::state(transport.clone());
        let app = deployed(&state, &["h1", "h2"]).await;

        let req = UpdateApplication {
            remove: set(&["h2"]),
            command: Some(json!({"Image": "y"})),
            ..Default::default()
        };
        let plan = prepare_update(&app, req).unwrap().unwrap();
        let (sink, _rx) = ProgressSink::channel();
        let updated = update_application(&state, &user(), &app, plan, &sink).await.unwrap();

        assert_eq!(updated.instances, set(&["h1"]));
        assert_ne!(updated.current_deployment, app.current_deployment);
        assert_eq!(
            transport.paths_for("h2").last().map(String::as_str),
            Some("containers/web")
        );
        let history = state.deployments.list_by_application(app.id, None).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_update_discards_new_deployment() {
        let transport = MockTransport::new();
        let state = testing::state(transport.clone());
        let app = deployed(&state, &["h1"]).await;
        transport.respond("h1", "containers/create", 500);

        let req = UpdateApplication {
            command: Some(json!({"Image": "y"})),
            ..Default::default()
        };
        let plan = prepare_update(&app, req).unwrap().unwrap();
        let (sink, _rx) = ProgressSink::channel();
        let err = update_application(&state, &user(), &app, plan, &sink).await.unwrap_err();

        assert!(matches!(err, ServiceError::DeploymentFailed { .. }));
        let history = state.deployments.list_by_application(app.id, None).await.unwrap();
        assert_eq!(history.len(), 1);
        let stored = state.applications.find_by_id(app.id).await.unwrap().unwrap();
        assert_eq!(stored.current_deployment, app.current_deployment);
    }

    #[test]
    fn test_restart_requires_deployment() {
        let app = Application {
            id: 0,
            name: "web".to_string(),
            instances: set(&["h1"]),
            current_deployment: -1,
            active: false,
        };
        let req = UpdateApplication {
            restart: true,
            ..Default::default()
        };

        assert!(matches!(
            prepare_update(&app, req),
            Err(ServiceError::NotEnoughParameters(_))
        ));
    }
}
