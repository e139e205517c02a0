//! Start/stop orchestration
//!
//! A toggle either reaches the whole fleet or is undone on the whole fleet.

use convoy_core::domain::application::{Application, ContainerState};

use super::{Result, ServiceError};
use crate::batch::{ProgressSink, default_classifier};
use crate::state::AppState;
use crate::transport::docker;

/// Fail fast when `app` is already in `desired` state
pub fn check_transition(app: &Application, desired: ContainerState) -> Result<()> {
    if app.active == desired.is_active() {
        return Err(ServiceError::StateNotChanged {
            name: app.name.clone(),
            state: desired,
        });
    }

    Ok(())
}

/// Bring `app` into `desired` state
pub async fn change_state(
    state: &AppState,
    app: &Application,
    desired: ContainerState,
    progress: &ProgressSink,
) -> Result<ContainerState> {
    check_transition(app, desired)?;
    toggle_application_state(state, app, progress).await
}

/// Flip the application between running and stopped
///
/// If any instance fails, the opposite transition is sent to every instance
/// and nothing is persisted. Returns the state reached.
pub async fn toggle_application_state(
    state: &AppState,
    app: &Application,
    progress: &ProgressSink,
) -> Result<ContainerState> {
    let target = if app.active {
        ContainerState::Stop
    } else {
        ContainerState::Start
    };

    let report = state
        .batch
        .execute(
            target.as_str(),
            &app.instances,
            &[docker::set_state(&app.name, target)],
            default_classifier,
            progress,
        )
        .await;

    if report.succeeded.len() < app.instances.len() {
        let rollback = target.opposite();
        tracing::warn!(
            "{} of {} failed on {} instance(s), sending {} to all",
            target,
            app.name,
            report.failed.len(),
            rollback
        );
        state
            .batch
            .execute(
                rollback.as_str(),
                &app.instances,
                &[docker::set_state(&app.name, rollback)],
                default_classifier,
                progress,
            )
            .await;

        return Err(ServiceError::StateChangeFailed {
            state: target,
            failed: report.failed,
        });
    }

    if !state
        .applications
        .set_active(app.id, target.is_active())
        .await?
    {
        return Err(ServiceError::NoRowsUpdated(app.name.clone()));
    }

    tracing::info!("Application {} reached `{}` on every instance", app.name, target);

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing;
    use crate::transport::mock::MockTransport;
    use convoy_core::domain::instance::InstanceSet;

    async fn create(state: &AppState, instances: &[&str]) -> Application {
        let instances: InstanceSet = instances.iter().map(|n| n.to_string()).collect();
        state.applications.create("web", &instances).await.unwrap()
    }

    async fn reload(state: &AppState, app: &Application) -> Application {
        state.applications.find_by_id(app.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_failed_start_rolls_back_whole_fleet() {
        let transport = MockTransport::new();
        transport.respond("h2", "start", 500);
        let state = testing::state(transport.clone());
        let app = create(&state, &["h1", "h2", "h3"]).await;
        let (sink, _rx) = ProgressSink::channel();

        let err = toggle_application_state(&state, &app, &sink).await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::StateChangeFailed {
                state: ContainerState::Start,
                ..
            }
        ));
        let mut stopped = transport.instances_hit("containers/web/stop");
        stopped.sort();
        assert_eq!(stopped, vec!["h1", "h2", "h3"]);
        assert!(!reload(&state, &app).await.active);
    }

    #[tokio::test]
    async fn test_start_then_stop_restores_state() {
        let transport = MockTransport::new();
        let state = testing::state(transport.clone());
        let app = create(&state, &["h1", "h2"]).await;
        let (sink, _rx) = ProgressSink::channel();

        let reached = change_state(&state, &app, ContainerState::Start, &sink)
            .await
            .unwrap();
        assert_eq!(reached, ContainerState::Start);
        let app = reload(&state, &app).await;
        assert!(app.active);

        change_state(&state, &app, ContainerState::Stop, &sink)
            .await
            .unwrap();
        assert!(!reload(&state, &app).await.active);
    }

    #[tokio::test]
    async fn test_unchanged_state_makes_no_remote_call() {
        let transport = MockTransport::new();
        let state = testing::state(transport.clone());
        let app = create(&state, &["h1"]).await;
        let (sink, _rx) = ProgressSink::channel();

        let err = change_state(&state, &app, ContainerState::Stop, &sink)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::StateNotChanged { .. }));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_application_is_reported() {
        let transport = MockTransport::new();
        let state = testing::state(transport.clone());
        let app = create(&state, &["h1"]).await;
        state.applications.delete(app.id).await.unwrap();
        let (sink, _rx) = ProgressSink::channel();

        let err = toggle_application_state(&state, &app, &sink).await.unwrap_err();

        assert!(matches!(err, ServiceError::NoRowsUpdated(name) if name == "web"));
    }
}
