//! Application API Handlers
//!
//! HTTP endpoints for application management. Validation and permission
//! failures are answered with a plain status before any remote call; once an
//! orchestration starts the response is a progress stream.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use convoy_core::domain::application::{Application, ContainerState};
use convoy_core::domain::deployment::Deployment;
use convoy_core::dto::application::{CreateApplication, RevertQuery, UpdateApplication};

use crate::api::error::ApiResult;
use crate::api::extract::ApiJson;
use crate::api::stream::stream_progress;
use crate::service::{CurrentUser, ServiceError, application_service, revert, toggle};
use crate::state::AppState;

/// POST /create
/// Register an application and deploy its first command
pub async fn create_application(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<CreateApplication>,
) -> ApiResult<Response> {
    tracing::info!("Creating application: {}", req.name);

    let plan = application_service::prepare_create(req)?;
    let existing = state
        .applications
        .find_by_name(&plan.name)
        .await
        .map_err(ServiceError::from)?;
    if existing.is_some() {
        return Err(ServiceError::DuplicateKey(plan.name).into());
    }

    Ok(stream_progress(move |progress| async move {
        let app =
            application_service::create_application(&state, &user, plan, &progress).await?;
        Ok(format!(
            "application {} ({}) created on {} instance(s)",
            app.name,
            app.id,
            app.instances.len()
        ))
    }))
}

/// GET /list
/// List the applications the caller may view
pub async fn list_applications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<Application>>> {
    tracing::debug!("Listing applications for {}", user.email);

    let apps = application_service::list_accessible(&state, &user).await?;

    Ok(Json(apps))
}

/// GET /list/{id}
/// Get application by id or name
pub async fn get_application(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Application>> {
    tracing::debug!("Getting application: {}", id);

    let app = application_service::get_application(&state, &user, &id).await?;

    Ok(Json(app))
}

/// GET /history/{id}
/// Deployments of an application, newest first
pub async fn application_history(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Deployment>>> {
    tracing::debug!("Getting history of application: {}", id);

    let history = application_service::application_history(&state, &user, &id).await?;

    Ok(Json(history))
}

/// POST /start/{id}
pub async fn start_application(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    change_state(state, user, id, ContainerState::Start).await
}

/// POST /stop/{id}
pub async fn stop_application(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    change_state(state, user, id, ContainerState::Stop).await
}

async fn change_state(
    state: AppState,
    user: CurrentUser,
    id: String,
    desired: ContainerState,
) -> ApiResult<Response> {
    tracing::info!("{} application {} requested by {}", desired, id, user.email);

    let (app, guard) = application_service::lock_for_modify(&state, &user, &id).await?;
    toggle::check_transition(&app, desired)?;

    Ok(stream_progress(move |progress| async move {
        let _guard = guard;
        let reached = toggle::change_state(&state, &app, desired, &progress).await?;
        Ok(format!(
            "application {} reached `{}` on {} instance(s)",
            app.name,
            reached,
            app.instances.len()
        ))
    }))
}

/// PUT /revert/{id}?target=N
/// Redeploy a previous deployment without starting it
pub async fn revert_application(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<RevertQuery>,
) -> ApiResult<Response> {
    let target = query.target.ok_or_else(|| {
        ServiceError::NotEnoughParameters("query parameter `target` is required".to_string())
    })?;
    tracing::info!(
        "Reverting application {} to {} requested by {}",
        id,
        target,
        user.email
    );

    let (app, guard) = application_service::lock_for_modify(&state, &user, &id).await?;
    let deployment =
        revert::get_revert_deployment(state.deployments.as_ref(), app.id, target).await?;

    Ok(stream_progress(move |progress| async move {
        let _guard = guard;
        let verb = if revert::revert_application(&state, &app, &deployment, &progress).await? {
            "reverted to"
        } else {
            "already at"
        };
        Ok(format!(
            "application {} {} deployment {}",
            app.name, verb, deployment.id
        ))
    }))
}

/// PUT /update/{id}
/// Change instances and/or command; 204 when nothing changes
pub async fn update_application(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateApplication>,
) -> ApiResult<Response> {
    tracing::info!("Updating application {} requested by {}", id, user.email);

    let (app, guard) = application_service::lock_for_modify(&state, &user, &id).await?;
    let Some(plan) = application_service::prepare_update(&app, req)? else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    Ok(stream_progress(move |progress| async move {
        let _guard = guard;
        let updated =
            application_service::update_application(&state, &user, &app, plan, &progress).await?;
        Ok(format!(
            "application {} updated, {} instance(s) at deployment {}",
            updated.name,
            updated.instances.len(),
            updated.current_deployment
        ))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::create_router;
    use crate::state::testing;
    use crate::transport::mock::MockTransport;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use convoy_core::domain::progress::{ProgressEvent, ProgressStatus};
    use serde_json::json;
    use tower::ServiceExt;

    const USER: &str = "dev@example.com";

    fn request(method: Method, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-email", USER);

        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn events(response: Response) -> Vec<ProgressEvent> {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    async fn create(state: &AppState) {
        let response = create_router(state.clone())
            .oneshot(request(
                Method::POST,
                "/create",
                Some(json!({
                    "name": "web",
                    "instances": ["h1", "h2"],
                    "command": {"Image": "x"}
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let verdict = events(response).await.pop().unwrap();
        assert_eq!(verdict.status, ProgressStatus::Success);
    }

    #[tokio::test]
    async fn test_missing_user_is_unauthorized() {
        let state = testing::state(MockTransport::new());
        let response = create_router(state)
            .oneshot(Request::builder().uri("/list").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let state = testing::state(MockTransport::new());
        create(&state).await;

        let response = create_router(state)
            .oneshot(request(Method::GET, "/list/web", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_params_before_streaming() {
        let transport = MockTransport::new();
        let state = testing::state(transport.clone());

        let response = create_router(state)
            .oneshot(request(
                Method::POST,
                "/create",
                Some(json!({"name": "web", "instances": [], "command": {"Image": "x"}})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_typed_body_is_bad_request() {
        let transport = MockTransport::new();
        let state = testing::state(transport.clone());

        let response = create_router(state.clone())
            .oneshot(request(
                Method::POST,
                "/create",
                Some(json!({"name": "web", "instances": "h1", "command": {"Image": "x"}})),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].is_string());
        assert!(transport.calls().is_empty());

        create(&state).await;
        let response = create_router(state)
            .oneshot(request(Method::PUT, "/update/web", Some(json!({"add": 5}))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_start_when_active_is_not_modified() {
        let transport = MockTransport::new();
        let state = testing::state(transport.clone());
        create(&state).await;
        let calls = transport.calls().len();

        let response = create_router(state)
            .oneshot(request(Method::POST, "/start/web", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(transport.calls().len(), calls);
    }

    #[tokio::test]
    async fn test_stop_streams_progress() {
        let state = testing::state(MockTransport::new());
        create(&state).await;

        let response = create_router(state.clone())
            .oneshot(request(Method::POST, "/stop/0", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let events = events(response).await;
        assert_eq!(events.first().unwrap().status, ProgressStatus::Starting);
        assert_eq!(events.last().unwrap().status, ProgressStatus::Success);
        assert!(!state.applications.find_by_id(0).await.unwrap().unwrap().active);
    }

    #[tokio::test]
    async fn test_revert_requires_target() {
        let state = testing::state(MockTransport::new());
        create(&state).await;

        let response = create_router(state.clone())
            .oneshot(request(Method::PUT, "/revert/web", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = create_router(state)
            .oneshot(request(Method::PUT, "/revert/web?target=-1", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_empty_update_is_no_content() {
        let state = testing::state(MockTransport::new());
        create(&state).await;

        let response = create_router(state)
            .oneshot(request(Method::PUT, "/update/web", Some(json!({}))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_unknown_application() {
        let state = testing::state(MockTransport::new());

        let response = create_router(state)
            .oneshot(request(Method::GET, "/history/nope", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
