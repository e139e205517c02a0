//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Handlers authenticate the caller, validate the request and hand over to
//! the service layer; orchestrations answer with a progress stream.

pub mod application;
pub mod auth;
pub mod error;
pub mod extract;
pub mod health;
pub mod stream;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Registry
        .route("/list", get(application::list_applications))
        .route("/list/{id}", get(application::get_application))
        .route("/history/{id}", get(application::application_history))
        // Orchestrations
        .route("/create", post(application::create_application))
        .route("/start/{id}", post(application::start_application))
        .route("/stop/{id}", post(application::stop_application))
        .route("/revert/{id}", put(application::revert_application))
        .route("/update/{id}", put(application::update_application))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
