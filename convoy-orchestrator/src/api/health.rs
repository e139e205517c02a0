//! Health Check API Handler
//!
//! Simple health check endpoint for monitoring.

use axum::Json;
use serde_json::{Value, json};

/// GET /health
/// Liveness probe, no caller identity required
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
