//! Caller identity
//!
//! The orchestrator sits behind an authenticating proxy which forwards the
//! caller's email in a configurable header.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::api::error::ApiError;
use crate::service::CurrentUser;
use crate::state::AppState;

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(state.user_header.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .map(CurrentUser::new)
            .ok_or_else(|| {
                ApiError::Unauthorized(format!("missing `{}` header", state.user_header))
            })
    }
}
