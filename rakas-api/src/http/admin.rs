//! Admin telemetry and refresh routes
//!
//! Guarded by an exact `X-Admin-Password` match against the configured
//! shared secret. An unset secret disables admin access entirely.

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use rakas_core::resolver::ResolveOptions;

use super::{AppError, AppResult, AppState};

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    // No configured secret fails closed.
    if state.admin_password.is_empty() {
        return Err(AppError::unauthorized("Unauthorized"));
    }
    let presented = headers
        .get("x-admin-password")
        .and_then(|value| value.to_str().ok());
    if presented != Some(state.admin_password.as_str()) {
        return Err(AppError::unauthorized("Unauthorized"));
    }
    Ok(())
}

/// GET /api/admin/status - telemetry snapshot
pub async fn status_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Response> {
    require_admin(&state, &headers)?;
    Ok(Json(state.telemetry.snapshot()).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody {
    #[serde(default)]
    metadata_id: Option<String>,
    #[serde(default)]
    season: Option<u32>,
    #[serde(default)]
    episode: Option<u32>,
}

/// POST /api/admin/refresh - force refresh one identifier
pub async fn refresh_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<Response> {
    require_admin(&state, &headers)?;

    let raw = if body.trim().is_empty() { "{}" } else { &body };
    let request: RefreshBody = serde_json::from_str(raw)?;
    let metadata_id = request
        .metadata_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::bad_request("metadataId is required"))?;

    state.resolver.invalidate(&metadata_id);
    state.resolver.queue_refresh(&metadata_id);

    let options = ResolveOptions {
        force: true,
        season: request.season.unwrap_or(1),
        episode: request.episode.unwrap_or(1),
    };
    let result = state.resolver.resolve(&metadata_id, &options).await;

    Ok(Json(json!({
        "ok": result.ok,
        "metadataId": metadata_id,
        "attempts": result.attempts,
    }))
    .into_response())
}
