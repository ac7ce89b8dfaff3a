//! POST /api/report - flag a dead source and force a re-resolve
//!
//! Accepted reports invalidate the cache entry, queue the identifier for the
//! next health cycle and kick off a background forced resolution so the next
//! interactive request is likely to hit a fresh entry.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use rakas_core::resolver::ResolveOptions;

use super::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportBody {
    #[serde(default)]
    metadata_id: Option<String>,
}

pub async fn report_handler(State(state): State<AppState>, body: String) -> AppResult<Response> {
    let raw = if body.trim().is_empty() { "{}" } else { &body };
    let report: ReportBody = serde_json::from_str(raw)?;

    let metadata_id = report
        .metadata_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::bad_request("metadataId is required"))?;

    tracing::info!(metadata_id = %metadata_id, "Dead link reported, queued for refresh");
    state.resolver.queue_refresh(&metadata_id);
    state.resolver.invalidate(&metadata_id);

    // Best-effort refresh off the request path; the health loop will retry
    // via the queue either way.
    let resolver = state.resolver.clone();
    let id = metadata_id.clone();
    tokio::spawn(async move {
        let options = ResolveOptions {
            force: true,
            ..ResolveOptions::default()
        };
        resolver.resolve(&id, &options).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({"ok": true, "queued": metadata_id})),
    )
        .into_response())
}
