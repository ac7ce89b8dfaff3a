//! GET /api/resolve - resolve a content identifier to a playable proxy URL

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use rakas_core::resolver::{parse_ordinal, ResolveOptions};

use super::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub id: Option<String>,
    pub season: Option<String>,
    pub episode: Option<String>,
}

pub async fn resolve_handler(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> AppResult<Response> {
    let metadata_id = query
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::bad_request("Missing id query parameter"))?;

    let options = ResolveOptions {
        force: false,
        season: parse_ordinal(query.season.as_deref()),
        episode: parse_ordinal(query.episode.as_deref()),
    };

    let result = state.resolver.resolve(&metadata_id, &options).await;

    if !result.ok {
        let body = json!({
            "error": "No active source available",
            "attempts": result.attempts,
        });
        return Ok((StatusCode::BAD_GATEWAY, Json(body)).into_response());
    }

    Ok(Json(json!({
        "metadataId": metadata_id,
        "source": result.source,
        "manifestUrl": result.manifest_url,
        "proxyUrl": result.proxy_url,
        "attempts": result.attempts,
    }))
    .into_response())
}
