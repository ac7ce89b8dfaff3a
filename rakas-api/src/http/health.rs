// Liveness probe

use axum::{routing::get, Json, Router};
use serde_json::json;

use super::AppState;

pub fn create_health_router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}
