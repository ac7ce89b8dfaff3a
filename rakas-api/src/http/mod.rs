// Module: http
// HTTP/JSON REST API for the resolver and streaming proxy

pub mod admin;
pub mod error;
pub mod health;
pub mod proxy;
pub mod report;
pub mod resolve;

#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use rakas_core::network::NetworkStrategy;
use rakas_core::resolver::ResolverService;
use rakas_core::telemetry::Telemetry;
use rakas_core::Config;

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<ResolverService>,
    pub network: Arc<NetworkStrategy>,
    pub telemetry: Arc<Telemetry>,
    /// Upstream hosts the proxy may fetch from; empty allows any host.
    pub allowed_hosts: Arc<HashSet<String>>,
    /// Shared secret for admin routes; empty fails closed.
    pub admin_password: String,
    pub manifest_timeout: Duration,
    /// Pooled client for proxy upstream fetches. No total timeout: segment
    /// streams live as long as the client keeps reading.
    pub upstream_client: reqwest::Client,
}

impl AppState {
    pub fn new(
        config: &Config,
        resolver: Arc<ResolverService>,
        network: Arc<NetworkStrategy>,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        let allowed_hosts: HashSet<String> = config
            .proxy
            .allow_hosts
            .split(',')
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .map(str::to_string)
            .collect();

        let upstream_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.proxy.connect_timeout_secs))
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to build proxy upstream HTTP client");

        Self {
            resolver,
            network,
            telemetry,
            allowed_hosts: Arc::new(allowed_hosts),
            admin_password: config.admin.password.clone(),
            manifest_timeout: Duration::from_secs(config.proxy.manifest_timeout_secs),
            upstream_client,
        }
    }
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .merge(health::create_health_router())
        .route("/api/resolve", get(resolve::resolve_handler))
        .route("/api/report", post(report::report_handler))
        .route(rakas_proxy::MANIFEST_ROUTE, get(proxy::manifest_proxy))
        .route(rakas_proxy::SEGMENT_ROUTE, get(proxy::segment_proxy))
        .route("/api/admin/status", get(admin::status_handler))
        .route("/api/admin/refresh", post(admin::refresh_handler));

    // Apply layers before state
    let router = router
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    router.with_state(state)
}
