use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use rakas_api::{create_router, AppState};
use rakas_core::{
    alert::AlertWebhook,
    catalog::Catalog,
    config::Config,
    health::spawn_health_loop,
    network::NetworkStrategy,
    resolver::ResolverService,
    telemetry::Telemetry,
};

/// Owns configuration and the shared service graph for one server process.
pub struct RakasServer {
    config: Config,
}

impl RakasServer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn start(self) -> Result<()> {
        let telemetry = Arc::new(Telemetry::new());
        let alerts = AlertWebhook::new(self.config.alert.webhook_url.clone());
        if !alerts.is_enabled() {
            info!("Alert webhook not configured, failure alerts disabled");
        }

        let resolver = Arc::new(ResolverService::from_config(
            &self.config.resolver,
            telemetry.clone(),
            alerts,
        ));
        let network = Arc::new(NetworkStrategy::from_config(&self.config.network));

        if self.config.admin.password.is_empty() {
            warn!("Admin password not configured, admin routes are disabled");
        }

        // Background refresh loop; the first cycle runs immediately.
        let catalog = Catalog::from_config(&self.config.catalog);
        let _health_task = spawn_health_loop(
            resolver.clone(),
            catalog,
            Duration::from_secs(self.config.resolver.health_check_interval_secs),
        );
        info!(
            interval_secs = self.config.resolver.health_check_interval_secs,
            "Health check loop started"
        );

        let state = AppState::new(&self.config, resolver, network, telemetry);
        let router = create_router(state);

        let addr: SocketAddr = self.config.http_address().parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("HTTP server listening on {addr}");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        info!("Server shut down");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
    }
}
