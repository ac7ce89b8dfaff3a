mod server;

use anyhow::Result;
use tracing::info;

use rakas_core::{load_config, logging};

use server::RakasServer;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = load_config();

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("Rakas server starting...");
    info!("HTTP address: {}", config.http_address());

    // 3. Build services and serve
    let server = RakasServer::new(config);
    server.start().await
}
