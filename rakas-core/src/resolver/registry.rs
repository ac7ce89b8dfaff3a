// Connector registry
//
// Builds the ordered connector list from the configured JSON array. Invalid
// entries are skipped, a malformed document yields an empty registry; neither
// ever fails startup.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use super::generic::{GenericConnectorConfig, GenericProviderConnector};
use super::headless::{HeadlessBrowserConnector, HeadlessConnectorConfig};
use super::traits::Connector;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ConnectorConfig {
    Generic(GenericConnectorConfig),
    Headless(HeadlessConnectorConfig),
}

/// Build connectors from a JSON configuration string, preserving order.
#[must_use]
pub fn build_connectors_from_config(raw: &str) -> Vec<Arc<dyn Connector>> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    let entries: Vec<Value> = match serde_json::from_str(raw) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Malformed connector configuration, ignoring: {e}");
            return Vec::new();
        }
    };

    let mut connectors: Vec<Arc<dyn Connector>> = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<ConnectorConfig>(entry) {
            Ok(ConnectorConfig::Generic(config)) => {
                connectors.push(Arc::new(GenericProviderConnector::new(config)));
            }
            Ok(ConnectorConfig::Headless(config)) => {
                if config.service_url.trim().is_empty() {
                    tracing::debug!(
                        connector = %config.name,
                        "Headless connector has no service URL, skipping"
                    );
                    continue;
                }
                connectors.push(Arc::new(HeadlessBrowserConnector::new(config)));
            }
            Err(e) => {
                tracing::warn!("Skipping invalid connector entry: {e}");
            }
        }
    }
    connectors
}
