//! Headless-browser connector adapter
//!
//! Some providers only reveal their manifest URL in runtime network activity,
//! which requires a controllable browser. That runtime is not part of this
//! service: the connector delegates to an external browser-automation service
//! and treats it as a black box. When no service URL is configured the
//! connector is simply absent from the registry.
//!
//! Service contract: `POST <service_url>` with
//! `{"url": <target>, "timeoutMs": <n>, "headers": {..}}`; a `200` response
//! carries `{"manifestUrl": <absolute url>, "headers": {..}?}`. Any other
//! response, or a missing manifest URL, counts as a soft failure.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use rakas_proxy::encode_query_value;

use super::context::{ResolutionContext, ResolvedSource};
use super::shared_client;
use super::traits::{Connector, ConnectorOutcome};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadlessConnectorConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Base URL of the external browser-automation service.
    pub service_url: String,
    /// Provider page to drive, with `{tmdb_id}`/`{season}`/`{episode}`
    /// placeholders.
    pub target_url_template: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_name() -> String {
    "headless-browser".to_string()
}

const fn default_timeout_ms() -> u64 {
    12000
}

pub struct HeadlessBrowserConnector {
    config: HeadlessConnectorConfig,
}

impl HeadlessBrowserConnector {
    pub fn new(config: HeadlessConnectorConfig) -> Self {
        Self { config }
    }

    fn target_url(&self, ctx: &ResolutionContext) -> String {
        self.config
            .target_url_template
            .replace("{tmdb_id}", &encode_query_value(&ctx.content_id))
            .replace("{season}", &ctx.season.to_string())
            .replace("{episode}", &ctx.episode.to_string())
    }
}

#[async_trait]
impl Connector for HeadlessBrowserConnector {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn resolve(&self, ctx: &ResolutionContext) -> ConnectorOutcome {
        let target_url = self.target_url(ctx);

        let response = shared_client()
            .post(&self.config.service_url)
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .json(&json!({
                "url": target_url,
                "timeoutMs": self.config.timeout_ms,
                "headers": self.config.headers,
            }))
            .send()
            .await;

        let response = match response {
            Ok(response) if response.status().is_success() => response,
            // The service is opaque; any refusal is a soft failure, not a
            // provider HTTP status.
            Ok(_) | Err(_) => return ConnectorOutcome::Failed,
        };

        let payload: Value = match response.json().await {
            Ok(payload) => payload,
            Err(_) => return ConnectorOutcome::Failed,
        };

        let manifest_url = payload
            .get("manifestUrl")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty());
        let Some(manifest_url) = manifest_url else {
            return ConnectorOutcome::Failed;
        };

        let headers = payload
            .get("headers")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        ConnectorOutcome::Resolved(ResolvedSource {
            source: self.config.name.clone(),
            manifest_url: manifest_url.to_string(),
            headers,
            meta: HashMap::from([("targetUrl".to_string(), target_url)]),
        })
    }
}
