//! Generic endpoint-template connector
//!
//! HTTP GET against a templated provider URL, accepting the handful of JSON
//! response layouts custom providers are known to emit.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use rakas_proxy::encode_query_value;

use super::context::{ResolutionContext, ResolvedSource};
use super::shared_client;
use super::traits::{Connector, ConnectorOutcome};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericConnectorConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub endpoint_template: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_name() -> String {
    "generic-provider".to_string()
}

const fn default_timeout_ms() -> u64 {
    5000
}

pub struct GenericProviderConnector {
    config: GenericConnectorConfig,
}

impl GenericProviderConnector {
    pub fn new(config: GenericConnectorConfig) -> Self {
        Self { config }
    }

    fn build_url(&self, ctx: &ResolutionContext) -> String {
        self.config
            .endpoint_template
            .replace("{tmdb_id}", &encode_query_value(&ctx.content_id))
            .replace("{season}", &ctx.season.to_string())
            .replace("{episode}", &ctx.episode.to_string())
    }
}

#[async_trait]
impl Connector for GenericProviderConnector {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn resolve(&self, ctx: &ResolutionContext) -> ConnectorOutcome {
        let url = self.build_url(ctx);

        let mut request = shared_client()
            .get(&url)
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .header("Accept", "application/json")
            .header("User-Agent", "Rakas-GenericResolver/1.0");
        for (name, value) in &self.config.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(_) => return ConnectorOutcome::Failed,
        };

        if !response.status().is_success() {
            return ConnectorOutcome::HttpStatus(response.status().as_u16());
        }

        let payload: Value = match response.json().await {
            Ok(payload) => payload,
            Err(_) => return ConnectorOutcome::Failed,
        };

        let Some(manifest_url) = extract_manifest_url(&payload) else {
            return ConnectorOutcome::Failed;
        };

        ConnectorOutcome::Resolved(ResolvedSource {
            source: self.config.name.clone(),
            manifest_url,
            headers: extract_headers(&payload),
            meta: HashMap::from([("endpointUrl".to_string(), url)]),
        })
    }
}

fn first_string(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        value
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Probe the known provider payload layouts for a manifest URL: top-level
/// fields, a nested `stream` object, or a `sources` array (preferring an
/// `.m3u8` entry).
fn extract_manifest_url(payload: &Value) -> Option<String> {
    first_string(payload, &["manifestUrl", "m3u8", "mp4"])
        .or_else(|| {
            payload
                .get("stream")
                .and_then(|stream| first_string(stream, &["manifestUrl", "m3u8", "mp4"]))
        })
        .or_else(|| {
            let sources = payload.get("sources")?.as_array()?;
            let pick = sources
                .iter()
                .find(|s| {
                    s.get("url")
                        .and_then(Value::as_str)
                        .is_some_and(|u| u.contains(".m3u8"))
                })
                .or_else(|| sources.first())?;
            first_string(pick, &["url", "file"])
        })
}

fn extract_headers(payload: &Value) -> HashMap<String, String> {
    let object = payload
        .get("headers")
        .and_then(Value::as_object)
        .or_else(|| {
            payload
                .get("stream")
                .and_then(|s| s.get("headers"))
                .and_then(Value::as_object)
        });

    object
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}
