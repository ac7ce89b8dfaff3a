//! Legacy endpoint-template fallback
//!
//! Endpoint templates are a simpler, low-maintenance resolution path tried
//! only after every connector has failed: a direct GET against a templated
//! URL whose JSON reply either names a manifest or gets classified.

use std::time::Duration;

use serde_json::Value;

use rakas_proxy::encode_query_value;

use super::attempt::{Attempt, AttemptStatus};
use super::context::ResolvedSource;
use super::shared_client;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTemplate {
    /// Host of the template URL, used for attribution.
    pub name: String,
    /// URL with an `{id}` placeholder.
    pub template: String,
}

/// Parse the comma-separated endpoint list. Entries that are not valid URLs
/// are dropped; templates without an `{id}` placeholder get one appended as a
/// query parameter.
#[must_use]
pub fn parse_endpoint_templates(raw: &str) -> Vec<EndpointTemplate> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let parsed = match url::Url::parse(entry) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!("Skipping invalid endpoint template {entry:?}: {e}");
                    return None;
                }
            };
            let host = parsed.host_str()?;
            let name = match parsed.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
            let template = if entry.contains("{id}") {
                entry.to_string()
            } else {
                let sep = if entry.contains('?') { '&' } else { '?' };
                format!("{entry}{sep}id={{id}}")
            };
            Some(EndpointTemplate { name, template })
        })
        .collect()
}

/// Outcome of walking the endpoint templates for one identifier.
#[derive(Debug)]
pub struct EndpointResolution {
    pub result: Option<ResolvedSource>,
    /// One entry per failed endpoint, in try order. The winning endpoint is
    /// not recorded here.
    pub attempts: Vec<Attempt>,
}

/// Try each endpoint template in order, stopping at the first success.
pub async fn resolve_from_endpoints(
    content_id: &str,
    endpoints: &[EndpointTemplate],
    timeout: Duration,
) -> EndpointResolution {
    let mut attempts = Vec::new();

    for endpoint in endpoints {
        let url = endpoint
            .template
            .replace("{id}", &encode_query_value(content_id));

        let response = shared_client()
            .get(&url)
            .timeout(timeout)
            .header("User-Agent", "Rakas-Resolver/1.0")
            .header("Accept", "application/json")
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                let status = if e.is_timeout() {
                    AttemptStatus::Timeout
                } else {
                    AttemptStatus::Error
                };
                attempts.push(Attempt::new(&endpoint.name, status));
                continue;
            }
        };

        if !response.status().is_success() {
            attempts.push(Attempt::new(
                &endpoint.name,
                AttemptStatus::Http(response.status().as_u16()),
            ));
            continue;
        }

        let payload: Value = match response.json().await {
            Ok(payload) => payload,
            Err(_) => {
                attempts.push(Attempt::new(&endpoint.name, AttemptStatus::Error));
                continue;
            }
        };

        if is_expired(&payload) {
            attempts.push(Attempt::new(&endpoint.name, AttemptStatus::Expired));
            continue;
        }

        let manifest_url = payload
            .get("manifestUrl")
            .and_then(Value::as_str)
            .or_else(|| {
                payload
                    .get("stream")
                    .and_then(|s| s.get("manifestUrl"))
                    .and_then(Value::as_str)
            })
            .filter(|s| !s.is_empty());

        let Some(manifest_url) = manifest_url else {
            attempts.push(Attempt::new(&endpoint.name, AttemptStatus::NoManifest));
            continue;
        };

        let headers = payload
            .get("headers")
            .and_then(Value::as_object)
            .or_else(|| {
                payload
                    .get("stream")
                    .and_then(|s| s.get("headers"))
                    .and_then(Value::as_object)
            })
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        return EndpointResolution {
            result: Some(ResolvedSource {
                source: endpoint.name.clone(),
                manifest_url: manifest_url.to_string(),
                headers,
                meta: std::collections::HashMap::new(),
            }),
            attempts,
        };
    }

    EndpointResolution {
        result: None,
        attempts,
    }
}

fn is_expired(payload: &Value) -> bool {
    let status_expired = payload
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|s| s.eq_ignore_ascii_case("expired"));
    let flag_expired = payload
        .get("expired")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    status_expired || flag_expired
}
