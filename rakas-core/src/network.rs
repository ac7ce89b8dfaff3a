//! Outbound network shaping
//!
//! Per upstream fetch the proxy presents a rotating identity: a User-Agent
//! picked uniformly at random from a pool, and optionally an outbound gateway
//! chosen round-robin whose URL template wraps the target. Rotation is
//! stateless across restarts and carries no fairness guarantee.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::RngExt;
use serde::Deserialize;
use serde_json::Value;

use crate::config::NetworkConfig;

use rakas_proxy::encode_query_value;

/// Representative desktop browser identities used when no pool is configured.
const DEFAULT_UA_POOL: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/146.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_6) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/146.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/145.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/19.0 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:147.0) Gecko/20100101 Firefox/147.0",
];

/// Media type of an upstream fetch, selecting which gateway template applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Manifest,
    Segment,
}

/// One configured outbound gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gateway {
    pub name: String,
    #[serde(default)]
    pub manifest_proxy_template: Option<String>,
    #[serde(default)]
    pub segment_proxy_template: Option<String>,
    /// Extra headers the gateway requires on rerouted requests.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

pub struct NetworkStrategy {
    user_agents: Vec<String>,
    gateways: Vec<Gateway>,
    round_robin: AtomicUsize,
}

impl NetworkStrategy {
    #[must_use]
    pub fn from_config(config: &NetworkConfig) -> Self {
        Self::new(
            parse_ua_pool(&config.user_agent_pool),
            parse_gateway_config(&config.gateways_json),
        )
    }

    #[must_use]
    pub fn new(user_agents: Vec<String>, gateways: Vec<Gateway>) -> Self {
        let user_agents = if user_agents.is_empty() {
            DEFAULT_UA_POOL.iter().map(|s| (*s).to_string()).collect()
        } else {
            user_agents
        };
        Self {
            user_agents,
            gateways,
            round_robin: AtomicUsize::new(0),
        }
    }

    /// Uniform random pick from the pool.
    pub fn next_user_agent(&self) -> &str {
        let index = rand::rng().random_range(0..self.user_agents.len());
        &self.user_agents[index]
    }

    /// Strict round-robin over the configured gateways, wrapping; `None` when
    /// no gateway is configured.
    pub fn next_gateway(&self) -> Option<&Gateway> {
        if self.gateways.is_empty() {
            return None;
        }
        let index = self.round_robin.fetch_add(1, Ordering::Relaxed);
        Some(&self.gateways[index % self.gateways.len()])
    }

    /// Apply the gateway's template for the given media type, substituting
    /// the target URL. `None` when the gateway lacks a template for the type.
    #[must_use]
    pub fn gateway_url(
        &self,
        gateway: &Gateway,
        target_url: &str,
        media_type: MediaType,
    ) -> Option<String> {
        let template = match media_type {
            MediaType::Manifest => gateway.manifest_proxy_template.as_deref(),
            MediaType::Segment => gateway.segment_proxy_template.as_deref(),
        }?;
        Some(template.replace("{url}", &encode_query_value(target_url)))
    }
}

/// Newline-separated User-Agent pool; empty input keeps the default pool.
#[must_use]
pub fn parse_ua_pool(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse the gateway JSON array; malformed input or entries degrade to an
/// empty list / get skipped rather than failing startup.
#[must_use]
pub fn parse_gateway_config(raw: &str) -> Vec<Gateway> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    let entries: Vec<Value> = match serde_json::from_str(raw) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Malformed gateway configuration, ignoring: {e}");
            return Vec::new();
        }
    };
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Gateway>(entry) {
            Ok(gateway) if !gateway.name.is_empty() => Some(gateway),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Skipping invalid gateway entry: {e}");
                None
            }
        })
        .collect()
}
