//! Multi-backend resolution engine
//!
//! Turns a content identifier into a playable proxy URL by trying an ordered
//! set of connectors, then an ordered set of legacy endpoint templates.
//! Every backend tried is classified into an attempt; successes populate the
//! TTL cache and derive the manifest-proxy URL handed to clients.

pub mod attempt;
pub mod context;
pub mod endpoints;
pub mod generic;
pub mod headless;
pub mod registry;
pub mod traits;

pub use attempt::{Attempt, AttemptStatus};
pub use context::{parse_ordinal, ResolutionContext, ResolvedSource};
pub use endpoints::{parse_endpoint_templates, resolve_from_endpoints, EndpointTemplate};
pub use registry::build_connectors_from_config;
pub use traits::{Connector, ConnectorOutcome};

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use rakas_proxy::hints::encode_header_hints;
use rakas_proxy::manifest_proxy_url;

use crate::alert::AlertWebhook;
use crate::cache::{CacheEntry, ResolutionCache};
use crate::config::ResolverConfig;
use crate::telemetry::Telemetry;

/// Shared HTTP client for all resolution fetches (connection pooling).
/// Per-attempt deadlines are set on each request, not on the client.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .build()
        .expect("Failed to build resolver shared HTTP client")
});

pub(crate) fn shared_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Bypass the cache for this round.
    pub force: bool,
    pub season: u32,
    pub episode: u32,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            force: false,
            season: 1,
            episode: 1,
        }
    }
}

/// Outcome of one resolution call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_url: Option<String>,
    #[serde(skip_serializing_if = "std::collections::HashMap::is_empty")]
    pub headers: std::collections::HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    pub attempts: Vec<Attempt>,
}

impl Resolution {
    fn failure(attempts: Vec<Attempt>) -> Self {
        Self {
            ok: false,
            source: None,
            manifest_url: None,
            headers: std::collections::HashMap::new(),
            proxy_url: None,
            attempts,
        }
    }

    fn from_cache(entry: CacheEntry) -> Self {
        Self {
            ok: true,
            source: Some(entry.source),
            manifest_url: Some(entry.manifest_url),
            headers: entry.headers,
            proxy_url: Some(entry.proxy_url),
            attempts: Vec::new(),
        }
    }
}

/// The coordinating resolution service: connectors, endpoint templates,
/// cache, refresh queue and status accounting, owned as one unit.
pub struct ResolverService {
    connectors: Vec<Arc<dyn Connector>>,
    endpoints: Vec<EndpointTemplate>,
    cache: ResolutionCache,
    telemetry: Arc<Telemetry>,
    alerts: AlertWebhook,
    refresh_queue: Mutex<HashSet<String>>,
    request_timeout: Duration,
}

impl ResolverService {
    #[must_use]
    pub fn from_config(
        config: &ResolverConfig,
        telemetry: Arc<Telemetry>,
        alerts: AlertWebhook,
    ) -> Self {
        Self::new(
            build_connectors_from_config(&config.connectors_json),
            parse_endpoint_templates(&config.endpoints),
            Duration::from_secs(config.cache_ttl_secs),
            Duration::from_secs(config.request_timeout_secs),
            telemetry,
            alerts,
        )
    }

    #[must_use]
    pub fn new(
        connectors: Vec<Arc<dyn Connector>>,
        endpoints: Vec<EndpointTemplate>,
        cache_ttl: Duration,
        request_timeout: Duration,
        telemetry: Arc<Telemetry>,
        alerts: AlertWebhook,
    ) -> Self {
        Self {
            connectors,
            endpoints,
            cache: ResolutionCache::new(cache_ttl),
            telemetry,
            alerts,
            refresh_queue: Mutex::new(HashSet::new()),
            request_timeout,
        }
    }

    /// Resolve an identifier to a playable source.
    ///
    /// Backends run strictly in configured order, short-circuiting on the
    /// first success. A round that fails with a hard `403`/`404` attempt is
    /// retried exactly once with the cache bypassed; a second failure is
    /// final and alerts.
    pub async fn resolve(&self, content_id: &str, options: &ResolveOptions) -> Resolution {
        let ctx = ResolutionContext::new(content_id, options.season, options.episode);
        let mut force = options.force;

        loop {
            if !force {
                if let Some(entry) = self.cache.get(content_id) {
                    tracing::debug!(metadata_id = %content_id, source = %entry.source, "Resolution cache hit");
                    return Resolution::from_cache(entry);
                }
            }

            let mut attempts = Vec::new();

            for connector in &self.connectors {
                match connector.resolve(&ctx).await {
                    ConnectorOutcome::Resolved(source) if !source.manifest_url.is_empty() => {
                        self.telemetry
                            .record_connector(connector.name(), &AttemptStatus::Ok);
                        attempts.push(Attempt::new(connector.name(), AttemptStatus::Ok));
                        return self.finish(content_id, source, attempts);
                    }
                    ConnectorOutcome::HttpStatus(code) => {
                        let status = AttemptStatus::Http(code);
                        self.telemetry.record_connector(connector.name(), &status);
                        attempts.push(Attempt::new(connector.name(), status));
                    }
                    ConnectorOutcome::Resolved(_) | ConnectorOutcome::Failed => {
                        self.telemetry
                            .record_connector(connector.name(), &AttemptStatus::Error);
                        attempts.push(Attempt::new(connector.name(), AttemptStatus::Error));
                    }
                }
            }

            let endpoint_outcome =
                resolve_from_endpoints(content_id, &self.endpoints, self.request_timeout).await;
            for attempt in &endpoint_outcome.attempts {
                self.telemetry
                    .record_endpoint(&attempt.source, &attempt.status);
            }
            attempts.extend(endpoint_outcome.attempts);

            if let Some(source) = endpoint_outcome.result {
                self.telemetry
                    .record_endpoint(&source.source, &AttemptStatus::Http(200));
                return self.finish(content_id, source, attempts);
            }

            let has_hard_failure = attempts.iter().any(|a| a.status.is_hard());
            if has_hard_failure && !force {
                tracing::info!(metadata_id = %content_id, "Hard failure, retrying once with cache bypass");
                force = true;
                continue;
            }

            tracing::warn!(metadata_id = %content_id, attempts = attempts.len(), "All resolver sources failed");
            self.alerts.resolution_failed(content_id, &attempts).await;
            return Resolution::failure(attempts);
        }
    }

    fn finish(&self, content_id: &str, source: ResolvedSource, attempts: Vec<Attempt>) -> Resolution {
        let token = encode_header_hints(&source.headers);
        let proxy_url = manifest_proxy_url(&source.manifest_url, &token);

        self.cache.set(
            content_id,
            CacheEntry::new(
                source.source.clone(),
                source.manifest_url.clone(),
                source.headers.clone(),
                proxy_url.clone(),
            ),
        );

        tracing::info!(metadata_id = %content_id, source = %source.source, "Resolved playable source");

        Resolution {
            ok: true,
            source: Some(source.source),
            manifest_url: Some(source.manifest_url),
            headers: source.headers,
            proxy_url: Some(proxy_url),
            attempts,
        }
    }

    /// Drop the cached entry for an identifier.
    pub fn invalidate(&self, content_id: &str) {
        self.cache.invalidate(content_id);
    }

    /// Queue an identifier for forced refresh in the next health cycle.
    pub fn queue_refresh(&self, content_id: &str) {
        self.refresh_queue.lock().insert(content_id.to_string());
    }

    /// Drain (clear) the refresh queue, returning its contents.
    pub fn drain_refresh_queue(&self) -> Vec<String> {
        self.refresh_queue.lock().drain().collect()
    }
}
