//! Resolution-failure alerting
//!
//! Fire-and-forget webhook POST. Delivery failures are logged and swallowed
//! here, on purpose: alerting must never fail the request path that
//! triggered it.

use std::time::Duration;

use serde_json::json;

use crate::resolver::Attempt;

#[derive(Debug, Clone)]
pub struct AlertWebhook {
    url: String,
}

impl AlertWebhook {
    /// An empty URL disables alerting entirely.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.url.is_empty()
    }

    /// Notify that every backend failed for an identifier.
    pub async fn resolution_failed(&self, metadata_id: &str, attempts: &[Attempt]) {
        if !self.is_enabled() {
            return;
        }

        let attempts_json =
            serde_json::to_string(attempts).unwrap_or_else(|_| "[]".to_string());
        let payload = json!({
            "username": "Rakas Resolver",
            "content": "⚠️ All resolver sources failed for metadata id",
            "embeds": [{
                "title": "Resolver Failure",
                "fields": [
                    {"name": "metadataId", "value": metadata_id, "inline": false},
                    {"name": "attempts", "value": attempts_json, "inline": false}
                ]
            }]
        });

        let result = reqwest::Client::new()
            .post(&self.url)
            .timeout(Duration::from_secs(10))
            .json(&payload)
            .send()
            .await;

        // Suppressed by design of the alert path: log and move on.
        if let Err(e) = result {
            tracing::warn!("Alert webhook delivery failed: {e}");
        }
    }
}
