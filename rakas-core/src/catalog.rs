//! Read-only popularity catalog
//!
//! External collaborator: a JSON file of catalog items carrying a popularity
//! rating. The health loop only needs the top-N identifiers; a missing or
//! malformed file yields an empty work set.

use serde::Deserialize;

use crate::config::CatalogConfig;
use crate::Result;

#[derive(Debug, Deserialize)]
struct CatalogItem {
    id: String,
    #[serde(default)]
    rating: f64,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    path: String,
    top_n: usize,
}

impl Catalog {
    #[must_use]
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            path: config.path.clone(),
            top_n: config.top_n,
        }
    }

    /// Top-N identifiers ranked by rating, best first. Read problems are
    /// swallowed into an empty set; the health loop must keep running with
    /// or without catalog data.
    pub async fn top_popular_ids(&self) -> Vec<String> {
        match self.read_items().await {
            Ok(mut items) => {
                items.sort_by(|a, b| b.rating.total_cmp(&a.rating));
                items.into_iter().take(self.top_n).map(|i| i.id).collect()
            }
            Err(e) => {
                tracing::debug!("Catalog {} unavailable: {e}", self.path);
                Vec::new()
            }
        }
    }

    async fn read_items(&self) -> Result<Vec<CatalogItem>> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&text)?)
    }
}
