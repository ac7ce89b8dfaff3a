//! TTL resolution cache
//!
//! Memoizes successful resolutions by content identifier. Expiry is computed
//! at read time against the entry's write instant: an expired entry looks
//! absent and is deleted by the read that discovers it; there is no
//! background sweep.
//!
//! The cache deliberately provides no single-flight coalescing: two
//! concurrent misses for the same identifier may both run the full backend
//! chain and both write, last write wins. That costs duplicate upstream
//! calls, not correctness.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub source: String,
    pub manifest_url: String,
    pub headers: HashMap<String, String>,
    pub proxy_url: String,
    updated_at: Instant,
}

impl CacheEntry {
    pub fn new(
        source: String,
        manifest_url: String,
        headers: HashMap<String, String>,
        proxy_url: String,
    ) -> Self {
        Self {
            source,
            manifest_url,
            headers,
            proxy_url,
            updated_at: Instant::now(),
        }
    }
}

pub struct ResolutionCache {
    ttl: Duration,
    entries: DashMap<String, CacheEntry>,
}

impl ResolutionCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Expiring read: a stale entry is removed and reported as a miss.
    pub fn get(&self, id: &str) -> Option<CacheEntry> {
        {
            let entry = self.entries.get(id)?;
            if entry.updated_at.elapsed() < self.ttl {
                return Some(entry.clone());
            }
        }
        self.entries.remove(id);
        None
    }

    /// Overwrite-by-freshness; no write-write ordering needed.
    pub fn set(&self, id: &str, entry: CacheEntry) {
        self.entries.insert(id.to_string(), entry);
    }

    pub fn invalidate(&self, id: &str) {
        self.entries.remove(id);
    }
}
