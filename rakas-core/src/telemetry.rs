//! Traffic and connector-status telemetry
//!
//! Process-lifetime aggregates consumed by the admin surface: per-source
//! status counters, an active-stream gauge, a bounded ring of per-minute
//! traffic buckets and a sliding-window viewer map. Nothing here persists
//! across restarts.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;

use crate::resolver::AttemptStatus;

/// Traffic buckets kept in the ring: 240 minutes, about four hours.
const MAX_BUCKETS: usize = 240;

/// Viewers unseen for longer than this stop counting as active.
const VIEWER_WINDOW: Duration = Duration::from_secs(45);

/// Monotonic per-source counters, reset only by process restart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub ok: u64,
    pub forbidden: u64,
    pub not_found: u64,
    pub errors: u64,
    pub last_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl Default for SourceStatus {
    fn default() -> Self {
        Self {
            ok: 0,
            forbidden: 0,
            not_found: 0,
            errors: 0,
            last_status: "never".to_string(),
            last_checked_at: None,
        }
    }
}

impl SourceStatus {
    fn record(&mut self, status: &AttemptStatus) {
        match status {
            AttemptStatus::Ok | AttemptStatus::Http(200) => self.ok += 1,
            AttemptStatus::Http(403) => self.forbidden += 1,
            AttemptStatus::Http(404) => self.not_found += 1,
            _ => self.errors += 1,
        }
        self.last_status = status.to_string();
        self.last_checked_at = Some(Utc::now());
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrafficBucket {
    /// Minute-aligned epoch milliseconds.
    pub minute: i64,
    pub bytes: u64,
}

#[derive(Debug, Default)]
struct Traffic {
    active_streams: i64,
    total_bytes: u64,
    buckets: VecDeque<TrafficBucket>,
}

pub struct Telemetry {
    connector_status: DashMap<String, SourceStatus>,
    endpoint_status: DashMap<String, SourceStatus>,
    traffic: Mutex<Traffic>,
    viewers: DashMap<String, Instant>,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connector_status: DashMap::new(),
            endpoint_status: DashMap::new(),
            traffic: Mutex::new(Traffic::default()),
            viewers: DashMap::new(),
        }
    }

    pub fn record_connector(&self, source: &str, status: &AttemptStatus) {
        self.connector_status
            .entry(source.to_string())
            .or_default()
            .record(status);
    }

    pub fn record_endpoint(&self, source: &str, status: &AttemptStatus) {
        self.endpoint_status
            .entry(source.to_string())
            .or_default()
            .record(status);
    }

    /// Fold completed-transfer bytes into the current minute bucket.
    pub fn add_traffic_bytes(&self, bytes: u64) {
        let minute = Utc::now().timestamp_millis() / 60_000 * 60_000;
        self.add_traffic_bytes_at(minute, bytes);
    }

    fn add_traffic_bytes_at(&self, minute: i64, bytes: u64) {
        let mut traffic = self.traffic.lock();
        traffic.total_bytes += bytes;
        match traffic.buckets.back_mut() {
            Some(last) if last.minute == minute => last.bytes += bytes,
            _ => {
                traffic.buckets.push_back(TrafficBucket { minute, bytes });
                if traffic.buckets.len() > MAX_BUCKETS {
                    traffic.buckets.pop_front();
                }
            }
        }
    }

    fn end_stream(&self) {
        let mut traffic = self.traffic.lock();
        traffic.active_streams = (traffic.active_streams - 1).max(0);
    }

    /// Record viewer liveness for a client identity.
    pub fn mark_viewer(&self, key: &str) {
        self.viewers.insert(key.to_string(), Instant::now());
    }

    /// Evict stale viewers, then count the survivors.
    pub fn active_viewer_count(&self) -> usize {
        self.viewers.retain(|_, seen| seen.elapsed() <= VIEWER_WINDOW);
        self.viewers.len()
    }

    /// Point-in-time snapshot for the admin surface.
    #[must_use]
    pub fn snapshot(&self) -> TelemetrySnapshot {
        let traffic = self.traffic.lock();
        TelemetrySnapshot {
            connectors: collect_status(&self.connector_status),
            endpoints: collect_status(&self.endpoint_status),
            traffic: TrafficSnapshot {
                active_streams: traffic.active_streams,
                active_viewers: self.active_viewer_count(),
                total_bytes: traffic.total_bytes,
                buckets: traffic.buckets.iter().cloned().collect(),
            },
        }
    }
}

fn collect_status(map: &DashMap<String, SourceStatus>) -> BTreeMap<String, SourceStatus> {
    map.iter()
        .map(|entry| (entry.key().clone(), entry.value().clone()))
        .collect()
}

/// RAII release of the active-stream gauge.
pub struct StreamGuard {
    telemetry: Arc<Telemetry>,
}

impl StreamGuard {
    /// Open a stream accounting guard; the gauge is released exactly once
    /// when the guard drops, whatever terminal event got there first.
    #[must_use]
    pub fn begin(telemetry: Arc<Telemetry>) -> Self {
        telemetry.traffic.lock().active_streams += 1;
        Self { telemetry }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.telemetry.end_stream();
    }
}

#[derive(Debug, Serialize)]
pub struct TelemetrySnapshot {
    pub connectors: BTreeMap<String, SourceStatus>,
    pub endpoints: BTreeMap<String, SourceStatus>,
    pub traffic: TrafficSnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSnapshot {
    pub active_streams: i64,
    pub active_viewers: usize,
    pub total_bytes: u64,
    pub buckets: Vec<TrafficBucket>,
}
