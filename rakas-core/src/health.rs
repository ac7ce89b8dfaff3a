//! Background health/refresh loop
//!
//! Periodically force-refreshes the most popular catalog identifiers plus
//! anything queued by dead-link reports or admin action, so stale or dead
//! sources surface independently of live client traffic.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::catalog::Catalog;
use crate::resolver::{ResolveOptions, ResolverService};

/// Spawn the refresh loop. The first cycle runs immediately.
pub fn spawn_health_loop(
    resolver: Arc<ResolverService>,
    catalog: Catalog,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            run_health_cycle(&resolver, &catalog).await;
        }
    })
}

/// One refresh cycle: popular identifiers unioned with the drained queue,
/// each force-resolved in turn. Failures alert through the resolver's own
/// alerting path; the cycle itself never fails.
pub async fn run_health_cycle(resolver: &ResolverService, catalog: &Catalog) {
    let mut ids: HashSet<String> = catalog.top_popular_ids().await.into_iter().collect();
    for id in resolver.drain_refresh_queue() {
        ids.insert(id);
    }

    if ids.is_empty() {
        return;
    }
    tracing::debug!(count = ids.len(), "Health check cycle starting");

    let options = ResolveOptions {
        force: true,
        ..ResolveOptions::default()
    };
    for id in ids {
        let outcome = resolver.resolve(&id, &options).await;
        if !outcome.ok {
            tracing::warn!(metadata_id = %id, "Health refresh found no working source");
        }
    }
}
