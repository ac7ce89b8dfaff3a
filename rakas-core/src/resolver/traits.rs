// Connector interface for the resolution engine.

use async_trait::async_trait;

use super::context::{ResolutionContext, ResolvedSource};

/// Tagged result of one connector attempt.
#[derive(Debug, Clone)]
pub enum ConnectorOutcome {
    /// The connector produced a playable source.
    Resolved(ResolvedSource),
    /// The upstream replied with an explicit error status.
    HttpStatus(u16),
    /// Timeout, transport failure or unusable payload.
    Failed,
}

/// A pluggable resolution strategy that turns a content identifier into a
/// manifest URL.
///
/// Connectors are built once from configuration and tried strictly in
/// configured order; the first to resolve wins. Implementations must never
/// panic on upstream garbage — classify and return instead.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Stable name used for attribution in attempts and status counters.
    fn name(&self) -> &str;

    async fn resolve(&self, ctx: &ResolutionContext) -> ConnectorOutcome;
}
