use std::collections::HashMap;

/// Immutable per-attempt resolution input.
///
/// Season and episode default to 1 when absent or non-numeric.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub content_id: String,
    pub season: u32,
    pub episode: u32,
}

impl ResolutionContext {
    pub fn new(content_id: impl Into<String>, season: u32, episode: u32) -> Self {
        Self {
            content_id: content_id.into(),
            season: season.max(1),
            episode: episode.max(1),
        }
    }
}

/// Parse a season/episode query value, defaulting to 1 when absent,
/// non-numeric or zero.
#[must_use]
pub fn parse_ordinal(raw: Option<&str>) -> u32 {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|&n| n >= 1)
        .unwrap_or(1)
}

/// A successful resolution produced by a connector or endpoint template.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    /// Connector or endpoint name, used for attribution.
    pub source: String,
    /// Absolute manifest URL; never empty.
    pub manifest_url: String,
    /// Upstream headers required for playback fetches.
    pub headers: HashMap<String, String>,
    /// Opaque source-specific metadata.
    pub meta: HashMap<String, String>,
}
