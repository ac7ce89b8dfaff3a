//! M3U8 rewriting engine
//!
//! Rewrites a playlist so every referenced URL routes back through the proxy.
//! Nested manifests go to the manifest route, everything else to the segment
//! route, and the header-hint token rides along on each rewritten URL.

use crate::{proxy_url_for, MANIFEST_ROUTE, SEGMENT_ROUTE};

/// Rewrite URLs inside an M3U8 playlist so they proxy through the server.
///
/// Line-oriented: directive lines get their quoted `URI="..."` attributes
/// rewritten, bare reference lines are replaced whole, blank lines pass
/// through unchanged.
#[must_use]
pub fn rewrite_manifest(manifest: &str, source_url: &str, header_token: &str) -> String {
    let base = url::Url::parse(source_url).ok();

    manifest
        .split('\n')
        .map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return line.to_string();
            }
            if trimmed.starts_with('#') {
                return rewrite_uri_attribute(line, base.as_ref(), header_token);
            }
            proxied_reference(trimmed, base.as_ref(), header_token)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resolve a possibly-relative reference and route it through the proxy.
fn proxied_reference(raw: &str, base: Option<&url::Url>, token: &str) -> String {
    let absolute = make_absolute(raw, base);
    let route = if absolute.contains(".m3u8") {
        MANIFEST_ROUTE
    } else {
        SEGMENT_ROUTE
    };
    proxy_url_for(route, &absolute, token)
}

/// Resolve a possibly-relative URL to absolute using the given base URL.
fn make_absolute(raw: &str, base: Option<&url::Url>) -> String {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_string();
    }
    if let Some(base) = base {
        if let Ok(joined) = base.join(raw) {
            return joined.to_string();
        }
    }
    raw.to_string()
}

/// Rewrite any `URI="..."` values found in an M3U8 tag line.
fn rewrite_uri_attribute(line: &str, base: Option<&url::Url>, token: &str) -> String {
    let pattern = "URI=\"";
    let mut result = String::with_capacity(line.len());
    let mut remaining = line;

    while let Some(start) = remaining.find(pattern) {
        result.push_str(&remaining[..start + pattern.len()]);
        remaining = &remaining[start + pattern.len()..];

        if let Some(end) = remaining.find('"') {
            result.push_str(&proxied_reference(&remaining[..end], base, token));
            result.push('"');
            remaining = &remaining[end + 1..];
        } else {
            result.push_str(remaining);
            remaining = "";
        }
    }

    result.push_str(remaining);
    result
}
