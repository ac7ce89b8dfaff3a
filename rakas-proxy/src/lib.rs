//! Shared media proxy utilities
//!
//! Provides the header-hint codec and the M3U8 rewriting engine used by the
//! proxy routes in `rakas-api` and the resolution engine in `rakas-core`.

pub mod hints;
pub mod rewrite;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Proxy route serving rewritten playlists.
pub const MANIFEST_ROUTE: &str = "/api/proxy/manifest";
/// Proxy route streaming raw segment bytes.
pub const SEGMENT_ROUTE: &str = "/api/proxy/segment";

/// Characters escaped when embedding a target URL as a query value.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a string for use as a URL query parameter value.
#[must_use]
pub fn encode_query_value(input: &str) -> String {
    utf8_percent_encode(input, QUERY_VALUE).to_string()
}

/// Build a proxy-relative URL for `target` on the given route, carrying the
/// header-hint token when one is present.
#[must_use]
pub fn proxy_url_for(route: &str, target: &str, token: &str) -> String {
    let mut out = format!("{route}?url={}", encode_query_value(target));
    if !token.is_empty() {
        out.push_str("&h=");
        out.push_str(token);
    }
    out
}

/// Build the manifest-proxy URL handed back to clients after resolution.
#[must_use]
pub fn manifest_proxy_url(target: &str, token: &str) -> String {
    proxy_url_for(MANIFEST_ROUTE, target, token)
}
