//! Header-hint codec
//!
//! Upstream manifest and segment fetches may require a `Referer`, `Origin` or
//! `Authorization` value that the client must never see in cleartext. The
//! codec packs those headers into an opaque URL-safe token carried on every
//! rewritten proxy URL, so follow-up fetches replay the same hints.

use std::collections::HashMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

/// Header names allowed to survive decoding. Anything else in the token is
/// dropped, whatever the upstream payload claimed.
const ALLOWED_HEADERS: [&str; 4] = ["Referer", "Origin", "User-Agent", "Authorization"];

/// Tokens longer than this decode to an empty map.
const MAX_TOKEN_LEN: usize = 4096;

/// Individual header values at or beyond this length are rejected.
const MAX_VALUE_LEN: usize = 500;

/// Encode a header map into a URL-safe token.
#[must_use]
pub fn encode_header_hints(headers: &HashMap<String, String>) -> String {
    if headers.is_empty() {
        return String::new();
    }
    match serde_json::to_vec(headers) {
        Ok(bytes) => URL_SAFE_NO_PAD.encode(bytes),
        Err(_) => String::new(),
    }
}

/// Decode a token back into a header map.
///
/// Decoding is defensive: an empty, oversized or malformed token yields an
/// empty map, and only the allow-listed header names are retained, each
/// capped in length.
#[must_use]
pub fn decode_header_hints(encoded: &str) -> HashMap<String, String> {
    if encoded.is_empty() || encoded.len() > MAX_TOKEN_LEN {
        return HashMap::new();
    }

    let Ok(raw) = URL_SAFE_NO_PAD.decode(encoded) else {
        return HashMap::new();
    };
    let Ok(parsed) = serde_json::from_slice::<serde_json::Value>(&raw) else {
        return HashMap::new();
    };
    let Some(object) = parsed.as_object() else {
        return HashMap::new();
    };

    let mut allowed = HashMap::new();
    for name in ALLOWED_HEADERS {
        if let Some(value) = object.get(name).and_then(|v| v.as_str()) {
            if value.len() < MAX_VALUE_LEN {
                allowed.insert(name.to_string(), value.to_string());
            }
        }
    }
    allowed
}
