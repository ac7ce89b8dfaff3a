//! Manifest and segment streaming proxy
//!
//! Both routes fetch the target through the outbound network strategy with
//! the decoded header hints, so restricted upstream headers replay without
//! ever reaching the client. Manifests are rewritten before returning;
//! segments stream through with range passthrough and byte accounting.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;

use rakas_core::network::MediaType;
use rakas_core::telemetry::{StreamGuard, Telemetry};
use rakas_proxy::hints::decode_header_hints;
use rakas_proxy::rewrite::rewrite_manifest;

use super::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
    #[serde(default)]
    pub h: String,
}

/// GET /api/proxy/manifest - fetch, rewrite and return a playlist
pub async fn manifest_proxy(
    State(state): State<AppState>,
    Query(query): Query<ProxyQuery>,
) -> AppResult<Response> {
    let target = require_allowed_target(&state, query.url.as_deref())?;
    let hints = decode_header_hints(&query.h);
    tracing::debug!(target = %target, "Proxying manifest request");

    let upstream = fetch_upstream(&state, &target, MediaType::Manifest, hints)
        .await
        .map_err(|e| AppError::bad_gateway(format!("Manifest fetch failed: {e}")))?;

    let status = upstream.status();
    if !status.is_success() {
        return Err(AppError::upstream_status(
            status.as_u16(),
            format!("Manifest upstream returned {}", status.as_u16()),
        ));
    }

    let manifest = upstream
        .text()
        .await
        .map_err(|e| AppError::bad_gateway(format!("Manifest fetch failed: {e}")))?;
    let rewritten = rewrite_manifest(&manifest, &target, &query.h);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/vnd.apple.mpegurl")
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(rewritten))
        .map_err(|e| AppError::bad_gateway(format!("Failed to build response: {e}")))
}

/// GET /api/proxy/segment - stream media bytes with range passthrough
pub async fn segment_proxy(
    State(state): State<AppState>,
    Query(query): Query<ProxyQuery>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let target = require_allowed_target(&state, query.url.as_deref())?;

    let mut extra = decode_header_hints(&query.h);
    if let Some(range) = headers.get(header::RANGE).and_then(|v| v.to_str().ok()) {
        // Hints never carry Range, so this cannot clobber a hint.
        extra.insert("Range".to_string(), range.to_string());
    }

    let upstream = fetch_upstream(&state, &target, MediaType::Segment, extra)
        .await
        .map_err(|e| AppError::bad_gateway(format!("Segment fetch failed: {e}")))?;

    let status = upstream.status();
    if !status.is_success() && status != StatusCode::PARTIAL_CONTENT {
        return Err(AppError::upstream_status(
            status.as_u16(),
            format!("Segment upstream returned {}", status.as_u16()),
        ));
    }

    let guard = StreamGuard::begin(state.telemetry.clone());
    state.telemetry.mark_viewer(&viewer_key(&headers, peer));

    let mut builder = Response::builder()
        .status(status)
        .header(header::CACHE_CONTROL, "public, max-age=60");
    for name in [
        header::CONTENT_LENGTH,
        header::CONTENT_RANGE,
        header::CONTENT_TYPE,
    ] {
        if let Some(value) = upstream.headers().get(&name) {
            builder = builder.header(name, value.clone());
        }
    }

    let counted = CountingStream {
        inner: upstream.bytes_stream().boxed(),
        telemetry: state.telemetry.clone(),
        bytes: 0,
        committed: false,
        _guard: guard,
    };

    builder
        .body(Body::from_stream(counted))
        .map_err(|e| AppError::bad_gateway(format!("Failed to build response: {e}")))
}

/// Validate the `url` parameter and enforce the host allow-list.
fn require_allowed_target(state: &AppState, target: Option<&str>) -> Result<String, AppError> {
    let target = target
        .filter(|url| !url.is_empty())
        .ok_or_else(|| AppError::bad_request("Missing url query parameter"))?;

    if state.allowed_hosts.is_empty() {
        return Ok(target.to_string());
    }

    let allowed = url::Url::parse(target)
        .ok()
        .and_then(|parsed| {
            let host = parsed.host_str()?.to_string();
            Some(match parsed.port() {
                Some(port) => format!("{host}:{port}"),
                None => host,
            })
        })
        .is_some_and(|host| state.allowed_hosts.contains(&host));

    if allowed {
        Ok(target.to_string())
    } else {
        Err(AppError::forbidden("Target host is not allowed"))
    }
}

/// Fetch a target through the outbound network strategy: rotating
/// User-Agent, optional gateway reroute, then the per-request extra headers
/// (header hints and range) on top.
async fn fetch_upstream(
    state: &AppState,
    target: &str,
    media_type: MediaType,
    extra_headers: HashMap<String, String>,
) -> Result<reqwest::Response, reqwest::Error> {
    let mut url = target.to_string();
    let mut header_map = HeaderMap::new();

    if let Ok(ua) = HeaderValue::from_str(state.network.next_user_agent()) {
        header_map.insert(header::USER_AGENT, ua);
    }

    if let Some(gateway) = state.network.next_gateway() {
        if let Some(routed) = state.network.gateway_url(gateway, target, media_type) {
            url = routed;
            insert_headers(&mut header_map, &gateway.headers);
        }
    }
    insert_headers(&mut header_map, &extra_headers);

    let mut request = state.upstream_client.get(&url).headers(header_map);
    if media_type == MediaType::Manifest {
        request = request.timeout(state.manifest_timeout);
    }
    request.send().await
}

fn insert_headers(map: &mut HeaderMap, headers: &HashMap<String, String>) {
    for (name, value) in headers {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            continue;
        };
        let Ok(value) = HeaderValue::from_str(value) else {
            continue;
        };
        map.insert(name, value);
    }
}

/// Client identity for viewer accounting: first `X-Forwarded-For` entry,
/// else the socket peer address.
fn viewer_key(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}

/// Byte-counting passthrough over the upstream body.
///
/// Bytes commit to telemetry only when the upstream ends cleanly, so aborted
/// transfers are not over-counted. The guard releases the active-stream
/// gauge exactly once when the stream is dropped, whichever terminal event
/// (completion, upstream error, client disconnect) got there first.
struct CountingStream {
    inner: BoxStream<'static, Result<Bytes, reqwest::Error>>,
    telemetry: Arc<Telemetry>,
    bytes: u64,
    committed: bool,
    _guard: StreamGuard,
}

impl Stream for CountingStream {
    type Item = Result<Bytes, reqwest::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.bytes += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
            Poll::Ready(None) => {
                if !this.committed {
                    this.committed = true;
                    this.telemetry.add_traffic_bytes(this.bytes);
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
