use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use wiremock::matchers::{header as mock_header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rakas_core::alert::AlertWebhook;
use rakas_core::network::NetworkStrategy;
use rakas_core::resolver::ResolverService;
use rakas_core::telemetry::Telemetry;
use rakas_core::Config;
use rakas_proxy::hints::encode_header_hints;

use super::{create_router, AppState};

fn build_state(config: Config) -> AppState {
    let telemetry = Arc::new(Telemetry::new());
    let resolver = Arc::new(ResolverService::from_config(
        &config.resolver,
        telemetry.clone(),
        AlertWebhook::new(&config.alert.webhook_url),
    ));
    let network = Arc::new(NetworkStrategy::from_config(&config.network));
    AppState::new(&config, resolver, network, telemetry)
}

fn router_with(config: Config) -> (Router, AppState) {
    let state = build_state(config);
    (create_router(state.clone()), state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .extension(ConnectInfo::<SocketAddr>(
            "127.0.0.1:54321".parse().expect("addr"),
        ))
        .body(Body::empty())
        .expect("request")
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn healthz_is_open() {
    let (router, _) = router_with(Config::default());
    let response = router.oneshot(get("/healthz")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn resolve_without_id_is_bad_request() {
    let (router, _) = router_with(Config::default());
    let response = router.oneshot(get("/api/resolve")).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Missing id query parameter"
    );
}

#[tokio::test]
async fn resolve_via_endpoint_returns_proxy_url() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resolve"))
        .and(query_param("id", "tmdb-550"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "ok",
            "manifestUrl": "https://cdn.example.com/master.m3u8",
            "headers": {"Referer": "https://app.local"}
        })))
        .mount(&upstream)
        .await;

    let mut config = Config::default();
    config.resolver.endpoints = format!("{}/resolve?id={{id}}", upstream.uri());
    let (router, _) = router_with(config);

    let response = router
        .oneshot(get("/api/resolve?id=tmdb-550"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["metadataId"], "tmdb-550");
    assert_eq!(json["manifestUrl"], "https://cdn.example.com/master.m3u8");
    let proxy_url = json["proxyUrl"].as_str().expect("proxyUrl");
    assert!(proxy_url.starts_with("/api/proxy/manifest?url="));
    assert!(proxy_url.contains("&h="));
    assert_eq!(json["attempts"].as_array().expect("attempts").len(), 0);
    let expected_source = format!("127.0.0.1:{}", upstream.address().port());
    assert_eq!(json["source"], expected_source.as_str());
}

#[tokio::test]
async fn resolve_total_failure_returns_502_with_attempt_trail() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&upstream)
        .await;

    let mut config = Config::default();
    config.resolver.endpoints = format!("{}/resolve?id={{id}}", upstream.uri());
    let (router, _) = router_with(config);

    let response = router
        .oneshot(get("/api/resolve?id=tmdb-550"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let json = body_json(response).await;
    assert_eq!(json["error"], "No active source available");
    assert_eq!(json["attempts"][0]["status"], "http_500");
}

#[tokio::test]
async fn report_queues_and_accepts() {
    let (router, state) = router_with(Config::default());

    let response = router
        .oneshot(post_json("/api/report", r#"{"metadataId": "tmdb-550"}"#))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["queued"], "tmdb-550");

    // Background refresh may already have drained-and-requeued nothing; the
    // queue must contain the reported id until a health cycle runs.
    let drained = state.resolver.drain_refresh_queue();
    assert!(drained.contains(&"tmdb-550".to_string()));
}

#[tokio::test]
async fn report_rejects_bad_input() {
    let (router, _) = router_with(Config::default());
    let response = router
        .clone()
        .oneshot(post_json("/api/report", "{not json"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .oneshot(post_json("/api/report", "{}"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "metadataId is required");
}

#[tokio::test]
async fn manifest_proxy_rewrites_playlist() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/master.m3u8"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1000\nlevel.m3u8\n#EXTINF:4,\nseg-1.ts"),
        )
        .mount(&upstream)
        .await;

    let (router, _) = router_with(Config::default());
    let target = rakas_proxy::encode_query_value(&format!("{}/master.m3u8", upstream.uri()));
    let response = router
        .oneshot(get(&format!("/api/proxy/manifest?url={target}&h=abc")))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.apple.mpegurl"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");

    let body = response.into_body().collect().await.expect("body").to_bytes();
    let text = String::from_utf8(body.to_vec()).expect("utf-8");
    assert!(text.contains("/api/proxy/manifest?url="));
    assert!(text.contains("level.m3u8"));
    assert!(text.contains("/api/proxy/segment?url="));
    assert!(text.contains("&h=abc"));
}

#[tokio::test]
async fn manifest_proxy_replays_header_hints_upstream() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/master.m3u8"))
        .and(mock_header("Referer", "https://app.local"))
        .respond_with(ResponseTemplate::new(200).set_body_string("#EXTM3U"))
        .expect(1)
        .mount(&upstream)
        .await;

    let token = encode_header_hints(&std::collections::HashMap::from([
        ("Referer".to_string(), "https://app.local".to_string()),
        ("Cookie".to_string(), "must-not-leak".to_string()),
    ]));

    let (router, _) = router_with(Config::default());
    let target = rakas_proxy::encode_query_value(&format!("{}/master.m3u8", upstream.uri()));
    let response = router
        .oneshot(get(&format!("/api/proxy/manifest?url={target}&h={token}")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn manifest_proxy_surfaces_upstream_status() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&upstream)
        .await;

    let (router, _) = router_with(Config::default());
    let target = rakas_proxy::encode_query_value(&format!("{}/gone.m3u8", upstream.uri()));
    let response = router
        .oneshot(get(&format!("/api/proxy/manifest?url={target}")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["error"],
        "Manifest upstream returned 404"
    );
}

#[tokio::test]
async fn proxy_routes_enforce_url_param_and_allow_list() {
    let mut config = Config::default();
    config.proxy.allow_hosts = "allowed.example".to_string();
    let (router, _) = router_with(config);

    let response = router
        .clone()
        .oneshot(get("/api/proxy/manifest"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let target = rakas_proxy::encode_query_value("https://other.example/master.m3u8");
    let response = router
        .clone()
        .oneshot(get(&format!("/api/proxy/manifest?url={target}")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let target = rakas_proxy::encode_query_value("not a url");
    let response = router
        .oneshot(get(&format!("/api/proxy/segment?url={target}")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn segment_proxy_streams_bytes_and_commits_traffic() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/seg-1.ts"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "video/mp2t")
                .set_body_bytes(b"0123456789".to_vec()),
        )
        .mount(&upstream)
        .await;

    let (router, state) = router_with(Config::default());
    let target = rakas_proxy::encode_query_value(&format!("{}/seg-1.ts", upstream.uri()));
    let response = router
        .oneshot(get(&format!("/api/proxy/segment?url={target}")))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp2t");
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "public, max-age=60"
    );

    let body = response.into_body().collect().await.expect("body").to_bytes();
    assert_eq!(&body[..], b"0123456789");

    let snapshot = state.telemetry.snapshot();
    assert_eq!(snapshot.traffic.total_bytes, 10);
    assert_eq!(snapshot.traffic.active_streams, 0);
    assert_eq!(snapshot.traffic.active_viewers, 1);
}

#[tokio::test]
async fn segment_proxy_forwards_range_requests() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/seg-1.ts"))
        .and(mock_header("Range", "bytes=0-3"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("Content-Range", "bytes 0-3/10")
                .set_body_bytes(b"0123".to_vec()),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let (router, _) = router_with(Config::default());
    let target = rakas_proxy::encode_query_value(&format!("{}/seg-1.ts", upstream.uri()));
    let mut request = get(&format!("/api/proxy/segment?url={target}"));
    request
        .headers_mut()
        .insert(header::RANGE, "bytes=0-3".parse().expect("range"));

    let response = router.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 0-3/10");
}

#[tokio::test]
async fn segment_proxy_surfaces_upstream_errors() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&upstream)
        .await;

    let (router, state) = router_with(Config::default());
    let target = rakas_proxy::encode_query_value(&format!("{}/seg-1.ts", upstream.uri()));
    let response = router
        .oneshot(get(&format!("/api/proxy/segment?url={target}")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // No stream ever started, so the gauge is untouched.
    assert_eq!(state.telemetry.snapshot().traffic.active_streams, 0);
}

#[tokio::test]
async fn admin_routes_fail_closed_without_configured_secret() {
    let (router, _) = router_with(Config::default());
    let mut request = get("/api/admin/status");
    request
        .headers_mut()
        .insert("x-admin-password", "anything".parse().expect("header"));
    let response = router.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_status_requires_exact_secret() {
    let mut config = Config::default();
    config.admin.password = "s3cret".to_string();
    let (router, _) = router_with(config);

    let response = router
        .clone()
        .oneshot(get("/api/admin/status"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mut request = get("/api/admin/status");
    request
        .headers_mut()
        .insert("x-admin-password", "s3cret".parse().expect("header"));
    let response = router.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json.get("connectors").is_some());
    assert!(json.get("endpoints").is_some());
    assert!(json["traffic"].get("activeStreams").is_some());
    assert!(json["traffic"].get("buckets").is_some());
}

#[tokio::test]
async fn admin_refresh_validates_body() {
    let mut config = Config::default();
    config.admin.password = "s3cret".to_string();
    let (router, _) = router_with(config);

    let mut request = post_json("/api/admin/refresh", "{}");
    request
        .headers_mut()
        .insert("x-admin-password", "s3cret".parse().expect("header"));
    let response = router.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "metadataId is required");
}

#[tokio::test]
async fn admin_refresh_reports_attempts() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "manifestUrl": "https://cdn.example.com/master.m3u8"
        })))
        .mount(&upstream)
        .await;

    let mut config = Config::default();
    config.admin.password = "s3cret".to_string();
    config.resolver.endpoints = format!("{}/resolve?id={{id}}", upstream.uri());
    let (router, _) = router_with(config);

    let mut request = post_json("/api/admin/refresh", r#"{"metadataId": "tmdb-550"}"#);
    request
        .headers_mut()
        .insert("x-admin-password", "s3cret".parse().expect("header"));
    let response = router.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["metadataId"], "tmdb-550");
}

#[tokio::test]
async fn cors_headers_are_permissive() {
    let (router, _) = router_with(Config::default());
    let response = router.oneshot(get("/healthz")).await.expect("response");
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}
