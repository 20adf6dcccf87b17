//! Integration tests for capsule-api endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - CORS headers and preflight
//! - Signed URL generation, validation errors, missing credentials
//! - Catalog proxy: lite/full validation, upstream failures, retry, timeout

mod helpers;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use capsule_api::{build_router, AppState};
use capsule_common::config::TomlConfig;
use helpers::{spawn_fake_b2, test_config, FakeB2, TEST_BUCKET_NAME};
use serde_json::Value;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: Create app from config
fn setup_app(config: TomlConfig) -> Router {
    let state = AppState::new(config).expect("Should build app state");
    build_router(state)
}

/// Test helper: Create GET request
fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

fn header_value(response: &Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn fake_app() -> (FakeB2, Router) {
    let fake = spawn_fake_b2().await;
    let app = setup_app(test_config(&fake));
    (fake, app)
}

// =============================================================================
// Health + CORS
// =============================================================================

#[tokio::test]
async fn test_health_reports_missing_b2_settings() {
    let app = setup_app(TomlConfig::default());
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = extract_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["module"], "capsule-api");
    assert_eq!(
        json["missing_settings"],
        serde_json::json!(["B2_KEY_ID", "B2_APPLICATION_KEY", "B2_BUCKET_ID", "B2_BUCKET_NAME"])
    );
}

#[tokio::test]
async fn test_health_ok_when_configured() {
    let (fake, app) = fake_app().await;
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = extract_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["missing_settings"], serde_json::json!([]));
    assert!(json["git_hash"].is_string());
    assert_eq!(fake.hits("authorize"), 0);
}

#[tokio::test]
async fn test_preflight_returns_204_with_cors() {
    let app = setup_app(TomlConfig::default());
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/b2/sign")
        .header(header::ORIGIN, "https://radio.example")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        header_value(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN).as_deref(),
        Some("https://radio.example")
    );
    assert_eq!(
        header_value(&response, header::ACCESS_CONTROL_ALLOW_METHODS).as_deref(),
        Some("GET,OPTIONS")
    );
    assert_eq!(
        header_value(&response, header::ACCESS_CONTROL_ALLOW_HEADERS).as_deref(),
        Some("Content-Type")
    );
}

#[tokio::test]
async fn test_catalog_preflight_without_origin_allows_any() {
    let app = setup_app(TomlConfig::default());
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/catalog")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        header_value(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN).as_deref(),
        Some("*")
    );
}

// =============================================================================
// GET /api/b2/sign
// =============================================================================

#[tokio::test]
async fn test_sign_returns_signed_url() {
    let (fake, app) = fake_app().await;
    let request = Request::builder()
        .uri("/api/b2/sign?file=mp3/t1.mp3")
        .header(header::ORIGIN, "https://radio.example")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_value(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN).as_deref(),
        Some("https://radio.example")
    );

    let json = extract_json(response).await;
    assert_eq!(
        json["url"],
        format!(
            "{}/file/{}/mp3/t1.mp3?Authorization=dl-token-900",
            fake.base_url, TEST_BUCKET_NAME
        )
    );
    assert_eq!(json["expiresIn"], 900);
    assert_eq!(json["file"], "mp3/t1.mp3");

    let auth_requests = fake.download_auth_requests();
    assert_eq!(auth_requests.len(), 1);
    assert_eq!(auth_requests[0]["bucketId"], "bucket-123");
    assert_eq!(auth_requests[0]["fileNamePrefix"], "mp3/t1.mp3");
    assert_eq!(auth_requests[0]["validDurationInSeconds"], 900);
}

#[tokio::test]
async fn test_sign_custom_expiry() {
    let (fake, app) = fake_app().await;
    let response = app
        .oneshot(get_request("/api/b2/sign?file=audio/t1.wav&expiresIn=120"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = extract_json(response).await;
    assert_eq!(json["expiresIn"], 120);
    assert!(json["url"].as_str().unwrap().ends_with("Authorization=dl-token-120"));
    assert_eq!(fake.download_auth_requests()[0]["validDurationInSeconds"], 120);
}

#[tokio::test]
async fn test_sign_repeated_file_param_uses_first() {
    let (fake, app) = fake_app().await;
    let response = app
        .oneshot(get_request("/api/b2/sign?file=mp3/a.mp3&file=mp3/b.mp3"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = extract_json(response).await;
    assert_eq!(json["file"], "mp3/a.mp3");
    assert_eq!(fake.download_auth_requests()[0]["fileNamePrefix"], "mp3/a.mp3");
}

#[tokio::test]
async fn test_sign_query_errors_are_json() {
    let (fake, app) = fake_app().await;
    for uri in [
        "/api/b2/sign?file=private/a.txt&file=mp3/a.mp3",
        "/api/b2/sign?file=%ZZ",
    ] {
        let response = app.clone().oneshot(get_request(uri)).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(
            header_value(&response, header::CONTENT_TYPE).as_deref(),
            Some("application/json")
        );
        let json = extract_json(response).await;
        assert_eq!(json["error"], "File not allowed");
    }
    assert_eq!(fake.hits("authorize"), 0);
}

#[tokio::test]
async fn test_sign_disallowed_prefix_is_403() {
    let (fake, app) = fake_app().await;
    let response = app
        .oneshot(get_request("/api/b2/sign?file=private/keys.txt"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        header_value(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN).as_deref(),
        Some("*")
    );
    let json = extract_json(response).await;
    assert_eq!(json["error"], "File not allowed");
    assert_eq!(fake.hits("authorize"), 0);
}

#[tokio::test]
async fn test_sign_missing_file_is_400() {
    let (_fake, app) = fake_app().await;
    let response = app.oneshot(get_request("/api/b2/sign")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = extract_json(response).await;
    assert_eq!(json["error"], "Missing file query param");
}

#[tokio::test]
async fn test_sign_expiry_out_of_range_is_400() {
    let (_fake, app) = fake_app().await;
    for uri in [
        "/api/b2/sign?file=mp3/t1.mp3&expiresIn=30",
        "/api/b2/sign?file=mp3/t1.mp3&expiresIn=7200",
        "/api/b2/sign?file=mp3/t1.mp3&expiresIn=abc",
    ] {
        let response = app.clone().oneshot(get_request(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_sign_missing_credentials_is_500() {
    let (fake, _) = fake_app().await;
    let mut config = test_config(&fake);
    config.b2.key_id = None;
    let app = setup_app(config);

    let response = app
        .oneshot(get_request("/api/b2/sign?file=mp3/t1.mp3"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = extract_json(response).await;
    assert_eq!(json["error"], "Missing B2_KEY_ID");
}

#[tokio::test]
async fn test_sign_rejected_credentials_is_502() {
    let (fake, _) = fake_app().await;
    let mut config = test_config(&fake);
    config.b2.application_key = Some("wrong".to_string());
    let app = setup_app(config);

    let response = app
        .oneshot(get_request("/api/b2/sign?file=mp3/t1.mp3"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = extract_json(response).await;
    assert_eq!(json["error"], "Upstream request failed: 401 bad_auth_token");
    // 401 is not retryable
    assert_eq!(fake.hits("authorize"), 1);
}

// =============================================================================
// GET /api/catalog
// =============================================================================

#[tokio::test]
async fn test_catalog_default_lite() {
    let (fake, app) = fake_app().await;
    let response = app.oneshot(get_request("/api/catalog")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        header_value(&response, header::CACHE_CONTROL).as_deref(),
        Some("public, max-age=300, s-maxage=300")
    );
    assert_eq!(
        header_value(&response, header::ACCESS_CONTROL_ALLOW_ORIGIN).as_deref(),
        Some("*")
    );

    let json = extract_json(response).await;
    assert_eq!(json["meta"]["bucket"], TEST_BUCKET_NAME);
    assert_eq!(json["tracks"].as_array().unwrap().len(), 2);
    assert_eq!(json["tracks"][0]["id"], "t1");
    assert_eq!(json["tracks"][0]["durationSeconds"].as_f64(), Some(184.5));
    assert!(json["tracks"][1]["durationSeconds"].is_null());

    let auth_requests = fake.download_auth_requests();
    assert_eq!(auth_requests[0]["fileNamePrefix"], "index/catalog-lite.json");
    assert_eq!(auth_requests[0]["validDurationInSeconds"], 300);
}

#[tokio::test]
async fn test_catalog_full() {
    let (_fake, app) = fake_app().await;
    let response = app
        .oneshot(get_request("/api/catalog?file=index/catalog.json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = extract_json(response).await;
    let track = &json["tracks"][0];
    assert_eq!(track["audio"]["b2Mp3Key"], "mp3/t1.mp3");
    assert_eq!(track["source"]["filename"], "t1.json");
    assert_eq!(track["tags"]["conditions"][0], "night");
}

#[tokio::test]
async fn test_catalog_outside_index_is_403() {
    let (fake, app) = fake_app().await;
    let response = app
        .oneshot(get_request("/api/catalog?file=mp3/t1.mp3"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = extract_json(response).await;
    assert_eq!(json["error"], "File not allowed");
    assert_eq!(fake.hits("authorize"), 0);
}

#[tokio::test]
async fn test_catalog_repeated_file_param_uses_first() {
    let (fake, app) = fake_app().await;
    let response = app
        .oneshot(get_request(
            "/api/catalog?file=mp3/t1.mp3&file=index/catalog-lite.json",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = extract_json(response).await;
    assert_eq!(json["error"], "File not allowed");
    assert_eq!(fake.hits("authorize"), 0);
}

#[tokio::test]
async fn test_catalog_failing_contract_is_500() {
    let (_fake, app) = fake_app().await;
    let response = app
        .oneshot(get_request("/api/catalog?file=index/catalog-lite-broken.json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = extract_json(response).await;
    assert_eq!(json["error"], "Internal server error");
}

#[tokio::test]
async fn test_catalog_upstream_404_is_500() {
    let (fake, app) = fake_app().await;
    let response = app
        .oneshot(get_request("/api/catalog?file=index/missing.json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(fake.hits("index/missing.json"), 1);
}

#[tokio::test]
async fn test_catalog_retries_transient_status() {
    let (fake, app) = fake_app().await;
    let response = app
        .oneshot(get_request("/api/catalog?file=index/flaky.json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(fake.hits("index/flaky.json"), 3);
}

#[tokio::test]
async fn test_catalog_timeout_is_504() {
    let fake = spawn_fake_b2().await;
    let mut config = test_config(&fake);
    config.http.timeout_ms = 200;
    config.http.retries = 0;
    let app = setup_app(config);

    let response = app
        .oneshot(get_request("/api/catalog?file=index/slow.json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let json = extract_json(response).await;
    assert_eq!(json["error"], "Upstream request timed out");
}
