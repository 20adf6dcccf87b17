//! Local stand-in for the Backblaze B2 API
//!
//! Serves `b2_authorize_account`, `b2_get_download_authorization` and
//! `/file/:bucket/*path` on 127.0.0.1 with an ephemeral port.
//!
//! Download paths with special behavior:
//! - `index/flaky.json`: 503 for the first two requests, then a full catalog
//! - `index/slow.json`: answers after two seconds
//! - `index/missing.json` (or any unknown path): 404

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use capsule_common::config::TomlConfig;
use serde_json::{json, Value};

pub const TEST_KEY_ID: &str = "test-key-id";
pub const TEST_APP_KEY: &str = "test-app-key";
pub const TEST_BUCKET_ID: &str = "bucket-123";
pub const TEST_BUCKET_NAME: &str = "capsule-audio";
pub const ACCOUNT_TOKEN: &str = "account-token";

#[derive(Clone, Default)]
struct FakeState {
    base_url: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    download_auth_requests: Arc<Mutex<Vec<Value>>>,
}

impl FakeState {
    fn hit(&self, key: &str) -> usize {
        let mut hits = self.hits.lock().unwrap();
        let count = hits.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

/// Running fake server
pub struct FakeB2 {
    pub base_url: String,
    state: FakeState,
}

impl FakeB2 {
    /// Number of requests seen for `key` (`"authorize"`, `"download_auth"` or a file path)
    pub fn hits(&self, key: &str) -> usize {
        self.state.hits.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    /// JSON bodies received by `b2_get_download_authorization`
    pub fn download_auth_requests(&self) -> Vec<Value> {
        self.state.download_auth_requests.lock().unwrap().clone()
    }
}

/// Config pointing at `fake` with complete credentials and fast backoff
pub fn test_config(fake: &FakeB2) -> TomlConfig {
    let mut config = TomlConfig::default();
    config.b2.key_id = Some(TEST_KEY_ID.to_string());
    config.b2.application_key = Some(TEST_APP_KEY.to_string());
    config.b2.bucket_id = Some(TEST_BUCKET_ID.to_string());
    config.b2.bucket_name = Some(TEST_BUCKET_NAME.to_string());
    config.b2.api_base_url = fake.base_url.clone();
    config.http.backoff_base_ms = 1;
    config.http.timeout_ms = 2_000;
    config
}

pub async fn spawn_fake_b2() -> FakeB2 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let state = FakeState {
        base_url: base_url.clone(),
        ..FakeState::default()
    };

    let app = Router::new()
        .route("/b2api/v2/b2_authorize_account", get(authorize_account))
        .route(
            "/b2api/v2/b2_get_download_authorization",
            post(download_authorization),
        )
        .route("/file/:bucket/*path", get(download_file))
        .with_state(state.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeB2 { base_url, state }
}

async fn authorize_account(State(state): State<FakeState>, headers: HeaderMap) -> Response {
    state.hit("authorize");
    let expected = capsule_api::b2::basic_auth(TEST_KEY_ID, TEST_APP_KEY);
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if provided != expected {
        return (StatusCode::UNAUTHORIZED, "bad_auth_token").into_response();
    }

    Json(json!({
        "accountId": "acct",
        "apiUrl": state.base_url,
        "authorizationToken": ACCOUNT_TOKEN,
        "downloadUrl": state.base_url,
    }))
    .into_response()
}

async fn download_authorization(
    State(state): State<FakeState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.hit("download_auth");
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if provided != ACCOUNT_TOKEN {
        return (StatusCode::UNAUTHORIZED, "bad_auth_token").into_response();
    }

    let seconds = body["validDurationInSeconds"].as_u64().unwrap_or(0);
    state.download_auth_requests.lock().unwrap().push(body);

    Json(json!({
        "bucketId": TEST_BUCKET_ID,
        "authorizationToken": format!("dl-token-{}", seconds),
    }))
    .into_response()
}

async fn download_file(
    State(state): State<FakeState>,
    Path((bucket, path)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let count = state.hit(&path);
    if bucket != TEST_BUCKET_NAME || !query.contains_key("Authorization") {
        return (StatusCode::UNAUTHORIZED, "not authorized").into_response();
    }

    match path.as_str() {
        "index/catalog-lite.json" => Json(lite_catalog()).into_response(),
        "index/catalog.json" => Json(full_catalog()).into_response(),
        "index/catalog-lite-broken.json" => Json(json!({
            "meta": meta(1),
            "tracks": [{
                "id": "",
                "title": "No id",
                "durationSeconds": null,
                "audioUrl": null,
                "imageUrl": null
            }]
        }))
        .into_response(),
        "index/flaky.json" if count <= 2 => {
            (StatusCode::SERVICE_UNAVAILABLE, "busy").into_response()
        }
        "index/flaky.json" => Json(full_catalog()).into_response(),
        "index/slow.json" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(full_catalog()).into_response()
        }
        _ => (StatusCode::NOT_FOUND, "not_found").into_response(),
    }
}

fn meta(count: u64) -> Value {
    json!({
        "generatedAt": "2025-03-01T09:00:00Z",
        "bucket": TEST_BUCKET_NAME,
        "sourcePrefix": "metadata/",
        "count": count,
        "version": 1
    })
}

pub fn lite_catalog() -> Value {
    json!({
        "meta": meta(2),
        "tracks": [
            {
                "id": "t1",
                "title": "Night Drive",
                "durationSeconds": 184.5,
                "audioUrl": null,
                "imageUrl": "https://cdn.example.com/t1.jpg"
            },
            {
                "id": "t2",
                "title": "Morning Fog",
                "durationSeconds": null,
                "audioUrl": null,
                "imageUrl": null
            }
        ]
    })
}

pub fn full_catalog() -> Value {
    json!({
        "meta": meta(1),
        "tracks": [{
            "id": "t1",
            "title": "Night Drive",
            "durationSeconds": 184.5,
            "audio": { "publicUrl": null, "b2WavKey": "audio/t1.wav", "b2Mp3Key": "mp3/t1.mp3" },
            "imageUrl": null,
            "createdAt": "2025-01-20T08:30:00Z",
            "model": "v4",
            "stats": { "playCount": 3, "favoriteCount": 1, "isFavorite": false },
            "privacy": { "privacy": "public", "allowPublicUse": true, "canUse": true },
            "tags": { "sound": "warm synth", "conditions": ["night"] },
            "source": { "metadataKey": "metadata/t1.json", "filename": "t1.json" }
        }]
    })
}
