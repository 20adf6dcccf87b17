//! Liveness and configuration report

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Body of `GET /health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while B2 settings are missing
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub git_hash: &'static str,
    pub missing_settings: Vec<&'static str>,
}

/// GET /health
///
/// Never contacts B2; only reports whether signing could work.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let missing_settings = state.config.missing_b2_settings();
    Json(HealthResponse {
        status: if missing_settings.is_empty() { "ok" } else { "degraded" },
        module: "capsule-api",
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("GIT_HASH"),
        missing_settings,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
