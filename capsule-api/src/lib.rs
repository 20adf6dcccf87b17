//! capsule-api library - catalog and URL signing proxy
//!
//! Keeps B2 credentials server-side: the browser player asks this service
//! for the catalog and for time-limited download URLs.

use std::sync::Arc;

use axum::Router;
use capsule_common::config::TomlConfig;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod b2;
pub mod error;
pub mod http;
pub mod observability;
pub mod validation;

use b2::B2Client;
use error::ApiResult;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Bootstrap configuration (credentials already merged from env)
    pub config: Arc<TomlConfig>,
    pub b2: B2Client,
}

impl AppState {
    /// Create new application state
    pub fn new(config: TomlConfig) -> ApiResult<Self> {
        let b2 = B2Client::new(&config.b2, &config.http)?;
        Ok(Self {
            config: Arc::new(config),
            b2,
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::get;

    // Browser-facing routes carry CORS headers, errors included
    let api = Router::new()
        .route(
            "/api/catalog",
            get(api::get_catalog).options(api::preflight),
        )
        .route("/api/b2/sign", get(api::sign_url).options(api::preflight))
        .layer(middleware::from_fn(api::cors_headers));

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
