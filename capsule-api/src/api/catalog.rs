//! Catalog proxy endpoint
//!
//! Fetches a catalog object from the private bucket through a short-lived
//! download authorization, validates it against the catalog contracts and
//! returns the validated document.

use std::time::Instant;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use capsule_common::catalog::{Catalog, CatalogKind};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::observability::{log_event, EventLevel};
use crate::validation::{query_pairs, CatalogQuery, RawQuery};
use crate::AppState;

/// Lifetime of the download authorization used to fetch the catalog
pub const CATALOG_AUTH_SECONDS: u64 = 300;

pub const CATALOG_CACHE_CONTROL: &str = "public, max-age=300, s-maxage=300";

/// GET /api/catalog?file=index/...
pub async fn get_catalog(
    State(state): State<AppState>,
    query: RawQuery,
) -> ApiResult<Response> {
    let file = CatalogQuery::from_pairs(&query_pairs(query)?).validate()?;
    let started = Instant::now();
    log_event(EventLevel::Info, "catalog_requested", json!({ "fileName": file }));

    match load_catalog(&state, &file).await {
        Ok(catalog) => {
            debug!(
                file = %file,
                tracks = catalog.track_count(),
                latency_ms = started.elapsed().as_millis() as u64,
                "Catalog served"
            );
            Ok((
                [(header::CACHE_CONTROL, CATALOG_CACHE_CONTROL)],
                Json(catalog),
            )
                .into_response())
        }
        Err(err) => {
            log_event(
                EventLevel::Error,
                "catalog_request_failed",
                json!({
                    "status": err.status().as_u16(),
                    "code": err.code(),
                    "message": err.detail(),
                    "latencyMs": started.elapsed().as_millis() as u64,
                }),
            );
            Err(err)
        }
    }
}

async fn load_catalog(state: &AppState, file: &str) -> ApiResult<Catalog> {
    let creds = state.config.b2.credentials()?;
    let url = state.b2.signed_url(&creds, file, CATALOG_AUTH_SECONDS).await?;

    let response = state.b2.download(&url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Internal(format!(
            "Catalog fetch failed: {}",
            status.as_u16()
        )));
    }

    let value: Value = response
        .json()
        .await
        .map_err(|e| ApiError::Internal(format!("Catalog is not JSON: {}", e)))?;

    Ok(Catalog::parse(CatalogKind::for_file(file), value)?)
}
