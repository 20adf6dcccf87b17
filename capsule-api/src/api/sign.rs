//! Signed download URL endpoint

use std::time::Instant;

use axum::{
    extract::State,
    Json,
};
use capsule_common::catalog::{Contract, SignUrlSuccess};
use serde_json::json;

use crate::error::ApiResult;
use crate::observability::{log_event, EventLevel};
use crate::validation::{query_pairs, RawQuery, SignQuery, SignRequest};
use crate::AppState;

/// GET /api/b2/sign?file=...&expiresIn=...
///
/// Returns a download URL for `file` valid for `expiresIn` seconds.
pub async fn sign_url(
    State(state): State<AppState>,
    query: RawQuery,
) -> ApiResult<Json<SignUrlSuccess>> {
    let request = SignQuery::from_pairs(&query_pairs(query)?).validate()?;
    let started = Instant::now();
    log_event(
        EventLevel::Info,
        "b2_sign_requested",
        json!({ "fileName": request.file, "expiresIn": request.expires_in }),
    );

    match create_signed_url(&state, &request).await {
        Ok(payload) => Ok(Json(payload)),
        Err(err) => {
            log_event(
                EventLevel::Error,
                "b2_sign_failed",
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

async fn create_signed_url(state: &AppState, request: &SignRequest) -> ApiResult<SignUrlSuccess> {
    let creds = state.config.b2.credentials()?;
    let url = state
        .b2
        .signed_url(&creds, &request.file, request.expires_in)
        .await?;

    let payload = SignUrlSuccess {
        url,
        expires_in: request.expires_in,
        file: request.file.clone(),
    };
    payload.validate()?;
    Ok(payload)
}
