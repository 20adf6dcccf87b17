//! CORS headers for the browser player
//!
//! Every API response, errors included, echoes the caller's `Origin` (or `*`
//! when absent). Preflight requests get an empty 204.

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};

pub const ALLOW_METHODS: &str = "GET,OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type";

/// Middleware adding CORS headers to the wrapped routes
pub async fn cors_headers(request: Request, next: Next) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("*"));

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut(), origin);
    response
}

pub fn apply_cors_headers(headers: &mut HeaderMap, origin: HeaderValue) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
}

/// OPTIONS handler
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}
