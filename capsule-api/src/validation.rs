//! Query parameter validation
//!
//! Only whitelisted bucket prefixes may be signed or served. A disallowed
//! file is reported as 403 `File not allowed`; every other problem is a 400.
//! Repeated parameters resolve to their first occurrence.

use axum::extract::{rejection::QueryRejection, Query};
use capsule_common::catalog::DEFAULT_CATALOG_FILE;

use crate::error::{ApiError, ApiResult};

/// Prefixes the signing endpoint accepts
pub const ALLOWED_SIGN_PREFIXES: [&str; 4] = ["audio/", "mp3/", "index/", "metadata/"];

/// Prefix the catalog endpoint accepts
pub const CATALOG_PREFIX: &str = "index/";

pub const DEFAULT_EXPIRES_IN: u64 = 900;
pub const MIN_EXPIRES_IN: u64 = 60;
pub const MAX_EXPIRES_IN: u64 = 3600;

/// Query string as ordered `(key, value)` pairs, as handed to a handler
pub type RawQuery = Result<Query<Vec<(String, String)>>, QueryRejection>;

/// Unwrap `raw`; a query string axum cannot decode is a 400
pub fn query_pairs(raw: RawQuery) -> ApiResult<Vec<(String, String)>> {
    raw.map(|Query(pairs)| pairs)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn first_value(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
}

/// Raw query of `GET /api/b2/sign`
#[derive(Debug, Default)]
pub struct SignQuery {
    pub file: Option<String>,
    pub expires_in: Option<String>,
}

/// Validated signing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignRequest {
    pub file: String,
    pub expires_in: u64,
}

impl SignQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            file: first_value(pairs, "file"),
            expires_in: first_value(pairs, "expiresIn"),
        }
    }

    pub fn validate(self) -> ApiResult<SignRequest> {
        let file = match self.file {
            Some(file) if !file.is_empty() => file,
            _ => return Err(ApiError::BadRequest("Missing file query param".to_string())),
        };
        if !ALLOWED_SIGN_PREFIXES.iter().any(|p| file.starts_with(p)) {
            return Err(ApiError::FileNotAllowed);
        }

        let expires_in = match self.expires_in {
            Some(raw) => parse_expires_in(&raw)?,
            None => DEFAULT_EXPIRES_IN,
        };

        Ok(SignRequest { file, expires_in })
    }
}

/// Raw query of `GET /api/catalog`
#[derive(Debug, Default)]
pub struct CatalogQuery {
    pub file: Option<String>,
}

impl CatalogQuery {
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        Self {
            file: first_value(pairs, "file"),
        }
    }

    /// Requested catalog object, defaulting to the lite index
    pub fn validate(self) -> ApiResult<String> {
        let file = self.file.unwrap_or_else(|| DEFAULT_CATALOG_FILE.to_string());
        if file.is_empty() {
            return Err(ApiError::BadRequest("file must not be empty".to_string()));
        }
        if !file.starts_with(CATALOG_PREFIX) {
            return Err(ApiError::FileNotAllowed);
        }
        Ok(file)
    }
}

/// Numeric text such as `"600"`, `" 600 "` or `"6e2"`; must be an integer
/// within [`MIN_EXPIRES_IN`, `MAX_EXPIRES_IN`].
fn parse_expires_in(raw: &str) -> ApiResult<u64> {
    let trimmed = raw.trim();
    let value: f64 = if trimmed.is_empty() {
        0.0
    } else {
        trimmed
            .parse()
            .map_err(|_| ApiError::BadRequest("expiresIn must be a number".to_string()))?
    };

    if !value.is_finite() || value.fract() != 0.0 {
        return Err(ApiError::BadRequest("expiresIn must be an integer".to_string()));
    }
    if value < MIN_EXPIRES_IN as f64 || value > MAX_EXPIRES_IN as f64 {
        return Err(ApiError::BadRequest(format!(
            "expiresIn must be between {} and {}",
            MIN_EXPIRES_IN, MAX_EXPIRES_IN
        )));
    }
    Ok(value as u64)
}
