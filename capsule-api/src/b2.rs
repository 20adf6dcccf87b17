//! Backblaze B2 client
//!
//! Two native API calls are needed to hand out time-limited download URLs:
//! `b2_authorize_account` (account token + endpoints) and
//! `b2_get_download_authorization` (token scoped to a file-name prefix).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use capsule_common::config::{B2Credentials, B2Settings, HttpSettings};
use reqwest::{header, Client, Method, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::http::{fetch_json, fetch_with_retry, RetryPolicy};

const USER_AGENT: &str = concat!("capsule-api/", env!("CARGO_PKG_VERSION"));

/// Response of `b2_authorize_account` (fields we use)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct B2Authorization {
    pub api_url: String,
    pub authorization_token: String,
    pub download_url: String,
}

/// Response of `b2_get_download_authorization` (fields we use)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadAuthorization {
    pub authorization_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DownloadAuthorizationRequest<'a> {
    bucket_id: &'a str,
    file_name_prefix: &'a str,
    valid_duration_in_seconds: u64,
}

/// B2 API client
#[derive(Clone)]
pub struct B2Client {
    http: Client,
    api_base_url: String,
    policy: RetryPolicy,
}

impl B2Client {
    pub fn new(settings: &B2Settings, http: &HttpSettings) -> ApiResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http: client,
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            policy: RetryPolicy::from(http),
        })
    }

    /// Exchange account credentials for an API token and endpoints
    pub async fn authorize(&self, creds: &B2Credentials) -> ApiResult<B2Authorization> {
        let url = format!("{}/b2api/v2/b2_authorize_account", self.api_base_url);
        debug!(url = %url, "Authorizing B2 account");

        let request = self
            .http
            .get(&url)
            .header(
                header::AUTHORIZATION,
                basic_auth(&creds.key_id, &creds.application_key),
            )
            .build()?;

        fetch_json(&self.http, request, &self.policy).await
    }

    /// Obtain a download token for objects under `file_name_prefix`
    pub async fn download_authorization(
        &self,
        auth: &B2Authorization,
        bucket_id: &str,
        file_name_prefix: &str,
        valid_duration_in_seconds: u64,
    ) -> ApiResult<DownloadAuthorization> {
        let url = format!("{}/b2api/v2/b2_get_download_authorization", auth.api_url);

        let request = self
            .http
            .request(Method::POST, &url)
            .header(header::AUTHORIZATION, &auth.authorization_token)
            .json(&DownloadAuthorizationRequest {
                bucket_id,
                file_name_prefix,
                valid_duration_in_seconds,
            })
            .build()?;

        fetch_json(&self.http, request, &self.policy).await
    }

    /// Authorize and build a signed download URL for `file`, valid for
    /// `valid_duration_in_seconds`.
    pub async fn signed_url(
        &self,
        creds: &B2Credentials,
        file: &str,
        valid_duration_in_seconds: u64,
    ) -> ApiResult<String> {
        let auth = self.authorize(creds).await?;
        let download = self
            .download_authorization(&auth, &creds.bucket_id, file, valid_duration_in_seconds)
            .await?;

        Ok(signed_download_url(
            &auth.download_url,
            &creds.bucket_name,
            file,
            &download.authorization_token,
        ))
    }

    /// GET `url` with the retry policy; the response status is not checked
    pub async fn download(&self, url: &str) -> ApiResult<Response> {
        let request = self.http.get(url).build()?;
        fetch_with_retry(&self.http, request, &self.policy).await
    }
}

/// `Basic base64(key_id:application_key)`
pub fn basic_auth(key_id: &str, application_key: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", key_id, application_key)))
}

/// `{download_url}/file/{bucket}/{file}?Authorization={token}`
pub fn signed_download_url(
    download_url: &str,
    bucket_name: &str,
    file: &str,
    token: &str,
) -> String {
    format!(
        "{}/file/{}/{}?Authorization={}",
        download_url, bucket_name, file, token
    )
}
