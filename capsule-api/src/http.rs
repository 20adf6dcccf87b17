//! Outbound HTTP with per-attempt timeout and retry
//!
//! Transport failures, timeouts and transient statuses are retried with
//! exponential backoff. Any other response, successful or not, is returned
//! to the caller as-is.

use std::time::Duration;

use capsule_common::config::HttpSettings;
use reqwest::{Client, Request, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

/// Statuses worth another attempt
pub const RETRYABLE_STATUS: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Retry/timeout policy for one logical request
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra attempts after the first
    pub retries: u32,
    /// Limit on waiting for response headers, per attempt
    pub timeout: Duration,
    /// Delay before retry `n` is `backoff_base * 2^n`
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&HttpSettings::default())
    }
}

impl From<&HttpSettings> for RetryPolicy {
    fn from(settings: &HttpSettings) -> Self {
        Self {
            retries: settings.retries,
            timeout: settings.timeout(),
            backoff_base: settings.backoff_base(),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt number `attempt` (zero-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor)
    }
}

enum AttemptFailure {
    Timeout,
    Transport(reqwest::Error),
}

impl From<AttemptFailure> for ApiError {
    fn from(failure: AttemptFailure) -> Self {
        match failure {
            AttemptFailure::Timeout => ApiError::UpstreamTimeout,
            AttemptFailure::Transport(e) => ApiError::from(e),
        }
    }
}

/// Execute `request`, retrying per `policy`.
///
/// Returns the first non-retryable response, or the last response once
/// retries are exhausted. Fails only when the final attempt produced no
/// response at all.
pub async fn fetch_with_retry(
    client: &Client,
    request: Request,
    policy: &RetryPolicy,
) -> ApiResult<Response> {
    let url = request.url().clone();
    let mut attempt = 0;

    loop {
        let Some(attempt_request) = request.try_clone() else {
            return Err(ApiError::Internal(format!(
                "Request to {} has a body that cannot be retried",
                url
            )));
        };

        let execution = client.execute(attempt_request);
        let outcome = match tokio::time::timeout(policy.timeout, execution).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) if e.is_timeout() => Err(AttemptFailure::Timeout),
            Ok(Err(e)) => Err(AttemptFailure::Transport(e)),
            Err(_) => Err(AttemptFailure::Timeout),
        };

        let can_retry = attempt < policy.retries;

        match outcome {
            Ok(response) => {
                let status = response.status().as_u16();
                let retryable = RETRYABLE_STATUS.contains(&status);
                if !response.status().is_success() && retryable && can_retry {
                    warn!(
                        url = %url,
                        status,
                        attempt,
                        "Retrying after transient upstream status"
                    );
                } else {
                    return Ok(response);
                }
            }
            Err(failure) => {
                if !can_retry {
                    return Err(failure.into());
                }
                match &failure {
                    AttemptFailure::Timeout => {
                        warn!(url = %url, attempt, "Upstream attempt timed out, retrying")
                    }
                    AttemptFailure::Transport(e) => {
                        warn!(url = %url, attempt, "Upstream attempt failed, retrying: {}", e)
                    }
                }
            }
        }

        let delay = policy.backoff(attempt);
        debug!(?delay, "Backing off before retry");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// [`fetch_with_retry`], then decode a successful JSON body.
///
/// A final non-success status becomes [`ApiError::Upstream`] carrying the
/// status and response text.
pub async fn fetch_json<T: DeserializeOwned>(
    client: &Client,
    request: Request,
    policy: &RetryPolicy,
) -> ApiResult<T> {
    let response = fetch_with_retry(client, request, policy).await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Internal(format!("Invalid upstream JSON: {}", e)))
}
