//! Acquiring raw feed bytes over HTTP.
//!
//! [`fetch_bytes`] performs a single GET through an [`HttpClient`];
//! [`fetch_with_retry`] wraps it in bounded exponential backoff and reports a
//! typed [`FetchOutcome`] instead of failing.

mod basic;
mod client;
mod retry;

pub use basic::BasicClient;
pub use client::{HttpClient, PROTOBUF_MEDIA_TYPE};
pub use retry::{FetchOutcome, RetryPolicy, retry_with_backoff};

use bytes::Bytes;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid feed url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("feed returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

impl FetchError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Request(_) | FetchError::Status(_))
    }
}

/// Performs one GET and returns the full response body.
///
/// A non-success status is an error; the body of such a response is
/// discarded.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Bytes, FetchError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let resp = client.get_feed(parsed).await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    Ok(resp.bytes().await?)
}

/// [`fetch_bytes`] under a [`RetryPolicy`].
#[tracing::instrument(skip(client, policy, cancel), fields(max_retries = policy.max_retries))]
pub async fn fetch_with_retry<C: HttpClient>(
    client: &C,
    url: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> FetchOutcome {
    retry_with_backoff(policy, cancel, |_| fetch_bytes(client, url)).await
}
