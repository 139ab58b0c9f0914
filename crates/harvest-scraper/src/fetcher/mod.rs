//! Primary acquisition tier: a plain HTTP client dressed as a desktop browser.

mod urls;

use std::time::Duration;

use harvest_core::AppConfig;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;

use crate::backoff::{retry_with_backoff, BackoffPolicy};
use crate::error::{AcquisitionError, TransportError};
use crate::types::FetchResult;

pub use urls::{page_url, parse_target, resolve_against};

/// Headers sent with every request, alongside the configured `User-Agent`.
/// Mirrors what a desktop Chrome sends for a top-level navigation.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.5"),
    );
    headers.insert(
        header::ACCEPT_ENCODING,
        HeaderValue::from_static("gzip, deflate"),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers
}

/// Fetches pages over one persistent connection context.
///
/// The underlying `reqwest::Client` keeps its connection pool and cookie jar
/// for the lifetime of the `Fetcher`, so consecutive requests look like one
/// browsing session. Each orchestrator owns its own `Fetcher`; nothing is
/// shared globally.
pub struct Fetcher {
    client: Client,
    max_attempts: u32,
    policy: BackoffPolicy,
}

impl Fetcher {
    /// Creates a `Fetcher` with the given timeout, spoofed `User-Agent`, and
    /// retry policy.
    ///
    /// `max_attempts` is the total number of network attempts per
    /// [`Fetcher::fetch`] call; `0` is treated as `1`.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError::ClientBuild`] if the `reqwest::Client`
    /// cannot be constructed (e.g. an invalid user agent string).
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_attempts: u32,
        policy: BackoffPolicy,
    ) -> Result<Self, AcquisitionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .default_headers(browser_headers())
            .cookie_store(true)
            .gzip(true)
            .build()
            .map_err(AcquisitionError::ClientBuild)?;
        Ok(Self {
            client,
            max_attempts: max_attempts.max(1),
            policy,
        })
    }

    /// Builds a `Fetcher` from the run configuration.
    ///
    /// # Errors
    ///
    /// See [`Fetcher::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, AcquisitionError> {
        Self::new(
            config.request_timeout_secs,
            &config.user_agent,
            config.max_attempts,
            BackoffPolicy::from_millis(
                config.request_delay_ms,
                config.max_backoff_ms,
                config.jitter_max_ms,
            ),
        )
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Retrieves `target`, retrying every transport failure with backoff.
    ///
    /// At most `max_attempts` requests are sent, and none after a success.
    ///
    /// # Errors
    ///
    /// - [`AcquisitionError::InvalidTarget`] if `target` is not an absolute
    ///   `http(s)` URL. No request is sent.
    /// - [`AcquisitionError::Exhausted`] once every attempt has failed with a
    ///   connection error, a timeout, or a non-2xx status.
    pub async fn fetch(&self, target: &str) -> Result<FetchResult, AcquisitionError> {
        let url = parse_target(target)?;

        retry_with_backoff(&self.policy, self.max_attempts, |attempt| {
            let url = url.clone();
            async move {
                tracing::info!(
                    url = %url,
                    attempt = attempt.number,
                    max_attempts = attempt.max_attempts,
                    "fetching page"
                );

                let response = self.client.get(url.clone()).send().await?;
                let status = response.status();

                if !status.is_success() {
                    let retry_after_secs = response
                        .headers()
                        .get(header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.trim().parse::<u64>().ok());
                    return Err(TransportError::Status {
                        status: status.as_u16(),
                        url: url.to_string(),
                        retry_after_secs,
                    });
                }

                let final_url = response.url().to_string();
                let body = response.text().await?;

                Ok(FetchResult {
                    body,
                    status: status.as_u16(),
                    final_url,
                })
            }
        })
        .await
    }
}

#[cfg(test)]
#[path = "../fetcher_test.rs"]
mod tests;
