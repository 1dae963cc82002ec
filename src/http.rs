//! Resilient HTTP layer: timeout, bounded retry with linear backoff on
//! transport failure, and explicit rate-limit signaling.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{QuarkError, Result};

/// HTTP client used by every drive operation.
///
/// Transport-level failures (no response received) are retried up to
/// `max_retries` times, waiting `retry_delay × attempt` between attempts.
/// An HTTP 429 is surfaced immediately as `RateLimited` and never retried
/// here; backing off from rate limits is the caller's policy. Any other
/// status code is not an error at this layer: the parsed body is returned
/// so the caller can interpret the vendor's `code`/`message` fields.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration, max_retries: u32, retry_delay: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            max_retries,
            retry_delay,
        })
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: &HeaderMap,
    ) -> Result<T> {
        self.request(Method::GET, url, query, None, headers).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        body: &serde_json::Value,
        headers: &HeaderMap,
    ) -> Result<T> {
        self.request(Method::POST, url, query, Some(body), headers)
            .await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
        headers: &HeaderMap,
    ) -> Result<T> {
        let mut attempt: u32 = 0;

        loop {
            let mut request = self
                .client
                .request(method.clone(), url)
                .query(query)
                .headers(headers.clone());
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        tracing::warn!(%method, url, "rate limited");
                        return Err(QuarkError::RateLimited);
                    }
                    tracing::debug!(%method, url, %status, "response received");
                    return Ok(response.json::<T>().await?);
                }
                Err(err) if is_transport_error(&err) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        tracing::error!(
                            %method,
                            url,
                            attempts = attempt,
                            error = %err,
                            "request failed after all retries"
                        );
                        return Err(QuarkError::Network(err.to_string()));
                    }
                    let delay = self.retry_delay * attempt;
                    tracing::warn!(
                        %method,
                        url,
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// A failure before any response arrived: connect refusals, timeouts, and
/// connections dropped mid-request.
fn is_transport_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || (err.is_request() && err.status().is_none())
}
