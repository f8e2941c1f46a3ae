//! Core HTTP operations with rate limiting
//!
//! Every request goes through a `governor` rate limiter. Failures are
//! classified into the transient kinds the fetcher retries (timeouts and
//! remote protocol errors) and everything else; no retry happens here.

use std::num::NonZeroU32;

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::errors::{ClientError, ClientResult};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// HTTP operations handler
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: DirectRateLimiter,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client and rate limit
    ///
    /// # Errors
    ///
    /// Returns `ClientError::RateLimit` if `rate_limit_rps` is zero
    pub fn new(client: Client, rate_limit_rps: u32) -> ClientResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
        })
    }

    fn build_rate_limiter(rate_limit_rps: u32) -> ClientResult<DirectRateLimiter> {
        let rps = NonZeroU32::new(rate_limit_rps).ok_or(ClientError::RateLimit)?;
        Ok(RateLimiter::direct(Quota::per_second(rps)))
    }

    /// Fetch the full body of `url`
    ///
    /// # Errors
    ///
    /// `Timeout` / `Protocol` for transient failures, `ServerError` for a
    /// non-success status, `Http` for anything else.
    pub async fn get_bytes(&self, url: &Url) -> ClientResult<Vec<u8>> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::ServerError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| classify(url, e))?;
        tracing::debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }

    /// Fetch and decode a JSON document
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> ClientResult<T> {
        let body = self.get_bytes(url).await?;
        serde_json::from_slice(&body).map_err(|source| ClientError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// Map a reqwest failure onto the retry taxonomy
///
/// Connection refusal is not transient; a connection that drops or a body
/// that is cut short is.
pub(crate) fn classify(url: &Url, error: reqwest::Error) -> ClientError {
    if error.is_timeout() {
        ClientError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_body() || (error.is_request() && !error.is_connect()) {
        ClientError::Protocol {
            url: url.to_string(),
            reason: error.to_string(),
        }
    } else {
        ClientError::Http(error)
    }
}
