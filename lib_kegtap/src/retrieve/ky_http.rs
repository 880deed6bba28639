//! # HTTP Retrieval Utilities
//!
//! An asynchronous API client wrapper around `reqwest`, with exponential backoff
//! retries from `reqwest-retry` and a small response envelope for the typed clients
//! built on top of it.

use std::time::Duration;

use anyhow::{anyhow, Context};
use reqwest::{header::CONTENT_TYPE, Method, Url};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{de::DeserializeOwned, Serialize};

/// What came back from the server.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The decoded body of a 2xx answer.
    pub data: Option<T>,
    /// The raw body of a non-2xx answer.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
}

/// Transport tuning for an [`ApiClient`].
#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Retries on transient failures (connection errors, 5xx, 408, 429).
    pub max_retries: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }
}

/// A retrying HTTP client bound to one base URL.
#[derive(Clone)]
pub struct ApiClient {
    inner: ClientWithMiddleware,
    base_url: Url,
}

impl ApiClient {
    /// Creates a client for `base_url` with the retry budget in `options`.
    ///
    /// # Errors
    /// Fails if `base_url` is not an absolute URL or the TLS backend cannot start.
    pub fn new(base_url: &str, options: ClientOptions) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid base URL (must be absolute): {base_url}"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("Invalid base URL (cannot hold a path): {base_url}"));
        }

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(options.max_retries);

        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .user_agent(concat!("kegtap/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            inner: client,
            base_url,
        })
    }

    /// The base URL with `segments` appended, each percent-encoded as one path
    /// segment (a space becomes `%20`, a `/` becomes `%2F`).
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Sends a request and decodes a 2xx body as JSON.
    ///
    /// Non-2xx answers are returned as `Ok` with the raw body in `error_body`.
    ///
    /// # Errors
    /// Network failures, body serialization and decoding of a 2xx body.
    pub async fn request<T, B>(
        &self,
        method: Method,
        url: Url,
        body: Option<B>,
    ) -> anyhow::Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let response = self.send(method, url, body).await?;
        let status = response.status().as_u16();
        if response.status().is_success() {
            Ok(ApiResponse {
                data: Some(response.json::<T>().await?),
                error_body: None,
                status,
            })
        } else {
            Ok(ApiResponse {
                data: None,
                error_body: response.text().await.ok(),
                status,
            })
        }
    }

    /// `GET` of a binary resource; a 2xx body is returned as raw bytes.
    pub async fn fetch_bytes(&self, url: Url) -> anyhow::Result<ApiResponse<Vec<u8>>> {
        let response = self.send::<()>(Method::GET, url, None).await?;
        let status = response.status().as_u16();
        if response.status().is_success() {
            Ok(ApiResponse {
                data: Some(response.bytes().await?.to_vec()),
                error_body: None,
                status,
            })
        } else {
            Ok(ApiResponse {
                data: None,
                error_body: response.text().await.ok(),
                status,
            })
        }
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        url: Url,
        body: Option<B>,
    ) -> anyhow::Result<reqwest::Response> {
        let mut req = self.inner.request(method, url);
        if let Some(b) = body {
            let json_body = serde_json::to_string(&b)?;
            req = req.header(CONTENT_TYPE, "application/json").body(json_body);
        }
        Ok(req.send().await?)
    }
}
