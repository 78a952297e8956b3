//! HTTP client with tracing and status mapping.
//!
//! This module provides a wrapped HTTP client that adds:
//! - Request/response tracing
//! - Cookie support for authenticated host APIs
//! - Status codes mapped onto [`HttpError`] variants hosts can match on

use reqwest::{Client, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::HttpError;

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default user agent string.
const USER_AGENT: &str = concat!("musicdl/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// HTTP Client
// ============================================================================

/// HTTP client wrapper shared by every host of an invocation.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Creates a new HTTP client with default settings.
    pub fn new() -> Self {
        Self::with_options(Duration::from_secs(DEFAULT_TIMEOUT_SECS), None)
    }

    /// Creates a new HTTP client with a custom timeout and user agent.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built. This should only occur
    /// if the system's TLS configuration is fundamentally broken, making
    /// network operations impossible.
    pub fn with_options(timeout: Duration, user_agent: Option<&str>) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.unwrap_or(USER_AGENT))
            .build()
            .unwrap_or_else(|e| {
                panic!(
                    "Failed to create HTTP client: {e}. \
                    This usually indicates a broken TLS configuration."
                )
            });

        Self { inner: client }
    }

    /// Performs a GET request, sending `cookies` as the `Cookie` header when non-empty.
    ///
    /// Non-success statuses are returned as errors.
    #[instrument(skip(self, cookies), fields(url = %url))]
    pub async fn get(&self, url: &str, cookies: Option<&str>) -> Result<Response, HttpError> {
        debug!("GET request");

        let mut request = self.inner.get(url);
        if let Some(cookies) = cookies.filter(|c| !c.is_empty()) {
            request = request.header(header::COOKIE, cookies);
        }

        let response = request.send().await?;
        debug!(status = %response.status(), "Response received");
        check_status(response)
    }

    /// Performs a GET request and decodes a JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        cookies: Option<&str>,
    ) -> Result<T, HttpError> {
        let response = self.get(url, cookies).await?;
        Ok(response.json().await?)
    }

    /// Performs a GET request and returns the raw body.
    pub async fn get_bytes(&self, url: &str, cookies: Option<&str>) -> Result<Vec<u8>, HttpError> {
        let response = self.get(url, cookies).await?;
        let bytes = response.bytes().await?;
        debug!(len = bytes.len(), "Body received");
        Ok(bytes.to_vec())
    }

    /// Returns the inner reqwest client for advanced operations.
    pub fn inner(&self) -> &Client {
        &self.inner
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps a response status onto [`HttpError`].
fn check_status(response: Response) -> Result<Response, HttpError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    Err(status_error(status, url))
}

fn status_error(status: StatusCode, url: String) -> HttpError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => HttpError::Unauthorized(url),
        StatusCode::NOT_FOUND => HttpError::NotFound(url),
        _ => HttpError::Status {
            status: status.as_u16(),
            url,
        },
    }
}

// ============================================================================
// Tests
// ============================================================================
