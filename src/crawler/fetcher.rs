//! HTTP fetcher implementation
//!
//! This module handles all outbound HTTP requests, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - GET requests for catalog pages and image bytes
//! - Classifying responses into success, HTTP error, and network error
//! - Bounded retry for transient failures

use crate::config::HttpConfig;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// Server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, unreadable body, etc.)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    /// Returns true for the successful variant
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns true if trying again could plausibly succeed
    ///
    /// | Condition | Transient |
    /// |-----------|-----------|
    /// | Network error | yes |
    /// | HTTP 5xx | yes |
    /// | HTTP 429 | yes |
    /// | Other HTTP error | no |
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Success { .. } => false,
            Self::HttpError { status_code } => {
                *status_code >= 500 || *status_code == StatusCode::TOO_MANY_REQUESTS.as_u16()
            }
            Self::NetworkError { .. } => true,
        }
    }

    /// Short human-readable description of a failure
    pub fn describe(&self) -> String {
        match self {
            Self::Success { status_code, .. } => format!("HTTP {}", status_code),
            Self::HttpError { status_code } => format!("HTTP {}", status_code),
            Self::NetworkError { error } => error.clone(),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The HTTP client configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL as text and classifies the outcome
///
/// Redirects are followed by the client; any final non-2xx status is an
/// `HttpError`.
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status();
            let final_url = response.url().to_string();

            if !status.is_success() {
                return FetchResult::HttpError {
                    status_code: status.as_u16(),
                };
            }

            match response.text().await {
                Ok(body) => FetchResult::Success {
                    final_url,
                    status_code: status.as_u16(),
                    body,
                },
                Err(e) => FetchResult::NetworkError {
                    error: e.to_string(),
                },
            }
        }
        Err(e) => classify_request_error(&e),
    }
}

/// Fetches a URL, retrying transient failures up to `retries` extra times
///
/// With `retries == 0` this is exactly one `fetch_url` call.
pub async fn fetch_with_retry(
    client: &Client,
    url: &str,
    retries: u32,
    delay: Duration,
) -> FetchResult {
    let mut attempt = 0;
    loop {
        let result = fetch_url(client, url).await;
        if attempt >= retries || !result.is_transient() {
            return result;
        }

        attempt += 1;
        tracing::debug!(
            "Transient failure for {} ({}), retry {}/{}",
            url,
            result.describe(),
            attempt,
            retries
        );
        tokio::time::sleep(delay).await;
    }
}

/// Downloaded binary content
#[derive(Debug, Clone)]
pub struct FetchedBytes {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Why an image download failed
#[derive(Debug, Error)]
pub enum ImageFetchError {
    #[error("Failed to fetch image {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to fetch image {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to read image {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Fetches a URL as raw bytes (used for image downloads)
///
/// # Returns
///
/// * `Ok(FetchedBytes)` - Body and content type of a 2xx response
/// * `Err(ImageFetchError)` - Network failure, non-2xx status, or unreadable body
pub async fn fetch_bytes(client: &Client, url: &str) -> Result<FetchedBytes, ImageFetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| ImageFetchError::Request {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ImageFetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let bytes = response
        .bytes()
        .await
        .map_err(|source| ImageFetchError::Body {
            url: url.to_string(),
            source,
        })?;

    Ok(FetchedBytes {
        bytes: bytes.to_vec(),
        content_type,
    })
}

fn classify_request_error(e: &reqwest::Error) -> FetchResult {
    if e.is_timeout() {
        FetchResult::NetworkError {
            error: "Request timeout".to_string(),
        }
    } else if e.is_connect() {
        FetchResult::NetworkError {
            error: "Connection refused".to_string(),
        }
    } else {
        FetchResult::NetworkError {
            error: e.to_string(),
        }
    }
}
