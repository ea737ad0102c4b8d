//! HTTP fetcher implementation
//!
//! This module handles the HTTP requests made while walking listings:
//! - Building a pooled HTTP client with the configured user agent
//! - GET requests for listing pages
//! - HEAD requests used as a cheap existence probe
//! - Error classification (absent vs. failed)

use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Result of a listing fetch
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: Url,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// The directory does not exist (HTTP 404 or 410)
    Absent {
        /// The HTTP status code
        status_code: u16,
    },

    /// Any other non-success HTTP status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, body decode, etc.)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    /// Returns true for results that indicate a real failure, not a gap in the namespace
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::HttpError { .. } | Self::NetworkError { .. })
    }
}

/// Builds an HTTP client shared by every task in a phase
///
/// The idle pool per host is sized from the phase concurrency so that
/// workers reuse connections instead of reconnecting per request.
///
/// # Arguments
///
/// * `user_agent` - The User-Agent header value
/// * `timeout` - Connect timeout
/// * `concurrency` - Number of concurrent tasks that will share the client
///
/// # Example
///
/// ```no_run
/// use index_harvester::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client("IndexHarvester/1.0", Duration::from_secs(15), 20).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &str,
    timeout: Duration,
    concurrency: usize,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(timeout)
        .pool_max_idle_per_host(concurrency.max(1) * 2)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a listing page
///
/// | Condition | Result |
/// |-----------|--------|
/// | HTTP 2xx with readable body | Success |
/// | HTTP 404 / 410 | Absent |
/// | Other HTTP status | HttpError |
/// | Timeout, connect or decode error | NetworkError |
///
/// Nothing is retried here; callers treat every non-success as an empty
/// listing.
pub async fn fetch_listing(client: &Client, url: &Url, timeout: Duration) -> FetchResult {
    let response = match client.get(url.clone()).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => return classify_network_error(&e),
    };

    let status = response.status();
    let final_url = response.url().clone();

    if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
        return FetchResult::Absent {
            status_code: status.as_u16(),
        };
    }

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
        Err(e) => classify_network_error(&e),
    }
}

/// Sends a HEAD request to check whether a directory exists
///
/// Only HTTP 200 counts as present. Any error, including a timeout, is
/// treated as "absent".
pub async fn probe_directory(client: &Client, url: &Url, timeout: Duration) -> bool {
    match client.head(url.clone()).timeout(timeout).send().await {
        Ok(response) => {
            let present = response.status() == StatusCode::OK;
            if !present {
                tracing::debug!("Probe of {} returned {}", url, response.status());
            }
            present
        }
        Err(e) => {
            tracing::debug!("Probe of {} failed: {}", url, e);
            false
        }
    }
}

fn classify_network_error(e: &reqwest::Error) -> FetchResult {
    let error = if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else if e.is_decode() || e.is_body() {
        format!("Failed to read body: {}", e)
    } else {
        e.to_string()
    };
    FetchResult::NetworkError { error }
}
