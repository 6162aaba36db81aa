//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch listing pages
//! - Error classification

use crate::config::UserAgentConfig;
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Maximum number of redirects followed for a single request
pub const MAX_REDIRECTS: usize = 10;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: Url,
        /// HTTP status code
        status_code: u16,
        /// Content-Type header value
        content_type: String,
        /// Page body content
        body: String,
    },

    /// Non-2xx response
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Page is not HTML (Content-Type mismatch)
    ContentMismatch {
        /// The actual Content-Type received
        content_type: String,
    },

    /// Network error (connection refused, timeout, etc.)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    /// Short description of a failed fetch, for logs and reports
    pub fn describe_failure(&self) -> Option<String> {
        match self {
            Self::Success { .. } => None,
            Self::HttpError { status_code } => Some(format!("HTTP {}", status_code)),
            Self::ContentMismatch { content_type } => {
                Some(format!("not HTML (Content-Type: {})", content_type))
            }
            Self::NetworkError { error } => Some(error.clone()),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout_secs` - Per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use suruga_watch::config::UserAgentConfig;
/// use suruga_watch::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "suruga-watch".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, 30).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout_secs: u64,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a listing page
///
/// There is no retry: any failure is classified and handed back to the
/// coordinator, which skips the page.
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx with `text/html` | `Success` |
/// | 2xx with another Content-Type | `ContentMismatch` |
/// | Non-2xx | `HttpError` |
/// | Timeout, connection, redirect or body error | `NetworkError` |
///
/// A missing Content-Type header is treated as HTML.
pub async fn fetch_page(client: &Client, url: &Url) -> FetchResult {
    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => return classify_error(&e),
    };

    let status = response.status();
    let final_url = response.url().clone();

    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !content_type.is_empty() && !content_type.to_ascii_lowercase().contains("text/html") {
        return FetchResult::ContentMismatch { content_type };
    }

    match response.text().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body,
        },
        Err(e) => classify_error(&e),
    }
}

fn classify_error(e: &reqwest::Error) -> FetchResult {
    let error = if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        "Connection refused".to_string()
    } else if e.is_redirect() {
        format!("Redirect error: {}", e)
    } else {
        e.to_string()
    };
    FetchResult::NetworkError { error }
}
