//! Robots.txt handling module
//!
//! The crawl only ever visits the catalog host, so robots.txt is fetched once
//! per crawl and kept for its duration.

mod parser;

pub use parser::ParsedRobots;

use crate::url::origin_of;
use crate::{UrlError, UrlResult};
use reqwest::Client;
use url::Url;

/// Location of robots.txt for the host serving `url`
pub fn robots_url(url: &Url) -> UrlResult<Url> {
    origin_of(url)?
        .join("robots.txt")
        .map_err(|e| UrlError::Parse(e.to_string()))
}

/// Fetches robots.txt for the host of `origin`
///
/// Never fails: a missing file (4xx) or a network error yields a permissive
/// [`ParsedRobots`], and the failure is logged.
///
/// # Arguments
///
/// * `client` - The HTTP client (already carrying the user agent)
/// * `origin` - Any URL on the host, typically the crawl's start URL
pub async fn fetch_robots(client: &Client, origin: &Url) -> ParsedRobots {
    let robots_url = match robots_url(origin) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Cannot build robots.txt URL from {}: {}", origin, e);
            return ParsedRobots::allow_all();
        }
    };

    tracing::debug!("Fetching {}", robots_url);

    let response = match client.get(robots_url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Failed to fetch {}: {}; allowing all", robots_url, e);
            return ParsedRobots::allow_all();
        }
    };

    let status = response.status();
    if !status.is_success() {
        tracing::debug!("{} returned HTTP {}; allowing all", robots_url, status);
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(body) => ParsedRobots::from_content(&body),
        Err(e) => {
            tracing::warn!("Failed to read {}: {}; allowing all", robots_url, e);
            ParsedRobots::allow_all()
        }
    }
}

/// Checks if a URL is allowed by robots.txt
pub fn is_allowed(robots: &ParsedRobots, url: &Url, user_agent: &str) -> bool {
    robots.is_allowed(url.as_str(), user_agent)
}
