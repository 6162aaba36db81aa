//! Crawler module for listing page fetching and processing
//!
//! This module contains the crawl engine around the listing parser, including:
//! - HTTP fetching and failure classification
//! - The frontier with its seen set, page budget and request pacing
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;

pub use coordinator::{crawl_listing, Coordinator, CrawlReport};
pub use fetcher::{build_http_client, fetch_page, FetchResult, MAX_REDIRECTS};
pub use frontier::Frontier;
