//! Crawl frontier and politeness timing
//!
//! This module handles:
//! - The FIFO queue of listing pages still to fetch
//! - Cycle protection through a seen set of normalized URLs
//! - The page budget of a single crawl
//! - Minimum delays between requests, including robots.txt crawl delays

use crate::config::CrawlerConfig;
use crate::url::normalize_url;
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};
use url::Url;

/// Upper bound for a robots.txt crawl delay
const MAX_CRAWL_DELAY_SECS: f64 = 600.0;

/// Queue of listing pages for one crawl
///
/// Every page of a crawl lives on the catalog host, so a single timing state
/// covers the whole crawl. URLs on other hosts are never queued.
#[derive(Debug)]
pub struct Frontier {
    /// Pages waiting to be fetched, in discovery order
    queue: VecDeque<Url>,

    /// Normalized forms of every URL ever queued
    seen: HashSet<String>,

    /// Host the crawl is confined to
    host: Option<String>,

    /// Maximum number of pages handed out
    max_pages: u32,

    /// Pages handed out so far
    dispatched: u32,

    /// Minimum time between two requests
    request_delay: Duration,

    /// Timestamp of the last request
    last_request_time: Option<Instant>,
}

impl Frontier {
    /// Creates a frontier seeded with the crawl's start URL
    ///
    /// # Arguments
    ///
    /// * `start_url` - The first page of the listing
    /// * `config` - The crawler configuration (page budget and request delay)
    pub fn new(start_url: Url, config: &CrawlerConfig) -> Self {
        let mut frontier = Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
            host: start_url.host_str().map(str::to_ascii_lowercase),
            max_pages: config.max_pages,
            dispatched: 0,
            request_delay: Duration::from_millis(config.request_delay),
            last_request_time: None,
        };
        frontier.push(start_url);
        frontier
    }

    /// Queues a URL unless it was seen before or leaves the catalog host
    ///
    /// # Returns
    ///
    /// `true` if the URL was queued
    pub fn push(&mut self, url: Url) -> bool {
        let host = url.host_str().map(str::to_ascii_lowercase);
        if host != self.host {
            tracing::trace!("Not queueing off-host URL {}", url);
            return false;
        }

        let key = normalize_url(&url).to_string();
        if !self.seen.insert(key) {
            tracing::trace!("Already seen {}", url);
            return false;
        }

        self.queue.push_back(url);
        true
    }

    /// Marks a URL as seen without queueing it
    ///
    /// Used for the final URL of a redirected fetch, so that a later link to
    /// the redirect target is not fetched a second time.
    pub fn mark_seen(&mut self, url: &Url) {
        self.seen.insert(normalize_url(url).to_string());
    }

    /// Hands out the next URL to fetch
    ///
    /// Returns None once the queue is empty or the page budget is spent.
    pub fn next_url(&mut self) -> Option<Url> {
        if self.budget_exhausted() {
            return None;
        }
        let url = self.queue.pop_front()?;
        self.dispatched += 1;
        Some(url)
    }

    /// Raises the request delay to a robots.txt crawl delay (seconds)
    ///
    /// The effective delay is the larger of the configured delay and the
    /// crawl delay.
    pub fn apply_crawl_delay(&mut self, crawl_delay: Option<f64>) {
        let robots_delay = crawl_delay
            .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
            .map(|seconds| Duration::from_secs_f64(seconds.min(MAX_CRAWL_DELAY_SECS)))
            .unwrap_or(Duration::ZERO);
        self.request_delay = std::cmp::max(self.request_delay, robots_delay);
    }

    /// Records that a request was made
    pub fn record_request(&mut self, now: Instant) {
        self.last_request_time = Some(now);
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let elapsed = now.duration_since(last);
        if elapsed < self.request_delay {
            Some(self.request_delay - elapsed)
        } else {
            None
        }
    }

    /// Effective minimum time between two requests
    pub fn request_delay(&self) -> Duration {
        self.request_delay
    }

    /// Whether the page budget has been spent
    pub fn budget_exhausted(&self) -> bool {
        self.dispatched >= self.max_pages
    }

    /// Number of pages handed out so far
    pub fn dispatched(&self) -> u32 {
        self.dispatched
    }

    /// Returns the number of URLs waiting in the queue
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
