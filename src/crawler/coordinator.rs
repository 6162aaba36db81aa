//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties the fetcher, the listing
//! parser and the frontier together:
//! - Fetching robots.txt once per crawl
//! - Waiting out the politeness delay between requests
//! - Parsing each listing page and streaming its records to a sink
//! - Following pagination links until the frontier or the budget runs out

use crate::catalog::{ListingParser, ProductRecord};
use crate::config::Config;
use crate::crawler::frontier::Frontier;
use crate::crawler::{build_http_client, fetch_page, FetchResult};
use crate::output::RecordSink;
use crate::robots::{fetch_robots, is_allowed, ParsedRobots};
use crate::url::resolve_reference;
use crate::Result;
use reqwest::Client;
use std::time::Instant;
use url::Url;

/// Counters describing one finished crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Pages fetched and parsed successfully
    pub pages_fetched: u32,

    /// Pages whose fetch or extraction failed
    pub pages_failed: u32,

    /// Pages disallowed by robots.txt
    pub pages_skipped: u32,

    /// Product records handed to the sink
    pub products: usize,

    /// Pagination references found, before deduplication
    pub pagination_links: usize,
}

/// Main crawler coordinator structure
///
/// A coordinator performs a single crawl; build a new one per crawl.
pub struct Coordinator {
    client: Client,
    parser: ListingParser,
    frontier: Frontier,
    obey_robots: bool,
    /// Product token matched against robots.txt groups
    robots_agent: String,
}

impl Coordinator {
    /// Creates a new coordinator with its own HTTP client
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(WatchError)` - Invalid start URL, selectors or client settings
    pub fn new(config: &Config) -> Result<Self> {
        let client = build_http_client(&config.user_agent, config.crawler.request_timeout)?;
        Self::with_client(config, client)
    }

    /// Creates a new coordinator sharing an existing HTTP client
    pub fn with_client(config: &Config, client: Client) -> Result<Self> {
        let start_url = config.search.start_url()?;
        let parser = ListingParser::with_selectors(start_url.clone(), &config.selectors)?;
        let frontier = Frontier::new(start_url, &config.crawler);

        Ok(Self {
            client,
            parser,
            frontier,
            obey_robots: config.crawler.obey_robots,
            robots_agent: config.user_agent.crawler_name.clone(),
        })
    }

    /// Runs the crawl loop, streaming every record to `sink`
    ///
    /// Pages that fail to fetch or parse are logged and counted; only sink
    /// errors abort the crawl.
    pub async fn run(&mut self, sink: &mut dyn RecordSink) -> Result<CrawlReport> {
        let start_url = self.parser.start_url().clone();
        tracing::info!("Starting crawl at {}", start_url);

        let robots = if self.obey_robots {
            let robots = fetch_robots(&self.client, &start_url).await;
            self.frontier
                .apply_crawl_delay(robots.crawl_delay(&self.robots_agent));
            robots
        } else {
            ParsedRobots::allow_all()
        };

        let mut report = CrawlReport::default();
        let start_time = Instant::now();

        while let Some(url) = self.frontier.next_url() {
            if !is_allowed(&robots, &url, &self.robots_agent) {
                tracing::info!("Skipping {} (disallowed by robots.txt)", url);
                report.pages_skipped += 1;
                continue;
            }

            if let Some(wait) = self.frontier.time_until_next_request(Instant::now()) {
                tracing::trace!("Waiting {:?} before fetching {}", wait, url);
                tokio::time::sleep(wait).await;
            }

            self.frontier.record_request(Instant::now());
            self.process_url(&url, sink, &mut report).await?;
        }

        if self.frontier.budget_exhausted() && !self.frontier.is_empty() {
            tracing::info!(
                "Page budget of {} reached with {} pages still queued",
                self.frontier.dispatched(),
                self.frontier.len()
            );
        }

        sink.finish()?;

        tracing::info!(
            "Crawl finished in {:.1}s: {} pages fetched, {} failed, {} skipped, {} products",
            start_time.elapsed().as_secs_f64(),
            report.pages_fetched,
            report.pages_failed,
            report.pages_skipped,
            report.products
        );

        Ok(report)
    }

    /// Fetches and parses one listing page
    async fn process_url(
        &mut self,
        url: &Url,
        sink: &mut dyn RecordSink,
        report: &mut CrawlReport,
    ) -> Result<()> {
        tracing::debug!("Fetching {}", url);

        let (final_url, body) = match fetch_page(&self.client, url).await {
            FetchResult::Success {
                final_url,
                status_code,
                body,
                ..
            } => {
                tracing::trace!("{} returned HTTP {}", final_url, status_code);
                (final_url, body)
            }
            failure => {
                let reason = failure.describe_failure().unwrap_or_default();
                tracing::warn!("Failed to fetch {}: {}", url, reason);
                report.pages_failed += 1;
                return Ok(());
            }
        };

        if final_url != *url {
            tracing::debug!("{} redirected to {}", url, final_url);
            self.frontier.mark_seen(&final_url);
        }

        let listing = match self.parser.parse(&body, &final_url) {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", final_url, e);
                report.pages_failed += 1;
                return Ok(());
            }
        };

        report.pages_fetched += 1;
        report.pagination_links += listing.pagination.len();

        let products = listing.products.len();
        for record in listing.products {
            sink.accept(record)?;
        }
        report.products += products;

        let mut queued = 0;
        for reference in &listing.pagination {
            match resolve_reference(&final_url, reference.as_str()) {
                Some(next) => {
                    if self.frontier.push(next) {
                        queued += 1;
                    }
                }
                None => tracing::trace!("Ignoring pagination href {:?}", reference.as_str()),
            }
        }

        tracing::debug!(
            "Parsed {}: {} products, {} new pages queued, {} in frontier",
            final_url,
            products,
            queued,
            self.frontier.len()
        );

        Ok(())
    }
}

/// Crawls the configured listing and collects every record in memory
///
/// # Arguments
///
/// * `config` - The validated configuration
///
/// # Returns
///
/// The records in crawl order together with the crawl's counters
pub async fn crawl_listing(config: &Config) -> Result<(Vec<ProductRecord>, CrawlReport)> {
    let mut coordinator = Coordinator::new(config)?;
    let mut records = Vec::new();
    let report = coordinator.run(&mut records).await?;
    Ok((records, report))
}
