//! New-product watcher
//!
//! A watch tick crawls the configured listing, compares the products against
//! every product seen before, and announces the new ones. The very first tick
//! only records what is listed so that existing products are not announced.

mod diff;
mod webhook;

pub use diff::find_new_products;
pub use webhook::{
    Embed, EmbedAuthor, EmbedField, EmbedThumbnail, Notifier, WebhookError, WebhookMessage,
};

use crate::config::Config;
use crate::crawler::{build_http_client, Coordinator};
use crate::storage::{open_storage, SqliteStorage, Storage};
use crate::{Result, WatchError};
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use url::Url;

/// What a watch tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The store was empty; the crawl was stored without notifying
    Seeded { products: usize },

    /// The crawl was compared against the store
    Compared { new: usize },
}

/// Runs watch ticks against one database
pub struct Watcher {
    config: Config,
    config_hash: String,
    storage: SqliteStorage,
    client: Client,
    notifier: Option<Notifier>,
}

impl Watcher {
    /// Creates a watcher using the database at `output.database-path`
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `config_hash` - Hash of the configuration file, recorded with each run
    pub fn new(config: Config, config_hash: String) -> Result<Self> {
        let storage = open_storage(Path::new(&config.output.database_path))?;
        Self::with_storage(config, config_hash, storage)
    }

    /// Creates a watcher over an already opened database
    pub fn with_storage(
        config: Config,
        config_hash: String,
        storage: SqliteStorage,
    ) -> Result<Self> {
        let client = build_http_client(&config.user_agent, config.crawler.request_timeout)?;

        let notifier = match config.notify.webhook_url.as_deref() {
            Some(webhook_url) => {
                let webhook_url = Url::parse(webhook_url)?;
                let base_url = config.search.start_url()?;
                Some(Notifier::new(
                    client.clone(),
                    webhook_url,
                    &config.notify,
                    base_url,
                ))
            }
            None => {
                tracing::info!("No webhook configured; new products will only be logged");
                None
            }
        };

        Ok(Self {
            config,
            config_hash,
            storage,
            client,
            notifier,
        })
    }

    /// The watcher's database
    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Runs a single watch tick
    ///
    /// The tick is recorded as a run; if it fails, the run is marked failed
    /// and the error returned.
    pub async fn run_once(&mut self) -> Result<WatchOutcome> {
        let run_id = self.storage.create_run(&self.config_hash)?;
        tracing::info!("Starting watch run {}", run_id);

        match self.tick(run_id).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if let Err(mark_err) = self.storage.fail_run(run_id, &e.to_string()) {
                    tracing::error!("Failed to mark run {} as failed: {}", run_id, mark_err);
                }
                Err(e)
            }
        }
    }

    async fn tick(&mut self, run_id: i64) -> Result<WatchOutcome> {
        let mut coordinator = Coordinator::with_client(&self.config, self.client.clone())?;
        let mut records = Vec::new();
        let report = coordinator.run(&mut records).await?;

        if report.pages_fetched == 0 {
            return Err(WatchError::Crawl(format!(
                "no listing page could be crawled ({} failed, {} skipped)",
                report.pages_failed, report.pages_skipped
            )));
        }

        let seen = records.len() as u64;

        if self.storage.count_products()? == 0 {
            let stored = self.storage.upsert_products(&records, run_id)?;
            self.storage.complete_run(run_id, seen, stored as u64)?;
            tracing::info!("Stored {} products as the initial state", stored);
            return Ok(WatchOutcome::Seeded { products: stored });
        }

        let known = self.storage.known_product_ids()?;
        let new = find_new_products(&known, &records);
        tracing::info!("Found {} new products", new.len());

        for product in &new {
            tracing::debug!(
                "New product {}: {}",
                product.id.as_deref().unwrap_or("?"),
                product.name.as_deref().unwrap_or("").trim()
            );
        }

        // Stored only after delivery; a failed delivery leaves them new for the next tick
        if let Some(notifier) = &self.notifier {
            notifier.notify(&new).await?;
        }

        let inserted = self.storage.upsert_products(&records, run_id)?;
        self.storage.complete_run(run_id, seen, inserted as u64)?;

        Ok(WatchOutcome::Compared { new: new.len() })
    }

    /// Runs a tick now and then every `interval-minutes` until Ctrl-C or SIGTERM
    ///
    /// A failing tick is logged and the loop continues.
    pub async fn run_forever(&mut self) -> Result<()> {
        let period = tick_period(self.config.notify.interval_minutes);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "Watching {} every {} minutes",
            self.config.search.start_url()?,
            self.config.notify.interval_minutes
        );

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received, stopping watcher");
                    break;
                }
                _ = interval.tick() => {
                    match self.run_once().await {
                        Ok(WatchOutcome::Seeded { products }) => {
                            tracing::info!("Seeded store with {} products", products);
                        }
                        Ok(WatchOutcome::Compared { new }) => {
                            tracing::info!("Watch tick complete, {} new products", new);
                        }
                        Err(e) => tracing::error!("Watch tick failed: {}", e),
                    }
                }
            }
        }

        Ok(())
    }
}

/// Time between two watch ticks, never zero
fn tick_period(interval_minutes: u64) -> Duration {
    Duration::from_secs(interval_minutes.max(1).saturating_mul(60))
}

/// Resolves on Ctrl-C, or on SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
