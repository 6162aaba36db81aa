//! Statistics generation from the watch database
//!
//! This module provides functionality for extracting and displaying
//! watch statistics from the storage layer.

use crate::storage::{RunRecord, RunStatus, Storage, StoredProduct};
use crate::WatchError;

/// Number of recent products shown by `print_statistics`
pub const RECENT_PRODUCTS_SHOWN: usize = 10;

/// Watch statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Total number of runs recorded
    pub total_runs: u64,

    /// Runs that finished successfully
    pub completed_runs: u64,

    /// Runs that ended with an error
    pub failed_runs: u64,

    /// Number of distinct products known
    pub total_products: u64,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// Most recently discovered products, newest first
    pub recent_products: Vec<StoredProduct>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(WatchError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<CrawlStatistics, WatchError> {
    Ok(CrawlStatistics {
        total_runs: storage.count_runs(None)?,
        completed_runs: storage.count_runs(Some(RunStatus::Completed))?,
        failed_runs: storage.count_runs(Some(RunStatus::Failed))?,
        total_products: storage.count_products()?,
        latest_run: storage.get_latest_run()?,
        recent_products: storage.recent_products(RECENT_PRODUCTS_SHOWN)?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Watch Statistics ===\n");

    println!("Overview:");
    println!("  Known products: {}", stats.total_products);
    println!(
        "  Runs: {} ({} completed, {} failed)",
        stats.total_runs, stats.completed_runs, stats.failed_runs
    );
    println!();

    if let Some(run) = &stats.latest_run {
        println!("Latest Run (#{}):", run.id);
        println!("  Status: {}", run.status.to_db_string());
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Products seen: {}", run.products_seen);
        println!("  New products: {}", run.products_new);
        if let Some(error) = &run.error_message {
            println!("  Error: {}", error);
        }
        println!();
    }

    if !stats.recent_products.is_empty() {
        println!("Recently Discovered:");
        for product in &stats.recent_products {
            let record = &product.record;
            println!(
                "  - [{}] {} ({}) first seen {}",
                record.id.as_deref().unwrap_or("?"),
                record.name.as_deref().unwrap_or("(untitled)").trim(),
                record.price.as_deref().unwrap_or("no price").trim(),
                product.first_seen_at
            );
        }
        println!();
    }

    let success_rate = if stats.total_runs > 0 {
        (stats.completed_runs as f64 / stats.total_runs as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} runs completed)",
        success_rate, stats.completed_runs, stats.total_runs
    );
}
