//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::catalog::ProductRecord;
use crate::storage::{RunRecord, RunStatus, StoredProduct};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The store remembers every product the watcher has seen so a crawl can be
/// diffed against it, plus one record per watch run.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new run in the `Running` state
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as completed with its product counts
    fn complete_run(
        &mut self,
        run_id: i64,
        products_seen: u64,
        products_new: u64,
    ) -> StorageResult<()>;

    /// Marks a run as failed
    fn fail_run(&mut self, run_id: i64, error_message: &str) -> StorageResult<()>;

    /// Counts runs, optionally restricted to one status
    fn count_runs(&self, status: Option<RunStatus>) -> StorageResult<u64>;

    // ===== Product Management =====

    /// Counts the known products
    fn count_products(&self) -> StorageResult<u64>;

    /// Returns the ids of every known product
    fn known_product_ids(&self) -> StorageResult<HashSet<String>>;

    /// Inserts unknown products and refreshes known ones
    ///
    /// Records without an id cannot be tracked and are skipped.
    ///
    /// # Returns
    ///
    /// The number of products that were not known before
    fn upsert_products(&mut self, products: &[ProductRecord], run_id: i64)
        -> StorageResult<usize>;

    /// Gets a product by its id
    fn get_product(&self, id: &str) -> StorageResult<Option<StoredProduct>>;

    /// Most recently discovered products, newest first
    fn recent_products(&self, limit: usize) -> StorageResult<Vec<StoredProduct>>;
}
