//! Storage module for persisting watch state
//!
//! This module handles all database operations for the watcher, including:
//! - SQLite database initialization and schema management
//! - The set of known products and when each was first seen
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::catalog::ProductRecord;
use crate::WatchError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(WatchError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, WatchError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    SqliteStorage::new(path)
}

/// Represents a watch run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub products_seen: u64,
    pub products_new: u64,
    pub error_message: Option<String>,
}

/// A product as remembered by the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProduct {
    pub record: ProductRecord,
    pub first_seen_at: String,
    pub last_seen_at: String,
    pub first_seen_run: i64,
}

/// Status of a watch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
