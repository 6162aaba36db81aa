//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::catalog::{CategoryRef, ProductRecord};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, StoredProduct};
use crate::WatchError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;

const RUN_COLUMNS: &str =
    "id, started_at, finished_at, config_hash, status, products_seen, products_new, error_message";

const PRODUCT_COLUMNS: &str =
    "id, url, name, image, date, categories, price, first_seen_at, last_seen_at, first_seen_run";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(WatchError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, WatchError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, WatchError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
        products_seen: row.get::<_, i64>(5)? as u64,
        products_new: row.get::<_, i64>(6)? as u64,
        error_message: row.get(7)?,
    })
}

/// Reads a product row; categories stay as JSON text until decoded
fn product_from_row(row: &Row<'_>) -> rusqlite::Result<(StoredProduct, String)> {
    let categories: String = row.get(5)?;
    let product = StoredProduct {
        record: ProductRecord {
            id: row.get(0)?,
            url: row.get(1)?,
            name: row.get(2)?,
            image: row.get(3)?,
            date: row.get(4)?,
            categories: Vec::new(),
            price: row.get(6)?,
        },
        first_seen_at: row.get(7)?,
        last_seen_at: row.get(8)?,
        first_seen_run: row.get(9)?,
    };
    Ok((product, categories))
}

fn decode_product((mut product, categories): (StoredProduct, String)) -> StorageResult<StoredProduct> {
    product.record.categories = serde_json::from_str::<Vec<CategoryRef>>(&categories)?;
    Ok(product)
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn complete_run(
        &mut self,
        run_id: i64,
        products_seen: u64,
        products_new: u64,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, products_seen = ?3, products_new = ?4
             WHERE id = ?5",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                products_seen as i64,
                products_new as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64, error_message: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, error_message = ?3 WHERE id = ?4",
            params![RunStatus::Failed.to_db_string(), now, error_message, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn count_runs(&self, status: Option<RunStatus>) -> StorageResult<u64> {
        let count: i64 = match status {
            Some(status) => self.conn.query_row(
                "SELECT COUNT(*) FROM runs WHERE status = ?1",
                params![status.to_db_string()],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    // ===== Product Management =====

    fn count_products(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn known_product_ids(&self) -> StorageResult<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT id FROM products")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    fn upsert_products(
        &mut self,
        products: &[ProductRecord],
        run_id: i64,
    ) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut inserted = 0;

        {
            let mut exists = tx.prepare("SELECT 1 FROM products WHERE id = ?1")?;
            let mut insert = tx.prepare(
                "INSERT INTO products (id, url, name, image, date, categories, price,
                 first_seen_at, last_seen_at, first_seen_run)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?9)",
            )?;
            let mut refresh = tx.prepare(
                "UPDATE products SET url = ?2, name = ?3, image = ?4, date = ?5,
                 categories = ?6, price = ?7, last_seen_at = ?8 WHERE id = ?1",
            )?;

            for product in products {
                let Some(id) = product.id.as_deref() else {
                    tracing::debug!("Skipping product without id: {:?}", product.name);
                    continue;
                };

                let categories = serde_json::to_string(&product.categories)?;
                let known = exists.exists(params![id])?;

                if known {
                    refresh.execute(params![
                        id,
                        product.url,
                        product.name,
                        product.image,
                        product.date,
                        categories,
                        product.price,
                        now
                    ])?;
                } else {
                    insert.execute(params![
                        id,
                        product.url,
                        product.name,
                        product.image,
                        product.date,
                        categories,
                        product.price,
                        now,
                        run_id
                    ])?;
                    inserted += 1;
                }
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn get_product(&self, id: &str) -> StorageResult<Option<StoredProduct>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS),
                params![id],
                product_from_row,
            )
            .optional()?;

        row.map(decode_product).transpose()
    }

    fn recent_products(&self, limit: usize) -> StorageResult<Vec<StoredProduct>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM products ORDER BY first_seen_at DESC, rowid DESC LIMIT ?1",
            PRODUCT_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![limit as i64], product_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(decode_product).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: Option<&str>, price: &str) -> ProductRecord {
        ProductRecord {
            id: id.map(str::to_string),
            url: id.map(|id| format!("/en/product/{}", id)),
            name: Some("Figure".to_string()),
            image: None,
            date: "2024-01-01".to_string(),
            categories: vec![CategoryRef {
                name: Some("Hobby".to_string()),
                url: Some("/c/hobby".to_string()),
            }],
            price: Some(price.to_string()),
        }
    }

    #[test]
    fn test_create_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash").unwrap();
        assert!(run_id > 0);

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.config_hash, "test_hash");
        assert!(run.finished_at.is_none());
    }

    #[test]
    fn test_get_missing_run() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.get_run(99),
            Err(StorageError::RunNotFound(99))
        ));
    }

    #[test]
    fn test_complete_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash").unwrap();
        storage.complete_run(run_id, 40, 3).unwrap();

        let run = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(run.id, run_id);
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.products_seen, 40);
        assert_eq!(run.products_new, 3);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_fail_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash").unwrap();
        storage.fail_run(run_id, "connection refused").unwrap();

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error_message.as_deref(), Some("connection refused"));
        assert_eq!(storage.count_runs(Some(RunStatus::Failed)).unwrap(), 1);
        assert_eq!(storage.count_runs(Some(RunStatus::Completed)).unwrap(), 0);
        assert_eq!(storage.count_runs(None).unwrap(), 1);
    }

    #[test]
    fn test_upsert_counts_only_new_products() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run1 = storage.create_run("h").unwrap();

        let inserted = storage
            .upsert_products(&[product(Some("1"), "¥100"), product(Some("2"), "¥200")], run1)
            .unwrap();
        assert_eq!(inserted, 2);

        let run2 = storage.create_run("h").unwrap();
        let inserted = storage
            .upsert_products(&[product(Some("2"), "¥150"), product(Some("3"), "¥300")], run2)
            .unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(storage.count_products().unwrap(), 3);

        let refreshed = storage.get_product("2").unwrap().unwrap();
        assert_eq!(refreshed.record.price.as_deref(), Some("¥150"));
        assert_eq!(refreshed.first_seen_run, run1);
    }

    #[test]
    fn test_upsert_skips_products_without_id() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("h").unwrap();

        let inserted = storage
            .upsert_products(&[product(None, "¥100"), product(Some("5"), "¥500")], run_id)
            .unwrap();

        assert_eq!(inserted, 1);
        assert_eq!(
            storage.known_product_ids().unwrap(),
            HashSet::from(["5".to_string()])
        );
    }

    #[test]
    fn test_categories_round_trip_through_json_column() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("h").unwrap();
        storage
            .upsert_products(&[product(Some("9"), "¥900")], run_id)
            .unwrap();

        let stored = storage.get_product("9").unwrap().unwrap();
        assert_eq!(stored.record, product(Some("9"), "¥900"));
        assert!(storage.get_product("missing").unwrap().is_none());
    }

    #[test]
    fn test_recent_products_newest_first() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("h").unwrap();
        storage
            .upsert_products(
                &[
                    product(Some("a"), "¥1"),
                    product(Some("b"), "¥2"),
                    product(Some("c"), "¥3"),
                ],
                run_id,
            )
            .unwrap();

        let recent = storage.recent_products(2).unwrap();
        let ids: Vec<_> = recent
            .iter()
            .map(|p| p.record.id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watch.db");

        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            let run_id = storage.create_run("h").unwrap();
            storage
                .upsert_products(&[product(Some("1"), "¥1")], run_id)
                .unwrap();
        }

        let storage = SqliteStorage::new(&path).unwrap();
        assert_eq!(storage.count_products().unwrap(), 1);
        assert_eq!(storage.count_runs(None).unwrap(), 1);
    }
}
