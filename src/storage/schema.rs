//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Suruga-Watch database.

use rusqlite::Connection;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track watch runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    products_seen INTEGER NOT NULL DEFAULT 0,
    products_new INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);

-- Every product ever listed, keyed by the site's product id
CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    url TEXT,
    name TEXT,
    image TEXT,
    date TEXT NOT NULL,
    categories TEXT NOT NULL,
    price TEXT,
    first_seen_at TEXT NOT NULL,
    last_seen_at TEXT NOT NULL,
    first_seen_run INTEGER NOT NULL REFERENCES runs(id)
);

CREATE INDEX IF NOT EXISTS idx_products_first_seen ON products(first_seen_at);
"#;

/// Creates all tables and indexes if they do not exist yet
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
