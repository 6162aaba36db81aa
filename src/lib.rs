//! Suruga-Watch: a catalog listing crawler and new-product watcher
//!
//! This crate extracts product listings from Suruga-ya's product search pages,
//! follows their pagination, remembers which products it has already seen,
//! and announces newly listed products to a webhook.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod storage;
pub mod url;
pub mod watch;

use thiserror::Error;

/// Main error type for Suruga-Watch operations
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Crawl failed: {0}")]
    Crawl(String),

    #[error("Extraction error: {0}")]
    Extract(#[from] catalog::ExtractError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Webhook error: {0}")]
    Webhook(#[from] watch::WebhookError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector in config: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Suruga-Watch operations
pub type Result<T> = std::result::Result<T, WatchError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use catalog::{CategoryRef, ListingParser, PageReference, ParsedListing, ProductRecord};
pub use config::Config;
pub use crawler::{crawl_listing, CrawlReport};
pub use watch::{WatchOutcome, Watcher};
