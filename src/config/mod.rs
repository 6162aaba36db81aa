//! Configuration module for Suruga-Watch
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use suruga_watch::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawler will fetch at most {} pages", config.crawler.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, NotifyConfig, OutputConfig, SearchConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, hash_content, load_config, load_config_with_hash,
    parse_config, ENV_CATEGORY, ENV_KEYWORD, ENV_WEBHOOK_URL,
};
pub use validation::validate;
