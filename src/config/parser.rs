use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable overriding `search.keyword`
pub const ENV_KEYWORD: &str = "NOTIFY_KEYWORD";

/// Environment variable overriding `search.category`
pub const ENV_CATEGORY: &str = "NOTIFY_CATEGORY";

/// Environment variable overriding `notify.webhook-url`
pub const ENV_WEBHOOK_URL: &str = "NOTIFY_WEBHOOK_URL";

/// Loads and parses a configuration file from the given path
///
/// Environment overrides are applied after parsing and before validation.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use suruga_watch::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Start URL: {}", config.search.start_url().unwrap());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

/// Parses TOML configuration content without validating it
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Applies environment overrides to a parsed configuration
///
/// `lookup` returns the value of an environment variable; empty values are
/// ignored.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

    if let Some(keyword) = get(ENV_KEYWORD) {
        tracing::debug!("Overriding search keyword from {}", ENV_KEYWORD);
        config.search.keyword = keyword;
    }

    if let Some(category) = get(ENV_CATEGORY) {
        tracing::debug!("Overriding search category from {}", ENV_CATEGORY);
        config.search.category = Some(category);
    }

    if let Some(webhook_url) = get(ENV_WEBHOOK_URL) {
        tracing::debug!("Overriding webhook URL from {}", ENV_WEBHOOK_URL);
        config.notify.webhook_url = Some(webhook_url);
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Each crawl run records this hash so runs made with different settings
/// can be told apart.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    Ok(hash_content(&content))
}

/// Hex-encoded SHA-256 of a configuration text
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
