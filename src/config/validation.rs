use crate::catalog::{ListingParser, SelectorSet};
use crate::config::types::{
    Config, CrawlerConfig, NotifyConfig, OutputConfig, SearchConfig, UserAgentConfig,
};
use crate::url::parse_http_url;
use crate::ConfigError;
use url::Url;

/// Discord rejects messages with more embeds than this
const MAX_EMBEDS_PER_MESSAGE: usize = 10;

/// Longest allowed pause between watch ticks (one week)
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_search_config(&config.search)?;
    validate_output_config(&config.output)?;
    validate_notify_config(&config.notify)?;
    validate_selectors(&config.selectors, &config.search)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be >= 1s, got {}s",
            config.request_timeout
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates the search the crawl starts from
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    let start_url = config.start_url()?;
    require_http(start_url.as_str(), "start URL")?;

    if config.start_url.is_none() && config.sort.is_empty() {
        return Err(ConfigError::Validation("sort cannot be empty".to_string()));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if matches!(config.records_path.as_deref(), Some("")) {
        return Err(ConfigError::Validation(
            "records_path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates notification configuration
fn validate_notify_config(config: &NotifyConfig) -> Result<(), ConfigError> {
    if let Some(webhook_url) = &config.webhook_url {
        require_http(webhook_url, "webhook_url")?;
    }

    if config.interval_minutes < 1 || config.interval_minutes > MAX_INTERVAL_MINUTES {
        return Err(ConfigError::Validation(format!(
            "interval_minutes must be between 1 and {}, got {}",
            MAX_INTERVAL_MINUTES, config.interval_minutes
        )));
    }

    if config.batch_size < 1 || config.batch_size > MAX_EMBEDS_PER_MESSAGE {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and {}, got {}",
            MAX_EMBEDS_PER_MESSAGE, config.batch_size
        )));
    }

    Url::parse(&config.author_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid author_url: {}", e)))?;

    Ok(())
}

/// Checks that every selector compiles
fn validate_selectors(selectors: &SelectorSet, search: &SearchConfig) -> Result<(), ConfigError> {
    for (name, selector) in selectors.entries() {
        if selector.trim().is_empty() {
            return Err(ConfigError::InvalidSelector(format!(
                "{} selector cannot be empty",
                name
            )));
        }
    }

    ListingParser::with_selectors(search.start_url()?, selectors)
        .map_err(|e| ConfigError::InvalidSelector(e.to_string()))?;

    Ok(())
}

/// Parses an absolute http(s) URL with a host
fn require_http(url: &str, what: &str) -> Result<Url, ConfigError> {
    parse_http_url(url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, url, e)))
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| ConfigError::Validation(format!("Invalid email format: '{}'", email)))?;

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
