use crate::catalog::SelectorSet;
use crate::ConfigError;
use serde::Deserialize;
use url::Url;

/// Main configuration structure for Suruga-Watch
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub search: SearchConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub selectors: SelectorSet,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of pages fetched in one crawl
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Minimum time between two requests (milliseconds)
    #[serde(rename = "request-delay", default = "default_request_delay")]
    pub request_delay: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Whether robots.txt of the catalog host is honored
    #[serde(rename = "obey-robots", default = "default_true")]
    pub obey_robots: bool,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the user agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Product search the crawl starts from
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchConfig {
    /// Search endpoint, e.g. `https://www.suruga-ya.com/en/products`
    pub base_url: String,

    /// Search keyword
    #[serde(default)]
    pub keyword: String,

    /// Optional category filter
    #[serde(default)]
    pub category: Option<String>,

    /// Result ordering; newest listings first by default
    #[serde(default = "default_sort")]
    pub sort: String,

    /// Explicit start URL, used verbatim instead of the built search URL
    #[serde(default)]
    pub start_url: Option<String>,
}

impl SearchConfig {
    /// Resolves the URL the crawl starts from
    ///
    /// Without an explicit `start-url` this is the search endpoint with the
    /// query `btn_search=&keyword=<keyword>&sort=<sort>[&category=<category>]`.
    ///
    /// # Example
    ///
    /// ```
    /// use suruga_watch::config::SearchConfig;
    ///
    /// let search = SearchConfig {
    ///     base_url: "https://www.suruga-ya.com/en/products".to_string(),
    ///     keyword: "figure".to_string(),
    ///     category: None,
    ///     sort: "updated_date_desc".to_string(),
    ///     start_url: None,
    /// };
    /// assert_eq!(
    ///     search.start_url().unwrap().as_str(),
    ///     "https://www.suruga-ya.com/en/products?btn_search=&keyword=figure&sort=updated_date_desc"
    /// );
    /// ```
    pub fn start_url(&self) -> Result<Url, ConfigError> {
        if let Some(explicit) = &self.start_url {
            return Url::parse(explicit).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid start-url '{}': {}", explicit, e))
            });
        }

        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", self.base_url, e))
        })?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("btn_search", "");
            query.append_pair("keyword", &self.keyword);
            query.append_pair("sort", &self.sort);
            if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
                query.append_pair("category", category);
            }
        }

        Ok(url)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Where `--dump` writes JSON lines (stdout when unset)
    #[serde(rename = "records-path", default)]
    pub records_path: Option<String>,
}

/// New-product notification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NotifyConfig {
    /// Webhook receiving the new-product embeds; notifications are off when unset
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Minutes between two watch ticks
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,

    /// Maximum number of embeds per webhook message
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Author block shown on every embed
    #[serde(default = "default_author_name")]
    pub author_name: String,

    #[serde(default = "default_author_url")]
    pub author_url: String,

    #[serde(default = "default_author_icon_url")]
    pub author_icon_url: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            interval_minutes: default_interval_minutes(),
            batch_size: default_batch_size(),
            author_name: default_author_name(),
            author_url: default_author_url(),
            author_icon_url: default_author_icon_url(),
        }
    }
}

fn default_max_pages() -> u32 {
    50
}

fn default_request_delay() -> u64 {
    1000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_sort() -> String {
    "updated_date_desc".to_string()
}

fn default_interval_minutes() -> u64 {
    15
}

/// Discord accepts at most 10 embeds per message
fn default_batch_size() -> usize {
    10
}

fn default_author_name() -> String {
    "Suruga-ya.com".to_string()
}

fn default_author_url() -> String {
    "https://www.suruga-ya.com/en/".to_string()
}

fn default_author_icon_url() -> String {
    "https://www.suruga-ya.com/sites/default/files_light/pwa/images/icons/favicon-32x32.png.webp?v=1"
        .to_string()
}
