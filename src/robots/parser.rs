//! Robots.txt rules for the catalog host
//!
//! Allow/disallow matching is delegated to the robotstxt crate; only the
//! `Crawl-delay` extension is parsed here.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// Used when robots.txt is missing or cannot be fetched.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
        }
    }

    /// Checks if a URL is allowed for the given user agent token
    ///
    /// # Arguments
    ///
    /// * `url` - The absolute URL to check
    /// * `user_agent` - The crawler's product token, e.g. `suruga-watch`
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Gets the crawl delay in seconds for a specific user agent
    ///
    /// A delay in a group naming the agent wins over one in the `*` group.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        let agent = user_agent.to_lowercase();

        let mut group_agents: Vec<String> = Vec::new();
        let mut in_agent_lines = false;
        let mut delay_for_agent: Option<f64> = None;
        let mut delay_for_wildcard: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            if key == "user-agent" {
                // Consecutive User-agent lines share one group
                if !in_agent_lines {
                    group_agents.clear();
                    in_agent_lines = true;
                }
                group_agents.push(value.to_lowercase());
                continue;
            }

            in_agent_lines = false;

            if key != "crawl-delay" {
                continue;
            }

            let Ok(delay) = value.parse::<f64>() else {
                continue;
            };

            if group_agents.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                delay_for_agent.get_or_insert(delay);
            } else if group_agents.iter().any(|ua| ua == "*") {
                delay_for_wildcard.get_or_insert(delay);
            }
        }

        delay_for_agent.or(delay_for_wildcard)
    }
}
