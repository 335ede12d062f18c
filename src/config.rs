// src/config.rs
// =============================================================================
// The one configuration object the crawl core sees.
//
// cli.rs turns command-line flags into a CrawlConfig; tests build one with
// struct update syntax on top of Default. Nothing else reads flags or env.
// =============================================================================

use anyhow::{bail, Result};
use std::time::Duration;

use crate::fetch::Scheme;

/// Where the reference crawl starts when no seed is given
pub const DEFAULT_SEED: &str = "https://niplav.github.io/twtxt.txt";

/// Hub hosts that aggregate everybody's feeds. References to them would
/// make every feed look like it mentions every other one.
pub const DEFAULT_DENY_HOSTS: [&str; 2] = ["feeds.twtxt.net", "feeds.twtxt.cc"];

pub const DEFAULT_USER_AGENT: &str =
    "twx/0.1.0 (+https://github.com/tkanos/we-are-twtxt; @we-are-twtxt-crawler)";

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub seed: String,
    /// A feed is alive if it has an activity line dated this year
    pub reference_year: u16,
    pub queue_capacity: usize,
    pub connect_timeout: Duration,
    /// Only the gemini fetcher performs its own TLS handshake
    pub handshake_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub deny_hosts: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED.to_string(),
            reference_year: 2022,
            queue_capacity: 30,
            connect_timeout: Duration::from_secs(1),
            handshake_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            deny_hosts: DEFAULT_DENY_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl CrawlConfig {
    /// Rejects configurations the crawl cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            bail!("queue capacity must be at least 1");
        }
        if Scheme::of(&self.seed).is_none() {
            bail!("seed '{}' is not an http, https, gemini or gopher URL", self.seed);
        }
        if !(1000..=9999).contains(&self.reference_year) {
            bail!("reference year {} is not a four digit year", self.reference_year);
        }
        Ok(())
    }
}
