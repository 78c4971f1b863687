//! # Crawler Configuration Module
//!
//! Configuration for the recursive crawler with a builder for fluent setup.
//! Defaults match a polite documentation crawl: depth 2, a 10 second hard
//! timeout per request, origin-restricted, at most 64 fetches in flight and no
//! retries.

use std::time::Duration;

/// Configuration for the crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Depth limit; the seed is depth 0 and pages at depth `>= max_depth` are not fetched
    pub max_depth: u32,

    /// Hard per-request timeout in milliseconds
    pub timeout_ms: u64,

    /// Links under any of these prefixes are dropped. An entry that parses as an
    /// absolute URL is matched against the whole link, otherwise against its path.
    pub exclude_dirs: Vec<String>,

    /// Whether to drop links outside the seed's origin
    pub prevent_outside: bool,

    /// Maximum number of fetches in flight across the whole crawl
    pub max_concurrency: usize,

    /// Additional attempts after a failed fetch
    pub max_retries: u32,

    /// User agent to use for requests
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            timeout_ms: 10_000,
            exclude_dirs: Vec::new(),
            prevent_outside: true,
            max_concurrency: 64,
            max_retries: 0,
            user_agent: format!("docsync-crawler/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Builder for CrawlerConfig
#[derive(Debug, Default)]
pub struct CrawlerConfigBuilder {
    config: CrawlerConfig,
}

impl CrawlerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig::default(),
        }
    }

    /// Set the depth limit
    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Set the per-request timeout in milliseconds
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.timeout_ms = timeout_ms;
        self
    }

    /// Set the excluded directory prefixes
    pub fn exclude_dirs(mut self, exclude_dirs: Vec<String>) -> Self {
        self.config.exclude_dirs = exclude_dirs;
        self
    }

    /// Set whether links outside the seed's origin are dropped
    pub fn prevent_outside(mut self, prevent_outside: bool) -> Self {
        self.config.prevent_outside = prevent_outside;
        self
    }

    /// Set the global concurrency ceiling
    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.max_concurrency = max_concurrency;
        self
    }

    /// Set the number of retries after a failed fetch
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> CrawlerConfig {
        self.config
    }
}

impl CrawlerConfig {
    /// Create a new builder
    pub fn builder() -> CrawlerConfigBuilder {
        CrawlerConfigBuilder::new()
    }

    /// Get the per-request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
