//! Page fetching for the crawler

use crate::crawler::CrawlerConfig;
use crate::crawler::error::CrawlError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Fetches the rendered HTML of a page.
///
/// Implementations must bound each call by their own timeout; the crawler
/// treats every error as a local failure of that URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page and return its HTML
    async fn fetch(&self, url: &Url) -> Result<String, CrawlError>;
}

/// Plain HTTP fetcher with a hard per-request timeout
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher from the crawler configuration
    pub fn new(config: &CrawlerConfig) -> Result<Self, CrawlError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            timeout: config.timeout(),
        })
    }

    async fn fetch_html(&self, url: &Url) -> Result<String, CrawlError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("text/html")
            .to_string();
        if !content_type.contains("html") {
            return Err(CrawlError::UnsupportedContent {
                url: url.to_string(),
                content_type,
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<String, CrawlError> {
        debug!("Fetching content from {}", url);
        tokio::time::timeout(self.timeout, self.fetch_html(url))
            .await
            .map_err(|_| CrawlError::Timeout {
                url: url.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            })?
    }
}
