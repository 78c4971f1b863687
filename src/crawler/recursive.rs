//! Recursive crawling with a bounded worker pool

use crate::crawler::content_extraction::{extract_metadata, html_to_text};
use crate::crawler::error::CrawlError;
use crate::crawler::fetcher::{HttpFetcher, PageFetcher};
use crate::crawler::links::{LinkFilter, get_child_links};
use crate::crawler::{CrawledPage, CrawlerConfig, PageMetadata};
use crate::document::Document;
use crate::indexing::{DocumentLoader, LoadError};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// State shared by every worker of one crawl
struct CrawlContext<F> {
    fetcher: Arc<F>,
    config: CrawlerConfig,
    filter: LinkFilter,
    permits: Semaphore,
    visited: DashSet<String>,
}

/// What a single visited node contributes to the crawl
struct NodeOutcome {
    page: Option<CrawledPage>,
    children: Vec<Url>,
    depth: u32,
}

impl NodeOutcome {
    fn empty(depth: u32) -> Self {
        Self {
            page: None,
            children: Vec::new(),
            depth,
        }
    }
}

/// Recursive crawler over a page fetcher.
///
/// Each call to [`Crawler::crawl`] starts from a fresh visited set, so a
/// crawler can be reused across runs.
pub struct Crawler<F> {
    fetcher: Arc<F>,
    config: CrawlerConfig,
}

impl Crawler<HttpFetcher> {
    /// Create a crawler fetching pages over HTTP
    pub fn http(config: CrawlerConfig) -> Result<Self, CrawlError> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::new(fetcher, config))
    }
}

impl<F> Crawler<F>
where
    F: PageFetcher + 'static,
{
    /// Create a crawler with the given fetcher and configuration
    pub fn new(fetcher: F, config: CrawlerConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            config,
        }
    }

    /// The fetcher used by this crawler
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// The crawler configuration
    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Crawl from `seed` and return documents, the seed's document first
    pub async fn crawl(&self, seed: &str) -> Result<Vec<Document>, CrawlError> {
        let pages = self.crawl_pages(seed).await?;
        Ok(pages.into_iter().map(Document::from).collect())
    }

    /// Crawl from `seed` and return the crawled pages, the seed's page first.
    ///
    /// Only an unparseable seed is an error. A failed fetch of the seed yields an
    /// empty result; failed fetches elsewhere only prune that branch.
    #[instrument(skip(self), fields(max_depth = self.config.max_depth))]
    pub async fn crawl_pages(&self, seed: &str) -> Result<Vec<CrawledPage>, CrawlError> {
        let mut seed_url = Url::parse(seed)?;
        seed_url.set_fragment(None);
        info!("Starting crawl for {}", seed_url);

        let context = Arc::new(CrawlContext {
            fetcher: Arc::clone(&self.fetcher),
            config: self.config.clone(),
            filter: LinkFilter::from_config(seed_url.clone(), &self.config),
            permits: Semaphore::new(self.config.max_concurrency.max(1)),
            visited: DashSet::new(),
        });
        context.visited.insert(seed_url.to_string());

        let root = visit(Arc::clone(&context), seed_url.clone(), 0).await;
        let Some(root_page) = root.page else {
            warn!("Seed {} could not be fetched, crawl is empty", seed_url);
            return Ok(Vec::new());
        };

        let mut pages = vec![root_page];
        let mut tasks = JoinSet::new();
        spawn_children(&mut tasks, &context, root.children, 1);

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    if let Some(page) = outcome.page {
                        pages.push(page);
                    }
                    spawn_children(&mut tasks, &context, outcome.children, outcome.depth + 1);
                }
                Err(e) => warn!("Crawl task failed: {}", e),
            }
        }

        info!("Crawl finished with {} pages", pages.len());
        Ok(pages)
    }
}

fn spawn_children<F>(
    tasks: &mut JoinSet<NodeOutcome>,
    context: &Arc<CrawlContext<F>>,
    children: Vec<Url>,
    depth: u32,
) where
    F: PageFetcher + 'static,
{
    if depth >= context.config.max_depth {
        return;
    }
    for child in children {
        // cheap pre-check; the claim inside the task is authoritative
        if context.visited.contains(child.as_str()) {
            continue;
        }
        tasks.spawn(claim_and_visit(Arc::clone(context), child, depth));
    }
}

async fn claim_and_visit<F>(context: Arc<CrawlContext<F>>, url: Url, depth: u32) -> NodeOutcome
where
    F: PageFetcher + 'static,
{
    if !context.visited.insert(url.to_string()) {
        debug!("Skipping already visited {}", url);
        return NodeOutcome::empty(depth);
    }
    visit(context, url, depth).await
}

async fn visit<F>(context: Arc<CrawlContext<F>>, url: Url, depth: u32) -> NodeOutcome
where
    F: PageFetcher + 'static,
{
    let html = match fetch_with_retries(&context, &url).await {
        Ok(html) => html,
        Err(e) => {
            warn!(url = %url, depth, "Fetch failed: {}", e);
            return NodeOutcome::empty(depth);
        }
    };

    let page = build_page(&url, &html);

    let children = if depth + 1 < context.config.max_depth {
        match get_child_links(&html, &url, &context.filter) {
            Ok(links) => links,
            Err(e) => {
                warn!(url = %url, "Failed to extract links: {}", e);
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };
    debug!(url = %url, depth, children = children.len(), "Visited page");

    NodeOutcome {
        page: Some(page),
        children,
        depth,
    }
}

async fn fetch_with_retries<F>(context: &CrawlContext<F>, url: &Url) -> Result<String, CrawlError>
where
    F: PageFetcher,
{
    let mut attempt = 0;
    loop {
        let result = {
            let _permit = context
                .permits
                .acquire()
                .await
                .map_err(|e| CrawlError::Other(format!("Failed to acquire semaphore: {}", e)))?;
            context.fetcher.fetch(url).await
        };

        match result {
            Ok(html) => return Ok(html),
            Err(e) if attempt < context.config.max_retries => {
                attempt += 1;
                debug!(url = %url, attempt, "Retrying after error: {}", e);
            }
            Err(e) => return Err(e),
        }
    }
}

fn build_page(url: &Url, html: &str) -> CrawledPage {
    let mut metadata = extract_metadata(url.as_str(), html).unwrap_or_else(|e| {
        warn!(url = %url, "Error extracting metadata: {:?}", e);
        PageMetadata::for_source(url.as_str())
    });
    metadata.fetched_at = Some(Utc::now().to_rfc3339());

    CrawledPage {
        url: url.to_string(),
        content: html_to_text(html),
        metadata,
    }
}

/// Crawl a site over HTTP
///
/// # Arguments
///
/// * `seed` - The URL to start from
/// * `config` - The crawler configuration
///
/// # Returns
///
/// The documents of every reachable, allowed page within the depth limit
pub async fn crawl(seed: &str, config: CrawlerConfig) -> Result<Vec<Document>, CrawlError> {
    Crawler::http(config)?.crawl(seed).await
}

/// A document loader that crawls a site on every `load()`.
///
/// Unlike [`crawl`], a crawl that finds no pages is an error here: an empty
/// load would otherwise tell full cleanup that every indexed page is gone.
#[derive(Debug, Clone)]
pub struct RecursiveUrlLoader {
    seed: String,
    config: CrawlerConfig,
}

impl RecursiveUrlLoader {
    /// Create a loader for the given seed URL
    pub fn new(seed: impl Into<String>, config: CrawlerConfig) -> Self {
        Self {
            seed: seed.into(),
            config,
        }
    }
}

#[async_trait]
impl DocumentLoader for RecursiveUrlLoader {
    async fn load(&self) -> Result<Vec<Document>, LoadError> {
        let documents = crawl(&self.seed, self.config.clone()).await?;
        if documents.is_empty() {
            return Err(CrawlError::EmptyCrawl(self.seed.clone()).into());
        }
        Ok(documents)
    }
}
