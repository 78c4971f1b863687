//! Link discovery and normalization for the crawler

use crate::crawler::CrawlerConfig;
use crate::crawler::error::CrawlError;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Link prefixes that never point at a crawlable page
const INVALID_PREFIXES: [&str; 4] = ["javascript:", "mailto:", "#", "about:blank"];

/// Static asset suffixes that are never crawled
const INVALID_SUFFIXES: [&str; 8] = [
    ".css", ".js", ".ico", ".png", ".jpg", ".jpeg", ".gif", ".svg",
];

#[derive(Debug, Clone)]
enum ExcludeRule {
    /// Absolute URL prefix, matched against the whole link
    Url(String),
    /// Path prefix, matched against the link's path
    Path(String),
}

/// Rules deciding which discovered links are followed
#[derive(Debug, Clone)]
pub struct LinkFilter {
    seed: Url,
    exclude: Vec<ExcludeRule>,
    prevent_outside: bool,
}

impl LinkFilter {
    /// Create a filter for a crawl rooted at `seed`
    pub fn new(seed: Url, exclude_dirs: &[String], prevent_outside: bool) -> Self {
        let exclude = exclude_dirs
            .iter()
            .map(|dir| match Url::parse(dir) {
                Ok(_) => ExcludeRule::Url(dir.clone()),
                Err(_) => ExcludeRule::Path(dir.clone()),
            })
            .collect();

        Self {
            seed,
            exclude,
            prevent_outside,
        }
    }

    /// Create a filter from a crawler configuration
    pub fn from_config(seed: Url, config: &CrawlerConfig) -> Self {
        Self::new(seed, &config.exclude_dirs, config.prevent_outside)
    }

    /// The seed URL this filter is rooted at
    pub fn seed(&self) -> &Url {
        &self.seed
    }

    /// Whether the URL falls under an excluded directory
    pub fn is_excluded(&self, url: &Url) -> bool {
        self.exclude.iter().any(|rule| match rule {
            ExcludeRule::Url(prefix) => url.as_str().starts_with(prefix.as_str()),
            ExcludeRule::Path(prefix) => url.path().starts_with(prefix.as_str()),
        })
    }

    /// Whether an absolute, already-normalized URL may be crawled
    pub fn allows(&self, url: &Url) -> bool {
        if self.is_excluded(url) {
            return false;
        }
        !self.prevent_outside || url.origin() == self.seed.origin()
    }
}

/// Resolve an `href` against the page it was found on and apply the filter.
///
/// Relative and protocol-relative links are made absolute, fragments are
/// stripped, and links to scripts, mail, static assets, excluded directories or
/// (optionally) other origins are dropped.
pub fn normalize_link(href: &str, base: &Url, filter: &LinkFilter) -> Option<Url> {
    let href = href.trim();
    let lowered = href.to_ascii_lowercase();
    if href.is_empty() || INVALID_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);

    let path = url.path().to_ascii_lowercase();
    if INVALID_SUFFIXES.iter().any(|suffix| path.ends_with(suffix)) {
        return None;
    }

    filter.allows(&url).then_some(url)
}

/// Extract the crawlable child links of a page, deduplicated in document order
pub fn get_child_links(html: &str, base: &Url, filter: &LinkFilter) -> Result<Vec<Url>, CrawlError> {
    let document = Html::parse_document(html);
    let anchor_selector = Selector::parse("a[href]")
        .map_err(|e| CrawlError::HtmlParse(format!("Failed to parse anchor selector: {}", e)))?;

    let mut seen = HashSet::new();
    let links = document
        .select(&anchor_selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| normalize_link(href, base, filter))
        .filter(|url| seen.insert(url.as_str().to_string()))
        .collect();

    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(exclude_dirs: &[&str], prevent_outside: bool) -> LinkFilter {
        let exclude_dirs: Vec<String> = exclude_dirs.iter().map(|s| s.to_string()).collect();
        LinkFilter::new(
            Url::parse("https://site/a/").unwrap(),
            &exclude_dirs,
            prevent_outside,
        )
    }

    fn base() -> Url {
        Url::parse("https://site/a/").unwrap()
    }

    #[test]
    fn test_resolves_relative_links() {
        let filter = filter(&[], true);

        let absolute_path = normalize_link("/docs/x", &base(), &filter).unwrap();
        assert_eq!(absolute_path.as_str(), "https://site/docs/x");

        let relative = normalize_link("b/c", &base(), &filter).unwrap();
        assert_eq!(relative.as_str(), "https://site/a/b/c");

        let parent = normalize_link("../up", &base(), &filter).unwrap();
        assert_eq!(parent.as_str(), "https://site/up");
    }

    #[test]
    fn test_resolves_protocol_relative_links() {
        let filter = filter(&[], true);
        let url = normalize_link("//site/guide", &base(), &filter).unwrap();
        assert_eq!(url.as_str(), "https://site/guide");
    }

    #[test]
    fn test_drops_invalid_prefixes_and_suffixes() {
        let filter = filter(&[], false);

        assert!(normalize_link("javascript:void(0)", &base(), &filter).is_none());
        assert!(normalize_link("mailto:someone@site", &base(), &filter).is_none());
        assert!(normalize_link("#section", &base(), &filter).is_none());
        assert!(normalize_link("about:blank", &base(), &filter).is_none());
        assert!(normalize_link("tel:+123", &base(), &filter).is_none());
        assert!(normalize_link("/images/logo.png", &base(), &filter).is_none());
        assert!(normalize_link("/static/app.JS", &base(), &filter).is_none());
        assert!(normalize_link("/styles/site.css", &base(), &filter).is_none());
        assert!(normalize_link("", &base(), &filter).is_none());
    }

    #[test]
    fn test_strips_fragments() {
        let filter = filter(&[], true);
        let url = normalize_link("/docs/x#install", &base(), &filter).unwrap();
        assert_eq!(url.as_str(), "https://site/docs/x");
    }

    #[test]
    fn test_drops_excluded_dirs() {
        let filter = filter(&["/blog", "https://site/private"], true);

        assert!(normalize_link("/blog/post-1", &base(), &filter).is_none());
        assert!(normalize_link("https://site/private/keys", &base(), &filter).is_none());
        assert!(normalize_link("/docs/blog", &base(), &filter).is_some());
    }

    #[test]
    fn test_prevent_outside() {
        let restricted = filter(&[], true);
        assert!(normalize_link("https://other.example/x", &base(), &restricted).is_none());
        assert!(normalize_link("http://site/a/", &base(), &restricted).is_none());

        let open = filter(&[], false);
        let url = normalize_link("https://other.example/x", &base(), &open).unwrap();
        assert_eq!(url.as_str(), "https://other.example/x");
    }

    #[test]
    fn test_get_child_links_deduplicates() {
        let html = r##"
            <html><body>
                <a href="/docs/x">X</a>
                <a href="/docs/x#part">X again</a>
                <a href="https://site/docs/x">X absolute</a>
                <a href="y">Y</a>
                <a href="mailto:a@site">Mail</a>
                <a>No href</a>
            </body></html>
        "##;

        let links = get_child_links(html, &base(), &filter(&[], true)).unwrap();
        let links: Vec<&str> = links.iter().map(Url::as_str).collect();
        assert_eq!(links, vec!["https://site/docs/x", "https://site/a/y"]);
    }
}
