//! Content extraction functionality for the crawler module

use crate::crawler::PageMetadata;
use crate::crawler::error::CrawlError;
use scraper::{Html, Selector};
use tracing::warn;

/// Line width handed to the renderer; wide enough that paragraphs stay on one line
const WRAP_WIDTH: usize = 1000;

/// Convert rendered HTML into plain text.
///
/// Markup decorations are dropped, link text stays inline with the
/// surrounding sentence and block elements are separated by blank lines.
/// Trailing whitespace is removed from every line.
///
/// # Arguments
///
/// * `html` - The HTML to convert
///
/// # Returns
///
/// The extracted text, empty if the page could not be rendered
pub fn html_to_text(html: &str) -> String {
    let rendered = match html2text::config::plain_no_decorate()
        .string_from_read(html.as_bytes(), WRAP_WIDTH)
    {
        Ok(rendered) => rendered,
        Err(e) => {
            warn!("Failed to render HTML as text: {}", e);
            return String::new();
        }
    };

    rendered
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Extract metadata from a page
///
/// # Arguments
///
/// * `url` - The URL the page was fetched from
/// * `html` - The HTML of the page
///
/// # Returns
///
/// The extracted metadata; `fetched_at` is left for the caller to stamp
pub fn extract_metadata(url: &str, html: &str) -> Result<PageMetadata, CrawlError> {
    let document = Html::parse_document(html);

    let title_selector = Selector::parse("title")
        .map_err(|e| CrawlError::HtmlParse(format!("Failed to parse title selector: {}", e)))?;

    let title = document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty());

    let description_selector = Selector::parse("meta[name='description']").map_err(|e| {
        CrawlError::HtmlParse(format!("Failed to parse description selector: {}", e))
    })?;

    let description = document
        .select(&description_selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(|s| s.to_string());

    let language = document
        .root_element()
        .value()
        .attr("lang")
        .map(|s| s.to_string());

    Ok(PageMetadata {
        source: url.to_string(),
        title,
        description,
        language,
        fetched_at: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
        <html lang="en">
        <head>
            <title> Getting Started </title>
            <meta name="description" content="How to install the tool">
            <style>body { color: red; }</style>
        </head>
        <body>
            <h1>Getting   Started</h1>
            <p>Read the <a href="/docs">installation docs</a> first.</p>
            <script>console.log("ignored");</script>
            <ul><li>One</li><li>Two</li></ul>
        </body>
        </html>"#;

    #[test]
    fn test_extract_metadata() {
        let metadata = extract_metadata("https://example.com/start", PAGE).unwrap();

        assert_eq!(metadata.source, "https://example.com/start");
        assert_eq!(metadata.title.as_deref(), Some("Getting Started"));
        assert_eq!(metadata.description.as_deref(), Some("How to install the tool"));
        assert_eq!(metadata.language.as_deref(), Some("en"));
        assert!(metadata.fetched_at.is_none());
    }

    #[test]
    fn test_extract_metadata_missing_fields() {
        let metadata = extract_metadata("https://example.com/", "<p>bare</p>").unwrap();

        assert_eq!(metadata.source, "https://example.com/");
        assert!(metadata.title.is_none());
        assert!(metadata.description.is_none());
        assert!(metadata.language.is_none());
    }

    #[test]
    fn test_html_to_text_keeps_link_text_inline() {
        let text = html_to_text(PAGE);

        assert!(text.contains("Read the installation docs first."));
        assert!(!text.contains("/docs"));
        assert!(text.contains("One"));
        assert!(text.contains("Two"));
    }

    #[test]
    fn test_html_to_text_skips_scripts_and_styles() {
        let text = html_to_text(PAGE);

        assert!(!text.contains("console.log"));
        assert!(!text.contains("color: red"));
        assert!(!text.contains("How to install"));
    }

    #[test]
    fn test_html_to_text_separates_blocks_and_trims_lines() {
        let text = html_to_text("<body><p>First   paragraph.</p><p>Second paragraph.</p></body>");

        assert!(text.starts_with("First paragraph."));
        assert!(text.ends_with("Second paragraph."));
        assert!(text.contains("\n\n"));
        assert!(text.lines().all(|line| line == line.trim_end()));
    }

    #[test]
    fn test_html_to_text_empty_page() {
        assert_eq!(html_to_text(""), "");
        assert_eq!(html_to_text("<html><body>  </body></html>"), "");
    }
}
