//! Link extraction from HTML documents
//!
//! Collects the hyperlinks a page points at, resolved to absolute URLs
//! against the page's own address. A link that cannot be resolved is dropped
//! on its own; the rest of the page is still used.

use scraper::{Html, Selector};
use url::Url;

const SKIPPED_SCHEMES: [&str; 4] = ["javascript:", "mailto:", "tel:", "data:"];

/// Extracts every followable link from an HTML document
///
/// # Link Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - empty and fragment-only hrefs
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - anything that does not resolve to an `http`/`https` URL
///
/// Links are returned in document order and may contain duplicates.
///
/// # Example
///
/// ```
/// use ripple_crawl::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// assert_eq!(extract_links(html, &base_url), vec!["https://example.com/page"]);
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    if let Ok(anchors) = Selector::parse("a[href], link[rel='canonical'][href]") {
        for element in document.select(&anchors) {
            let element = element.value();
            if element.name() == "a" && element.attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.attr("href") {
                if let Some(absolute) = resolve_link(href, base_url) {
                    links.push(absolute);
                }
            }
        }
    }

    links
}

/// Resolves an href against the page URL, or `None` if it should not be followed
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if matches!(absolute.scheme(), "http" | "https") => Some(absolute.into()),
        Ok(_) => None,
        Err(e) => {
            tracing::trace!("Skipping unresolvable link {:?} on {}: {}", href, base_url, e);
            None
        }
    }
}
