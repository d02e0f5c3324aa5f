//! Document and stylesheet parsing for link extraction
//!
//! This module handles parsing fetched content to extract:
//! - Every URL-bearing attribute of every element
//! - `url(...)` references in inline styles, `<style>` blocks and stylesheets
//! - The robots `noindex` directive from meta elements and response headers
//! - The page title

use crate::url::{parse_crawlable, resolve};
use crate::CrawlError;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Attributes whose whole value is a single URL reference
const URL_ATTRIBUTES: &[&str] = &[
    "href",
    "src",
    "poster",
    "data",
    "action",
    "cite",
    "background",
];

static CSS_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"url\(([^)]*)\)").expect("CSS url() regex is valid"));

/// Extracted information from a document
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// All links found on the page (absolute, fragment-free, deduplicated)
    pub links: Vec<String>,

    /// Whether a robots meta element asks not to index the page
    pub noindex: bool,
}

/// Parses a fetched document and extracts links and metadata
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `href`, `src`, `poster`, `data`, `action`, `cite`, `background` attributes
/// - Each candidate URL of a `srcset` attribute
/// - `url(...)` references in `style` attributes and `<style>` elements
///
/// **Exclude:**
/// - Empty and fragment-only references
/// - `javascript:`, `mailto:`, `tel:` and `data:` references
/// - Anything that does not resolve to an http(s) URL
///
/// # Arguments
///
/// * `page_url` - The URL the document was fetched from
/// * `content_type` - The response `Content-Type`, if any
/// * `body` - The document text
///
/// # Returns
///
/// * `Ok(ParsedPage)` - Successfully parsed page
/// * `Err(CrawlError::Parse)` - The content type is not a markup or text type
///
/// # Example
///
/// ```
/// use driftnet::crawler::parse_page;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let parsed = parse_page("https://example.com/", Some("text/html"), html).unwrap();
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["https://example.com/page"]);
/// ```
pub fn parse_page(
    page_url: &str,
    content_type: Option<&str>,
    body: &str,
) -> Result<ParsedPage, CrawlError> {
    if let Some(content_type) = content_type {
        if !is_markup_content_type(content_type) {
            return Err(CrawlError::Parse {
                url: page_url.to_string(),
                message: format!("Unsupported content type: {}", content_type),
            });
        }
    }

    let document = Html::parse_document(body);

    Ok(ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, page_url),
        noindex: has_noindex_meta(&document),
    })
}

/// Extracts `url(...)` references from stylesheet text
///
/// Quotes around the reference are stripped and each reference is resolved
/// against `base_url`. The result is deduplicated in order of appearance.
pub fn extract_css_urls(css: &str, base_url: &str) -> Vec<String> {
    let mut links = LinkSet::default();
    for candidate in css_references(css) {
        links.add(candidate, base_url);
    }
    links.into_vec()
}

/// Returns true if a robots directive value contains `noindex`
///
/// Used for both the `X-Robots-Tag` response header and the content of a
/// `<meta name="robots">` element.
pub fn is_noindex(directive: &str) -> bool {
    directive.to_ascii_lowercase().contains("noindex")
}

/// Returns true for content types the document parser can handle
///
/// HTML, any XML flavour and plain text are accepted.
pub fn is_markup_content_type(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.contains("html") || content_type.contains("xml") || content_type.contains("text/plain")
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn has_noindex_meta(document: &Html) -> bool {
    let Ok(selector) = Selector::parse("meta[name][content]") else {
        return false;
    };

    document.select(&selector).any(|element| {
        let attrs = element.value();
        attrs
            .attr("name")
            .is_some_and(|name| name.trim().eq_ignore_ascii_case("robots"))
            && attrs.attr("content").is_some_and(is_noindex)
    })
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, page_url: &str) -> Vec<String> {
    let mut links = LinkSet::default();

    let Ok(all) = Selector::parse("*") else {
        return Vec::new();
    };

    for element in document.select(&all) {
        let attrs = element.value();

        for name in URL_ATTRIBUTES {
            if let Some(value) = attrs.attr(name) {
                links.add(value, page_url);
            }
        }

        if let Some(srcset) = attrs.attr("srcset") {
            for candidate in srcset.split(',') {
                if let Some(url) = candidate.split_whitespace().next() {
                    links.add(url, page_url);
                }
            }
        }

        if let Some(style) = attrs.attr("style") {
            for candidate in css_references(style) {
                links.add(candidate, page_url);
            }
        }

        if attrs.name() == "style" {
            let text: String = element.text().collect();
            for candidate in css_references(&text) {
                links.add(candidate, page_url);
            }
        }
    }

    links.into_vec()
}

fn css_references(css: &str) -> impl Iterator<Item = &str> {
    CSS_URL.captures_iter(css).filter_map(|caps| {
        caps.get(1)
            .map(|m| m.as_str().trim().trim_matches(|c| c == '"' || c == '\''))
    })
}

/// Ordered, deduplicated set of resolved links
#[derive(Default)]
struct LinkSet {
    seen: HashSet<String>,
    links: Vec<String>,
}

impl LinkSet {
    fn add(&mut self, reference: &str, base_url: &str) {
        let Some(url) = resolve_link(reference, base_url) else {
            return;
        };
        if self.seen.insert(url.clone()) {
            self.links.push(url);
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.links
    }
}

/// Resolves a reference to an absolute URL without its fragment
///
/// Returns None if the reference should be excluded.
fn resolve_link(reference: &str, base_url: &str) -> Option<String> {
    let reference = reference.trim();

    if reference.is_empty() || reference.starts_with('#') {
        return None;
    }

    let lower = reference.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let resolved = resolve(base_url, reference).ok()?;
    let resolved = match resolved.split_once('#') {
        Some((before, _)) => before.to_string(),
        None => resolved,
    };

    parse_crawlable(&resolved).ok()?;
    Some(resolved)
}
