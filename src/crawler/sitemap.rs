//! Sitemap parsing
//!
//! Two formats are understood, chosen by the sitemap URL's suffix:
//! XML sitemaps (`.xml`), read with the `sitemap` crate, and plain text
//! sitemaps (`.txt`) with one URL per line.

use crate::CrawlError;
use regex::Regex;
use sitemap::reader::{SiteMapEntity, SiteMapReader};
use std::borrow::Cow;
use std::io::Cursor;
use std::sync::LazyLock;

static CDATA_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("CDATA regex is valid"));

/// Fallback sitemap locations probed when robots.txt declares none
pub const FALLBACK_SITEMAPS: &[&str] = &["sitemap.xml", "sitemap.txt"];

/// Sitemap document format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapFormat {
    Xml,
    Text,
}

impl SitemapFormat {
    /// Determines the format from the sitemap URL's suffix
    ///
    /// Returns `None` for any suffix other than `.xml` or `.txt`.
    pub fn from_url(url: &str) -> Option<Self> {
        let url = url.trim().to_ascii_lowercase();
        if url.ends_with(".xml") {
            Some(Self::Xml)
        } else if url.ends_with(".txt") {
            Some(Self::Text)
        } else {
            None
        }
    }
}

/// Extracts the URLs listed in a sitemap body
///
/// # Arguments
///
/// * `url` - The sitemap URL, used for error reporting
/// * `format` - The sitemap format
/// * `body` - The fetched sitemap text
///
/// # Returns
///
/// * `Ok(Vec<String>)` - The listed URLs, in document order
/// * `Err(CrawlError::Parse)` - The XML document is malformed
pub fn parse_sitemap(url: &str, format: SitemapFormat, body: &str) -> Result<Vec<String>, CrawlError> {
    match format {
        SitemapFormat::Xml => parse_xml_sitemap(body).map_err(|message| CrawlError::Parse {
            url: url.to_string(),
            message,
        }),
        SitemapFormat::Text => Ok(parse_text_sitemap(body)),
    }
}

/// Reads the `loc` of every top-level entry of an XML sitemap
///
/// Both `<url>` entries and sitemap-index `<sitemap>` entries are read.
/// An entry without a usable `loc` is skipped. The `sitemap` reader drops
/// CDATA text, so CDATA sections are rewritten as escaped text first.
pub fn parse_xml_sitemap(body: &str) -> Result<Vec<String>, String> {
    let body = unwrap_cdata(body);
    let mut urls = Vec::new();

    for entity in SiteMapReader::new(Cursor::new(body.as_bytes())) {
        match entity {
            SiteMapEntity::Url(entry) => {
                if let Some(url) = entry.loc.get_url() {
                    urls.push(url.to_string());
                }
            }
            SiteMapEntity::SiteMap(entry) => {
                if let Some(url) = entry.loc.get_url() {
                    urls.push(url.to_string());
                }
            }
            SiteMapEntity::Err(e) => {
                // The reader may keep yielding the same error; stop at the first
                return Err(format!("Malformed sitemap XML: {:?}", e));
            }
        }
    }

    Ok(urls)
}

fn unwrap_cdata(body: &str) -> Cow<'_, str> {
    CDATA_SECTION.replace_all(body, |caps: &regex::Captures<'_>| {
        caps[1]
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
    })
}

/// Reads a plain text sitemap: one URL per line, blank lines ignored
pub fn parse_text_sitemap(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
