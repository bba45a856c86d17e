//! HTML parser for extracting links and anchors
//!
//! This module turns a fetched document into a [`Page`]:
//! - The page identity (source URL without fragment or query)
//! - Every id that a `#fragment` can navigate to
//! - Every outbound link, resolved against the effective base URL

use crate::url::{identity_url, is_http};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::{ParseError, Url};

/// Elements whose attribute holds a reference worth checking
const LINK_SELECTOR: &str = "a[href], area[href], link[href], frame[src], iframe[src], \
                             img[src], script[src], source[src], track[src]";

/// A reference found in a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// The attribute value as written, trimmed
    href: String,

    /// The absolute URL, or why the reference could not be resolved
    target: Result<Url, ParseError>,
}

impl Link {
    /// Resolves a reference against a base URL
    pub fn resolve(href: &str, base: &Url) -> Self {
        let href = href.trim();
        Self {
            href: href.to_string(),
            target: base.join(href),
        }
    }

    /// The reference as written in the document
    pub fn href(&self) -> &str {
        &self.href
    }

    /// The resolved absolute URL, with fragment and query preserved
    pub fn target(&self) -> Result<&Url, ParseError> {
        self.target.as_ref().map_err(|e| *e)
    }

    /// The text used to report and filter the link: the absolute URL if it resolved
    pub fn as_str(&self) -> &str {
        match &self.target {
            Ok(url) => url.as_str(),
            Err(_) => &self.href,
        }
    }
}

/// A parsed HTML page
#[derive(Debug, Clone)]
pub struct Page {
    /// Identity URL of the page
    url: Url,

    /// Values of every `id` attribute and every `<a name>`
    ids: HashSet<String>,

    /// Outbound links in document order, without duplicates
    links: Vec<Link>,
}

impl Page {
    /// Parses an HTML document fetched from `source`
    ///
    /// # Arguments
    ///
    /// * `source` - The URL the document was fetched from
    /// * `html` - The HTML content
    ///
    /// # Returns
    ///
    /// * `Ok(Page)` - Successfully parsed page
    /// * `Err(ParseError)` - `source` is not an absolute URL
    ///
    /// # Example
    ///
    /// ```
    /// use linkrot::crawler::Page;
    ///
    /// let html = r##"<html><body><h2 id="intro">Intro</h2><a href="/other#intro">Link</a></body></html>"##;
    /// let page = Page::parse("https://example.com/page?x=1", html).unwrap();
    /// assert_eq!(page.url().as_str(), "https://example.com/page");
    /// assert!(page.has_id("intro"));
    /// assert_eq!(page.links()[0].as_str(), "https://example.com/other#intro");
    /// ```
    pub fn parse(source: &str, html: &str) -> Result<Self, ParseError> {
        let source = Url::parse(source)?;
        Ok(Self::from_html(&source, html))
    }

    /// Parses an HTML document whose source URL is already known to be valid
    pub fn from_html(source: &Url, html: &str) -> Self {
        Self::from_redirected_html(source, source, html)
    }

    /// Parses a document that was requested at `requested` but served from `location`
    ///
    /// The page keeps the identity of the requested URL, so that it stays the
    /// memoization key, while relative links resolve against where the
    /// document actually lives.
    pub fn from_redirected_html(requested: &Url, location: &Url, html: &str) -> Self {
        let document = Html::parse_document(html);
        let base = effective_base(&document, location);

        Self {
            url: identity_url(requested),
            ids: extract_ids(&document),
            links: extract_links(&document, &base),
        }
    }

    /// The identity URL of the page
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Every fragment target on the page
    pub fn ids(&self) -> &HashSet<String> {
        &self.ids
    }

    /// Checks if a fragment points at an element on this page
    pub fn has_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Outbound links in document order
    pub fn links(&self) -> &[Link] {
        &self.links
    }
}

/// Returns the URL relative links resolve against
///
/// This is the document URL unless a `<base href>` overrides it. An unusable
/// base is ignored.
fn effective_base(document: &Html, source: &Url) -> Url {
    let Ok(base_selector) = Selector::parse("base[href]") else {
        return source.clone();
    };

    let Some(href) = document
        .select(&base_selector)
        .next()
        .and_then(|element| element.value().attr("href"))
    else {
        return source.clone();
    };

    match source.join(href.trim()) {
        Ok(base) => base,
        Err(e) => {
            tracing::debug!("Ignoring invalid <base href=\"{}\"> on {}: {}", href, source, e);
            source.clone()
        }
    }
}

/// Collects every id a fragment can navigate to
fn extract_ids(document: &Html) -> HashSet<String> {
    let mut ids = HashSet::new();

    if let Ok(id_selector) = Selector::parse("[id]") {
        for element in document.select(&id_selector) {
            if let Some(id) = element.value().id() {
                ids.insert(id.to_string());
            }
        }
    }

    // Legacy anchors
    if let Ok(name_selector) = Selector::parse("a[name]") {
        for element in document.select(&name_selector) {
            if let Some(name) = element.value().attr("name") {
                ids.insert(name.to_string());
            }
        }
    }

    ids.remove("");
    ids
}

/// Extracts all checkable links from the HTML document
fn extract_links(document: &Html, base: &Url) -> Vec<Link> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    let Ok(link_selector) = Selector::parse(LINK_SELECTOR) else {
        return links;
    };

    for element in document.select(&link_selector) {
        let Some(href) = reference_of(&element) else {
            continue;
        };

        let href = href.trim();
        if href.is_empty() || is_ignored_scheme(href) || !seen.insert(href.to_string()) {
            continue;
        }

        let link = Link::resolve(href, base);
        if let Ok(target) = link.target() {
            if !is_http(target) {
                continue;
            }
        }

        links.push(link);
    }

    links
}

/// Returns the attribute holding the reference for this kind of element
fn reference_of<'a>(element: &ElementRef<'a>) -> Option<&'a str> {
    let value = element.value();
    match value.name() {
        "a" | "area" | "link" => value.attr("href"),
        _ => value.attr("src"),
    }
}

/// Checks for schemes that never point at a fetchable resource
fn is_ignored_scheme(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}
