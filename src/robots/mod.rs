//! Robots.txt and sitemap handling module
//!
//! This module fetches and parses the well-known files of a site: robots.txt
//! for Disallow rules and sitemap locations, and sitemap.xml for extra seeds.

mod parser;
mod sitemap;

pub use parser::ParsedRobots;
pub use sitemap::Sitemap;

use crate::crawler::Fetch;
use crate::CheckError;
use url::Url;

/// Fetches robots.txt for an origin
///
/// # Arguments
///
/// * `fetcher` - The fetcher to use
/// * `origin` - The site origin, e.g. `https://example.com/`
///
/// # Returns
///
/// * `Ok(ParsedRobots)` - Successfully fetched and parsed robots.txt
/// * `Err(CheckError)` - Failed to fetch
pub async fn fetch_robots(fetcher: &dyn Fetch, origin: &Url) -> Result<ParsedRobots, CheckError> {
    let robots_url = origin
        .join("/robots.txt")
        .map_err(|e| CheckError::InvalidUrl(e.to_string()))?;

    let content = fetcher.fetch_text(&robots_url).await?;
    tracing::debug!("Fetched {} ({} bytes)", robots_url, content.len());
    Ok(ParsedRobots::from_content(&content))
}

/// Fetches a sitemap and returns the page URLs it lists
///
/// A sitemap index is followed one level deep. Nested sitemaps that fail to
/// load are skipped with a warning.
///
/// # Arguments
///
/// * `fetcher` - The fetcher to use
/// * `sitemap_url` - Absolute URL of the sitemap
///
/// # Returns
///
/// * `Ok(Vec<Url>)` - Every valid page URL, in document order
/// * `Err(CheckError)` - The sitemap itself could not be fetched
pub async fn fetch_sitemap(fetcher: &dyn Fetch, sitemap_url: &Url) -> Result<Vec<Url>, CheckError> {
    let sitemap = Sitemap::parse(&fetcher.fetch_text(sitemap_url).await?);
    let mut pages = sitemap.pages;

    for nested in &sitemap.sitemaps {
        let Some(nested_url) = resolve(sitemap_url, nested) else {
            continue;
        };
        match fetcher.fetch_text(&nested_url).await {
            Ok(xml) => pages.extend(Sitemap::parse(&xml).pages),
            Err(e) => tracing::warn!("Failed to fetch sitemap {}: {}", nested_url, e),
        }
    }

    let urls: Vec<Url> = pages
        .iter()
        .filter_map(|page| resolve(sitemap_url, page))
        .collect();
    tracing::debug!("Sitemap {} lists {} page(s)", sitemap_url, urls.len());
    Ok(urls)
}

fn resolve(base: &Url, location: &str) -> Option<Url> {
    match base.join(location) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::debug!("Skipping sitemap location {:?}: {}", location, e);
            None
        }
    }
}
