//! URL handling module for linkrot
//!
//! This module provides page identity (deduplication keys), crawl-scope
//! extraction, and the exclusion pattern matcher.

mod domain;
mod matcher;
mod normalize;

use std::collections::HashSet;
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, origin_of};
pub use matcher::ExclusionSet;
pub use normalize::{fragment_of, identity_url, is_http};

/// The set of hosts a crawl may recurse into
///
/// Built from the seed URLs; links to other hosts are still checked, but the
/// pages behind them are never crawled for further links.
#[derive(Debug, Clone, Default)]
pub struct CrawlScope {
    domains: HashSet<String>,
}

impl CrawlScope {
    /// Builds a scope covering the hosts of the given seeds
    pub fn from_seeds<'a>(seeds: impl IntoIterator<Item = &'a Url>) -> Self {
        Self {
            domains: seeds.into_iter().filter_map(extract_domain).collect(),
        }
    }

    /// Returns true if pages at this URL should be crawled
    pub fn contains(&self, url: &Url) -> bool {
        extract_domain(url).is_some_and(|d| self.domains.contains(&d))
    }
}
