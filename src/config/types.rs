use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default number of simultaneous network operations
pub const DEFAULT_CONCURRENCY: usize = 512;

/// Default cap on redirect hops for one fetch
pub const DEFAULT_MAX_REDIRECTIONS: usize = 64;

/// Default deadline for each network attempt
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Options governing how individual URLs are fetched and which links are followed
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetcherOptions {
    /// Maximum number of simultaneous network operations across the whole run
    pub concurrency: usize,

    /// Regular expressions; links matching any of them are never checked
    pub excluded_patterns: Vec<String>,

    /// Extra headers sent with every request
    pub headers: BTreeMap<String, String>,

    /// Skip `#fragment` verification entirely
    pub ignore_fragments: bool,

    /// Hard cap on 3xx hops for one fetch
    pub max_redirections: usize,

    /// Deadline applied to each network attempt, in seconds in the config file
    #[serde(deserialize_with = "deserialize_seconds")]
    pub timeout: Duration,

    /// Check the seed pages only, without recursing into linked pages
    pub one_page_only: bool,
}

impl Default for FetcherOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            excluded_patterns: Vec::new(),
            headers: BTreeMap::new(),
            ignore_fragments: false,
            max_redirections: DEFAULT_MAX_REDIRECTIONS,
            timeout: DEFAULT_TIMEOUT,
            one_page_only: false,
        }
    }
}

/// Main configuration structure for a crawl
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CheckerOptions {
    #[serde(flatten)]
    pub fetcher: FetcherOptions,

    /// Add sitemaps declared in each seed host's robots.txt as seeds, and honor its rules
    pub follow_robots_txt: bool,

    /// Add every location listed in each seed host's sitemap.xml as a seed
    pub follow_sitemap_xml: bool,

    /// Accept any TLS certificate
    pub skip_tls_verification: bool,

    /// Extra PEM root certificate trusted in addition to the system roots
    pub ca_cert: Option<PathBuf>,

    /// User agent sent with requests and matched against robots.txt groups
    pub user_agent: String,
}

impl Default for CheckerOptions {
    fn default() -> Self {
        Self {
            fetcher: FetcherOptions::default(),
            follow_robots_txt: false,
            follow_sitemap_xml: false,
            skip_tls_verification: false,
            ca_cert: None,
            user_agent: default_user_agent(),
        }
    }
}

/// Returns the user agent used when none is configured
pub fn default_user_agent() -> String {
    format!("linkrot/{}", env!("CARGO_PKG_VERSION"))
}

fn deserialize_seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
}
