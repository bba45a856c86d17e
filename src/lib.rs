//! linkrot: a broken link and fragment checker
//!
//! This crate crawls a site from one or more seed URLs, checks that every link it
//! finds resolves to a 2xx response within a bounded number of redirects, and that
//! every `#fragment` points at an element that exists on the target page.

pub mod config;
pub mod crawler;
pub mod robots;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for linkrot operations
///
/// These errors halt a crawl. Problems with individual links are [`CheckError`]s
/// and are attached to the page that contains them instead.
#[derive(Debug, Error)]
pub enum LinkrotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid state transition for {url}: {from:?} -> {to:?}")]
    InvalidTransition {
        url: String,
        from: state::PageState,
        to: state::PageState,
    },

    #[error("Crawl task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid exclusion pattern: {0}")]
    InvalidPattern(String),
}

/// Why a single link failed its check
///
/// The `Display` text is what ends up in a page report next to the broken link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// DNS, connect, TLS or timeout failure before any status was received
    #[error("{0}")]
    Transport(String),

    #[error("too many redirections")]
    TooManyRedirections,

    #[error("location header not found")]
    MissingLocationHeader,

    #[error("{0}")]
    UnexpectedStatus(u16),

    /// The target answered 2xx with something other than HTML
    #[error("not text/html ({0})")]
    UnsupportedContentType(String),

    #[error("id #{0} not found")]
    FragmentNotFound(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl CheckError {
    /// Returns true if the error still means the link is reachable
    ///
    /// Non-HTML content is not parsed, but the link itself is fine.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::UnsupportedContentType(_))
    }
}

/// Result type alias for linkrot operations
pub type Result<T> = std::result::Result<T, LinkrotError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{CheckerOptions, FetcherOptions};
pub use crawler::{Checker, CrawlResult, CrawlSummary, FetchOutcome, Page};
pub use state::PageState;
