//! Crawler module for fetching pages and checking their links
//!
//! This module contains the core checking logic, including:
//! - HTTP fetching with manual redirect handling
//! - A local directory front end for checking a site before it is deployed
//! - HTML parsing and link extraction
//! - Global admission control
//! - Overall crawl coordination

mod coordinator;
mod directory;
mod fetcher;
mod parser;
mod result;
mod scheduler;

pub use coordinator::Checker;
pub use directory::DirectoryFetcher;
pub use fetcher::{build_http_client, check_media_type, header_map, Fetch, FetchOutcome, HttpFetcher};
pub use parser::{Link, Page};
pub use result::{CrawlResult, CrawlSummary};
pub use scheduler::AdmissionGate;
