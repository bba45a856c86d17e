//! Per-page crawl results and the run summary

use crate::CheckError;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Everything found wrong (and, for verbose output, right) on one origin page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlResult {
    url: Url,
    failures: Vec<(String, String)>,
    successes: Vec<(String, String)>,
}

impl CrawlResult {
    /// Creates an empty result for an origin page
    pub fn new(url: Url) -> Self {
        Self {
            url,
            failures: Vec::new(),
            successes: Vec::new(),
        }
    }

    /// Records a broken link
    pub fn add_failure(&mut self, link: impl Into<String>, error: &CheckError) {
        self.failures.push((link.into(), error.to_string()));
    }

    /// Records a link that checked out, with the status it answered
    pub fn add_success(&mut self, link: impl Into<String>, status: u16) {
        self.successes.push((link.into(), status.to_string()));
    }

    /// Identity URL of the origin page
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// `(link, error text)` pairs in document order
    pub fn failures(&self) -> &[(String, String)] {
        &self.failures
    }

    /// `(link, status)` pairs in document order
    pub fn successes(&self) -> &[(String, String)] {
        &self.successes
    }

    /// True if no link on the page is broken
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    /// Renders the page URL followed by one tab-indented line per link
    ///
    /// The terse form lists only failures; the verbose form lists every checked
    /// link, successes first.
    ///
    /// ```
    /// use linkrot::crawler::CrawlResult;
    /// use linkrot::CheckError;
    ///
    /// let mut result = CrawlResult::new("https://example.com/".parse().unwrap());
    /// result.add_success("https://example.com/ok", 200);
    /// result.add_failure("https://example.com/gone", &CheckError::UnexpectedStatus(404));
    ///
    /// assert_eq!(
    ///     result.render(false),
    ///     "https://example.com/\n\t404\thttps://example.com/gone"
    /// );
    /// ```
    pub fn render(&self, verbose: bool) -> String {
        let mut lines = vec![self.url.to_string()];

        let successes: &[(String, String)] = if verbose { &self.successes } else { &[] };
        for (link, text) in successes.iter().chain(&self.failures) {
            lines.push(format!("\t{}\t{}", text, link));
        }

        lines.join("\n")
    }
}

impl fmt::Display for CrawlResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

/// Totals for one finished crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Number of CrawlResults emitted
    pub pages: usize,

    /// Number of emitted results that were not OK
    pub failed_pages: usize,

    /// Number of links evaluated across all pages
    pub links_checked: usize,

    /// Number of broken links across all pages
    pub broken_links: usize,

    /// Whether the crawl was stopped before the queue drained
    pub cancelled: bool,

    pub elapsed: Duration,
}

impl CrawlSummary {
    /// Adds one emitted result to the totals
    pub fn record(&mut self, result: &CrawlResult) {
        self.pages += 1;
        self.links_checked += result.failures.len() + result.successes.len();
        self.broken_links += result.failures.len();
        if !result.is_ok() {
            self.failed_pages += 1;
        }
    }

    /// True if every emitted page was OK
    pub fn is_ok(&self) -> bool {
        self.failed_pages == 0
    }
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} page(s), {} link(s) checked, {} broken on {} page(s) in {:.2?}",
            self.pages, self.links_checked, self.broken_links, self.failed_pages, self.elapsed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> CrawlResult {
        let mut result = CrawlResult::new(Url::parse("https://example.com/page").unwrap());
        result.add_success("https://example.com/a", 200);
        result.add_failure(
            "https://example.com/b#x",
            &CheckError::FragmentNotFound("x".to_string()),
        );
        result
    }

    #[test]
    fn test_empty_result_is_ok() {
        let result = CrawlResult::new(Url::parse("https://example.com/").unwrap());
        assert!(result.is_ok());
        assert_eq!(result.render(true), "https://example.com/");
    }

    #[test]
    fn test_terse_render_lists_failures_only() {
        assert_eq!(
            result().render(false),
            "https://example.com/page\n\tid #x not found\thttps://example.com/b#x"
        );
    }

    #[test]
    fn test_verbose_render_lists_everything() {
        assert_eq!(
            result().render(true),
            "https://example.com/page\n\
             \t200\thttps://example.com/a\n\
             \tid #x not found\thttps://example.com/b#x"
        );
    }

    #[test]
    fn test_summary_totals() {
        let mut summary = CrawlSummary::default();
        summary.record(&result());
        summary.record(&CrawlResult::new(Url::parse("https://example.com/").unwrap()));

        assert_eq!(summary.pages, 2);
        assert_eq!(summary.failed_pages, 1);
        assert_eq!(summary.links_checked, 2);
        assert_eq!(summary.broken_links, 1);
        assert!(!summary.is_ok());
    }
}
