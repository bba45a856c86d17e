//! Checker - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates:
//! - Seed discovery through robots.txt and sitemap.xml
//! - A bounded pool of page workers fed from a pending queue
//! - Per-link evaluation against the shared memoization table
//! - Recursion into in-scope HTML pages
//! - Emission of exactly one CrawlResult per origin page

use crate::config::{validate, CheckerOptions};
use crate::crawler::fetcher::{Fetch, FetchOutcome};
use crate::crawler::parser::Link;
use crate::crawler::result::{CrawlResult, CrawlSummary};
use crate::robots::{fetch_robots, fetch_sitemap, ParsedRobots};
use crate::state::{MemoTable, PageState};
use crate::url::{
    extract_domain, fragment_of, identity_url, is_http, origin_of, CrawlScope, ExclusionSet,
};
use crate::{CheckError, LinkrotError};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Upper bound on results buffered between the crawl and its consumer
const MAX_BUFFERED_RESULTS: usize = 1024;

/// Link checker for one crawl run
pub struct Checker {
    seeds: Vec<Url>,
    options: CheckerOptions,
    fetcher: Arc<dyn Fetch>,
    exclusions: ExclusionSet,
    cancel: CancellationToken,
}

/// State shared by every worker of a running crawl
struct CrawlContext {
    fetcher: Arc<dyn Fetch>,
    memo: MemoTable<FetchOutcome>,
    exclusions: ExclusionSet,
    /// Domain -> robots.txt rules; only filled when robots.txt is followed
    robots: HashMap<String, ParsedRobots>,
    scope: CrawlScope,
    options: CheckerOptions,
    cancel: CancellationToken,
}

/// What a page worker hands back to the crawl loop
struct PageVisit {
    result: CrawlResult,
    /// Freshly claimed in-scope HTML pages to crawl next
    discovered: Vec<Url>,
}

enum Verdict {
    Skipped,
    Passed(u16),
    Broken(CheckError),
}

struct LinkCheck {
    link: String,
    verdict: Verdict,
    discovered: Option<Url>,
}

impl LinkCheck {
    fn new(link: String, verdict: Verdict) -> Self {
        Self {
            link,
            verdict,
            discovered: None,
        }
    }
}

impl Checker {
    /// Creates a checker rooted at one URL
    ///
    /// # Arguments
    ///
    /// * `root` - Absolute http(s) URL of the first page to check
    /// * `options` - Checker options
    /// * `fetcher` - The fetch implementation every network operation goes through
    ///
    /// # Returns
    ///
    /// * `Ok(Checker)` - Ready to spawn
    /// * `Err(LinkrotError::InvalidUrl)` - `root` is not an absolute http(s) URL
    /// * `Err(LinkrotError::Config)` - The options are invalid
    pub fn new(
        root: &str,
        options: CheckerOptions,
        fetcher: Arc<dyn Fetch>,
    ) -> Result<Self, LinkrotError> {
        validate(&options)?;
        let exclusions = ExclusionSet::new(&options.fetcher.excluded_patterns)?;

        Ok(Self {
            seeds: vec![parse_seed(root)?],
            options,
            fetcher,
            exclusions,
            cancel: CancellationToken::new(),
        })
    }

    /// Adds another seed; it widens the crawl scope to its host
    pub fn add_seed(&mut self, seed: &str) -> Result<(), LinkrotError> {
        self.seeds.push(parse_seed(seed)?);
        Ok(())
    }

    /// Seeds given at construction, before discovery
    pub fn seeds(&self) -> &[Url] {
        &self.seeds
    }

    /// Token that stops the crawl when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Starts crawling on a background task
    ///
    /// The receiver must be drained while the crawl runs; the channel is
    /// bounded and the crawl waits for room. It closes when the crawl ends.
    pub fn spawn(
        self,
    ) -> (
        mpsc::Receiver<CrawlResult>,
        JoinHandle<Result<CrawlSummary, LinkrotError>>,
    ) {
        let capacity = self.options.fetcher.concurrency.clamp(1, MAX_BUFFERED_RESULTS);
        let (sender, receiver) = mpsc::channel(capacity);
        let handle = tokio::spawn(self.run(sender));
        (receiver, handle)
    }

    /// Runs the crawl to completion, sending each page's result to `results`
    pub async fn run(
        self,
        results: mpsc::Sender<CrawlResult>,
    ) -> Result<CrawlSummary, LinkrotError> {
        let started = Instant::now();
        let (seeds, robots) = self.discover().await;
        let concurrency = self.options.fetcher.concurrency;

        let ctx = Arc::new(CrawlContext {
            scope: CrawlScope::from_seeds(&self.seeds),
            fetcher: self.fetcher,
            memo: MemoTable::new(),
            exclusions: self.exclusions,
            robots,
            options: self.options,
            cancel: self.cancel,
        });

        let mut pending = VecDeque::new();
        for seed in &seeds {
            let identity = identity_url(seed);
            let (_, fresh) = ctx.memo.claim(&identity)?;
            if fresh {
                pending.push_back(identity);
            }
        }
        tracing::info!(
            "Checking {} seed page(s) with concurrency {}",
            pending.len(),
            concurrency
        );

        let mut workers = JoinSet::new();
        let mut summary = CrawlSummary::default();

        loop {
            while workers.len() < concurrency && !ctx.cancel.is_cancelled() {
                let Some(url) = pending.pop_front() else {
                    break;
                };
                workers.spawn(visit_page(Arc::clone(&ctx), url));
            }

            let joined = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => None,
                joined = workers.join_next() => joined,
            };
            let Some(joined) = joined else {
                break;
            };

            let visit = joined??;
            pending.extend(visit.discovered);

            let url = visit.result.url().clone();
            let result = visit.result;
            if !result.is_ok() {
                tracing::debug!("{}: {} broken link(s)", url, result.failures().len());
            }

            // Only results that reach the receiver count
            let before = summary.clone();
            summary.record(&result);
            let sent = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => None,
                sent = results.send(result) => Some(sent),
            };
            match sent {
                Some(Ok(())) => {}
                Some(Err(_)) => {
                    tracing::warn!("Result receiver dropped, stopping crawl");
                    summary = before;
                    ctx.cancel.cancel();
                    break;
                }
                None => {
                    summary = before;
                    break;
                }
            }

            if let Some(entry) = ctx.memo.get(&url) {
                entry.transition(PageState::Reported)?;
            }
        }

        summary.cancelled = ctx.cancel.is_cancelled();
        summary.elapsed = started.elapsed();
        if summary.cancelled {
            tracing::info!("Crawl cancelled after {} page(s)", summary.pages);
        }
        tracing::info!(
            "Crawl complete: {} ({} distinct URL(s) fetched)",
            summary,
            ctx.memo.known_urls()
        );
        Ok(summary)
    }

    /// Adds sitemap pages to the seeds and loads robots.txt rules
    ///
    /// Failures here only cost seeds or rules; they never stop the crawl.
    async fn discover(&self) -> (Vec<Url>, HashMap<String, ParsedRobots>) {
        let mut seeds = self.seeds.clone();
        let mut robots = HashMap::new();

        if !self.options.follow_robots_txt && !self.options.follow_sitemap_xml {
            return (seeds, robots);
        }

        let mut origins: Vec<Url> = Vec::new();
        for origin in self.seeds.iter().filter_map(origin_of) {
            if !origins.contains(&origin) {
                origins.push(origin);
            }
        }

        for origin in origins {
            let mut sitemaps = Vec::new();

            if self.options.follow_sitemap_xml {
                if let Ok(sitemap) = origin.join("/sitemap.xml") {
                    sitemaps.push(sitemap);
                }
            }

            if self.options.follow_robots_txt {
                match fetch_robots(self.fetcher.as_ref(), &origin).await {
                    Ok(parsed) => {
                        for declared in parsed.sitemaps() {
                            if let Ok(sitemap) = origin.join(declared) {
                                if !sitemaps.contains(&sitemap) {
                                    sitemaps.push(sitemap);
                                }
                            }
                        }
                        if let Some(domain) = extract_domain(&origin) {
                            robots.insert(domain, parsed);
                        }
                    }
                    Err(e) => tracing::warn!("Failed to fetch robots.txt for {}: {}", origin, e),
                }
            }

            for sitemap in sitemaps {
                match fetch_sitemap(self.fetcher.as_ref(), &sitemap).await {
                    Ok(pages) => {
                        tracing::info!("Sitemap {} added {} seed(s)", sitemap, pages.len());
                        seeds.extend(pages.into_iter().filter(is_http));
                    }
                    Err(e) => tracing::warn!("Failed to fetch sitemap {}: {}", sitemap, e),
                }
            }
        }

        (seeds, robots)
    }
}

impl CrawlContext {
    /// Checks robots.txt rules for a link target
    fn robots_allow(&self, url: &Url) -> bool {
        if !self.options.follow_robots_txt {
            return true;
        }
        extract_domain(url)
            .and_then(|domain| self.robots.get(&domain))
            .map_or(true, |robots| robots.is_allowed(url.as_str(), &self.options.user_agent))
    }

    /// Returns true if the page at this identity should be crawled for links
    fn should_recurse(&self, identity: &Url) -> bool {
        !self.options.fetcher.one_page_only && self.scope.contains(identity)
    }
}

fn parse_seed(seed: &str) -> Result<Url, LinkrotError> {
    let url = Url::parse(seed.trim()).map_err(|e| LinkrotError::InvalidUrl {
        url: seed.to_string(),
        reason: e.to_string(),
    })?;

    if !is_http(&url) || url.host_str().is_none() {
        return Err(LinkrotError::InvalidUrl {
            url: seed.to_string(),
            reason: "only absolute http and https URLs can be checked".to_string(),
        });
    }
    Ok(url)
}

/// Fetches one origin page and checks every link on it
async fn visit_page(ctx: Arc<CrawlContext>, url: Url) -> Result<PageVisit, LinkrotError> {
    let (entry, _) = ctx.memo.claim(&url)?;
    let outcome = entry.resolve(|| ctx.fetcher.fetch(&url)).await?.clone();
    let mut result = CrawlResult::new(url.clone());

    let Some(page) = outcome.page.clone() else {
        if let Some(error) = outcome.failure() {
            tracing::debug!("Seed {} failed: {}", url, error);
            result.add_failure(url.as_str(), error);
        }
        return Ok(PageVisit {
            result,
            discovered: Vec::new(),
        });
    };

    entry.transition(PageState::Expanded)?;
    tracing::debug!("Checking {} link(s) on {}", page.links().len(), url);

    let pending_checks: Vec<_> = page
        .links()
        .iter()
        .map(|link| check_link(&ctx, &outcome, link))
        .collect();
    let checks: Vec<Result<LinkCheck, LinkrotError>> = stream::iter(pending_checks)
        .buffered(ctx.options.fetcher.concurrency)
        .collect()
        .await;

    let mut discovered = Vec::new();
    for check in checks {
        let check = check?;
        discovered.extend(check.discovered);
        match check.verdict {
            Verdict::Skipped => {}
            Verdict::Passed(status) => result.add_success(check.link, status),
            Verdict::Broken(error) => result.add_failure(check.link, &error),
        }
    }

    Ok(PageVisit { result, discovered })
}

/// Evaluates one link of an origin page
async fn check_link(
    ctx: &CrawlContext,
    origin: &FetchOutcome,
    link: &Link,
) -> Result<LinkCheck, LinkrotError> {
    let text = link.as_str().to_string();

    if ctx.cancel.is_cancelled() || ctx.exclusions.is_excluded(&text) {
        return Ok(LinkCheck::new(text, Verdict::Skipped));
    }

    let target = match link.target() {
        Ok(target) => target,
        Err(e) => {
            return Ok(LinkCheck::new(
                text,
                Verdict::Broken(CheckError::InvalidUrl(e.to_string())),
            ))
        }
    };

    if !ctx.robots_allow(target) {
        tracing::debug!("{} disallowed by robots.txt", target);
        return Ok(LinkCheck::new(text, Verdict::Skipped));
    }

    let identity = identity_url(target);
    let mut discovered = None;

    // Same-page fragments resolve against the origin page itself
    let outcome = if origin.page.as_ref().map(|page| page.url()) == Some(&identity) {
        origin.clone()
    } else {
        let (entry, fresh) = ctx.memo.claim(&identity)?;
        let outcome = entry.resolve(|| ctx.fetcher.fetch(&identity)).await?.clone();
        if fresh && outcome.page.is_some() && ctx.should_recurse(&identity) {
            discovered = Some(identity);
        }
        outcome
    };

    let verdict = match (outcome.failure(), fragment_of(target), &outcome.page) {
        (Some(error), _, _) => Verdict::Broken(error.clone()),
        (None, Some(fragment), Some(page))
            if !ctx.options.fetcher.ignore_fragments && !page.has_id(&fragment) =>
        {
            Verdict::Broken(CheckError::FragmentNotFound(fragment.into_owned()))
        }
        _ => Verdict::Passed(outcome.status),
    };

    Ok(LinkCheck {
        link: text,
        verdict,
        discovered,
    })
}
