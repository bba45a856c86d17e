//! linkrot main entry point
//!
//! This is the command-line interface for the linkrot link checker.

use anyhow::Context;
use clap::Parser;
use linkrot::config::{load_config, CheckerOptions};
use linkrot::crawler::{build_http_client, Checker, DirectoryFetcher, Fetch, HttpFetcher};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

/// linkrot: a fast broken link checker
///
/// linkrot crawls a website from a root URL, checks that every link answers
/// within the redirect limit, and that every #fragment exists on its target
/// page. Broken links are printed per page; the exit status is 1 if any were
/// found.
#[derive(Parser, Debug)]
#[command(name = "linkrot")]
#[command(version)]
#[command(about = "A fast broken link checker", long_about = None)]
struct Cli {
    /// Root URL to check
    #[arg(value_name = "URL", required_unless_present = "serve")]
    url: Option<String>,

    /// Path to TOML configuration file; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of concurrent network operations
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Regular expression for links that are never checked (repeatable)
    #[arg(short, long = "exclude", value_name = "PATTERN")]
    excluded_patterns: Vec<String>,

    /// Extra request header (repeatable)
    #[arg(long = "header", value_name = "NAME: VALUE", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Do not check that #fragments exist on their target pages
    #[arg(long)]
    ignore_fragments: bool,

    /// Maximum number of redirects followed per link
    #[arg(short = 'r', long)]
    max_redirections: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(short, long, value_name = "SECONDS")]
    timeout: Option<f64>,

    /// Check the links of the root page only, without recursing
    #[arg(long)]
    one_page_only: bool,

    /// Honor robots.txt and use the sitemaps it declares as extra seeds
    #[arg(long)]
    follow_robots_txt: bool,

    /// Use the pages listed in /sitemap.xml as extra seeds
    #[arg(long)]
    follow_sitemap_xml: bool,

    /// Accept invalid TLS certificates
    #[arg(long)]
    skip_tls_verification: bool,

    /// Extra PEM root certificate to trust
    #[arg(long, value_name = "FILE")]
    ca_cert: Option<PathBuf>,

    /// User-Agent header sent with every request
    #[arg(long)]
    user_agent: Option<String>,

    /// Check a local directory tree instead of a live site
    #[arg(long, value_name = "DIR")]
    serve: Option<PathBuf>,

    /// URL the --serve directory is checked under
    #[arg(long, value_name = "URL", default_value = "http://localhost/")]
    serve_base: String,

    /// Print every checked link, not only broken ones
    #[arg(short = 'a', long)]
    show_all: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Layers command-line flags over file or default options
    fn apply(&self, options: &mut CheckerOptions) -> anyhow::Result<()> {
        if let Some(concurrency) = self.concurrency {
            options.fetcher.concurrency = concurrency;
        }
        options
            .fetcher
            .excluded_patterns
            .extend(self.excluded_patterns.iter().cloned());
        options.fetcher.headers.extend(self.headers.iter().cloned());
        if let Some(max_redirections) = self.max_redirections {
            options.fetcher.max_redirections = max_redirections;
        }
        if let Some(seconds) = self.timeout {
            options.fetcher.timeout = Duration::try_from_secs_f64(seconds)
                .with_context(|| format!("invalid timeout: {}", seconds))?;
        }
        options.fetcher.ignore_fragments |= self.ignore_fragments;
        options.fetcher.one_page_only |= self.one_page_only;
        options.follow_robots_txt |= self.follow_robots_txt;
        options.follow_sitemap_xml |= self.follow_sitemap_xml;
        options.skip_tls_verification |= self.skip_tls_verification;
        if let Some(ca_cert) = &self.ca_cert {
            options.ca_cert = Some(ca_cert.clone());
        }
        if let Some(user_agent) = &self.user_agent {
            options.user_agent = user_agent.clone();
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match handle_check(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr; stdout carries the report.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("linkrot=info,warn"),
            1 => EnvFilter::new("linkrot=debug,info"),
            2 => EnvFilter::new("linkrot=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Runs the check and prints every page result that should be shown
///
/// # Returns
///
/// * `Ok(true)` - No broken links were found
/// * `Ok(false)` - At least one page has a broken link
/// * `Err(_)` - The check could not run
async fn handle_check(cli: Cli) -> anyhow::Result<bool> {
    let mut options = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?
        }
        None => CheckerOptions::default(),
    };
    cli.apply(&mut options)?;

    let client = build_http_client(&options)?;
    let http = HttpFetcher::new(client, &options.fetcher)?;
    let gate = http.gate().clone();

    let (fetcher, seeds): (Arc<dyn Fetch>, Vec<String>) = match &cli.serve {
        Some(dir) => {
            let base = Url::parse(&cli.serve_base)
                .with_context(|| format!("invalid --serve-base URL: {}", cli.serve_base))?;
            let local = DirectoryFetcher::new(dir, base, gate.clone())
                .with_context(|| format!("cannot serve {}", dir.display()))?
                .with_fallback(Arc::new(http));

            let seeds = match &cli.url {
                Some(url) => vec![url.clone()],
                None => local.seed_urls()?.iter().map(Url::to_string).collect(),
            };
            tracing::info!("Serving {} at {}", dir.display(), local.base());
            (Arc::new(local), seeds)
        }
        None => {
            let url = cli.url.clone().context("a URL to check is required")?;
            (Arc::new(http), vec![url])
        }
    };

    let (root, rest) = seeds.split_first().context("nothing to check")?;
    let mut checker = Checker::new(root, options, fetcher)?;
    for seed in rest {
        checker.add_seed(seed)?;
    }

    tracing::info!(
        "Checking {} with up to {} concurrent request(s)",
        root,
        gate.limit()
    );

    // Closing the gate fails queued fetches at once instead of letting them start
    let cancel = checker.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping crawl");
            cancel.cancel();
            gate.close();
        }
    });

    let (mut results, handle) = checker.spawn();
    let mut all_ok = true;
    while let Some(result) = results.recv().await {
        if !result.is_ok() || cli.show_all {
            println!("{}", result.render(cli.show_all));
        }
        all_ok &= result.is_ok();
    }

    let summary = handle.await??;
    tracing::debug!("{:?}", summary);
    Ok(all_ok)
}

/// Parses a `Name: value` header flag
fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected NAME: VALUE, got {:?}", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing header name in {:?}", raw));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
