//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the checker, including:
//! - Building HTTP clients with the configured user agent and TLS settings
//! - GET requests to fetch page content
//! - Redirect handling, one hop at a time, under a single admission permit
//! - Error classification into [`CheckError`]s

use crate::config::{CheckerOptions, FetcherOptions};
use crate::crawler::parser::Page;
use crate::crawler::scheduler::AdmissionGate;
use crate::state::Resolution;
use crate::{CheckError, ConfigError, LinkrotError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use reqwest::{redirect::Policy, Certificate, Client, Response};
use std::sync::Arc;
use url::Url;

/// Result of a fetch operation
///
/// Exactly one of these is produced per identity URL and then shared with every
/// link that points there.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// HTTP status of the final response, or 0 if none was received
    pub status: u16,

    /// Why the fetch failed, if it did
    pub error: Option<CheckError>,

    /// Parsed page, present only for HTML content
    pub page: Option<Arc<Page>>,
}

impl FetchOutcome {
    /// A fetch that ended in an error
    pub fn failed(status: u16, error: CheckError) -> Self {
        Self {
            status,
            error: Some(error),
            page: None,
        }
    }

    /// A successful fetch of an HTML page
    pub fn html(status: u16, page: Page) -> Self {
        Self {
            status,
            error: None,
            page: Some(Arc::new(page)),
        }
    }

    /// Returns true if the target is reachable
    ///
    /// A non-HTML response is still reachable; only its page is missing.
    pub fn is_ok(&self) -> bool {
        self.error.as_ref().map_or(true, CheckError::is_benign)
    }

    /// Returns the error that makes this outcome a broken link, if any
    pub fn failure(&self) -> Option<&CheckError> {
        self.error.as_ref().filter(|e| !e.is_benign())
    }
}

impl Resolution for FetchOutcome {
    fn succeeded(&self) -> bool {
        self.is_ok()
    }
}

/// Something that can resolve a URL to a [`FetchOutcome`]
///
/// Implemented by the live HTTP fetcher and by the local directory front end;
/// the checker is written against this trait only.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetches a URL, following redirects, and parses it if it is HTML
    ///
    /// The URL must not carry a fragment.
    async fn fetch(&self, url: &Url) -> FetchOutcome;

    /// Fetches a URL and returns its body as text, whatever its content type
    async fn fetch_text(&self, url: &Url) -> Result<String, CheckError>;
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are never followed by the client itself so that every hop can be
/// counted against the redirect limit.
///
/// # Arguments
///
/// * `options` - The checker options
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(LinkrotError)` - The CA certificate could not be read or the client failed to build
///
/// # Example
///
/// ```no_run
/// use linkrot::config::CheckerOptions;
/// use linkrot::crawler::build_http_client;
///
/// let client = build_http_client(&CheckerOptions::default()).unwrap();
/// ```
pub fn build_http_client(options: &CheckerOptions) -> Result<Client, LinkrotError> {
    let mut builder = Client::builder()
        .user_agent(options.user_agent.clone())
        .redirect(Policy::none())
        .danger_accept_invalid_certs(options.skip_tls_verification)
        .gzip(true)
        .brotli(true);

    if let Some(path) = &options.ca_cert {
        let pem = std::fs::read(path)?;
        builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
    }

    Ok(builder.build()?)
}

/// Converts configured header pairs into a header map
pub fn header_map(options: &FetcherOptions) -> Result<HeaderMap, LinkrotError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &options.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            ConfigError::Validation(format!("invalid header name {:?}: {}", name, e))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            ConfigError::Validation(format!("invalid value for header {}: {}", name, e))
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Decides whether a Content-Type header announces an HTML document
///
/// A missing or empty header is treated as HTML.
///
/// # Returns
///
/// * `Ok(())` - The body should be parsed as HTML
/// * `Err(CheckError::UnsupportedContentType)` - Anything else, including unparsable values
pub fn check_media_type(content_type: Option<&str>) -> Result<(), CheckError> {
    let raw = content_type.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Ok(());
    }

    match raw.parse::<mime::Mime>() {
        Ok(media) if media.essence_str() == mime::TEXT_HTML.essence_str() => Ok(()),
        Ok(media) => Err(CheckError::UnsupportedContentType(
            media.essence_str().to_string(),
        )),
        Err(_) => Err(CheckError::UnsupportedContentType(raw.to_string())),
    }
}

/// Formats an error together with its chain of causes
pub(crate) fn describe_error(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Live HTTP fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    headers: HeaderMap,
    options: FetcherOptions,
    gate: AdmissionGate,
}

impl HttpFetcher {
    /// Creates a fetcher with its own admission gate sized from `options.concurrency`
    pub fn new(client: Client, options: &FetcherOptions) -> Result<Self, LinkrotError> {
        Self::with_gate(client, options, AdmissionGate::new(options.concurrency))
    }

    /// Creates a fetcher that shares an existing admission gate
    pub fn with_gate(
        client: Client,
        options: &FetcherOptions,
        gate: AdmissionGate,
    ) -> Result<Self, LinkrotError> {
        Ok(Self {
            client,
            headers: header_map(options)?,
            options: options.clone(),
            gate,
        })
    }

    /// The gate every fetch of this fetcher is admitted through
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Sends GET requests until a non-redirect response arrives
    ///
    /// The caller must hold an admission permit for the whole call.
    ///
    /// # Returns
    ///
    /// * `Ok(Response)` - A 2xx response
    /// * `Err((status, error))` - Last status seen (0 if none) and the failure
    async fn follow(&self, url: &Url) -> Result<Response, (u16, CheckError)> {
        let mut target = url.clone();
        let mut hops = 0;

        loop {
            tracing::trace!("GET {}", target);
            let response = self
                .client
                .get(target.clone())
                .headers(self.headers.clone())
                .timeout(self.options.timeout)
                .send()
                .await
                .map_err(|e| (0, CheckError::Transport(describe_error(&e))))?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            if !status.is_redirection() {
                return Err((status.as_u16(), CheckError::UnexpectedStatus(status.as_u16())));
            }

            hops += 1;
            if hops > self.options.max_redirections {
                return Err((status.as_u16(), CheckError::TooManyRedirections));
            }

            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .ok_or((status.as_u16(), CheckError::MissingLocationHeader))?;

            let next = target.join(location).map_err(|e| {
                (
                    status.as_u16(),
                    CheckError::InvalidUrl(format!("{}: {}", location, e)),
                )
            })?;

            tracing::debug!("{} redirected ({}) to {}", target, status.as_u16(), next);
            target = next;
        }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &Url) -> FetchOutcome {
        let Some(_permit) = self.gate.admit().await else {
            return FetchOutcome::failed(0, CheckError::Transport("fetcher closed".to_string()));
        };

        let response = match self.follow(url).await {
            Ok(response) => response,
            Err((status, error)) => {
                tracing::debug!("{} failed: {}", url, error);
                return FetchOutcome::failed(status, error);
            }
        };

        let status = response.status().as_u16();
        let location = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        if let Err(error) = check_media_type(content_type.as_deref()) {
            return FetchOutcome::failed(status, error);
        }

        match response.text().await {
            Ok(body) => FetchOutcome::html(
                status,
                Page::from_redirected_html(url, &location, &body),
            ),
            Err(e) => FetchOutcome::failed(status, CheckError::Transport(describe_error(&e))),
        }
    }

    async fn fetch_text(&self, url: &Url) -> Result<String, CheckError> {
        let Some(_permit) = self.gate.admit().await else {
            return Err(CheckError::Transport("fetcher closed".to_string()));
        };

        let response = self.follow(url).await.map_err(|(_, error)| error)?;
        response
            .text()
            .await
            .map_err(|e| CheckError::Transport(describe_error(&e)))
    }
}
