//! Local directory front end
//!
//! Serves a directory tree under a base URL so that a built site can be checked
//! before it is deployed. Directories answer with their `index.html`, or with a
//! generated listing when there is none. URLs outside the base are handed to a
//! fallback fetcher, usually the live [`HttpFetcher`](super::HttpFetcher).

use crate::crawler::fetcher::{check_media_type, Fetch, FetchOutcome};
use crate::crawler::parser::Page;
use crate::crawler::scheduler::AdmissionGate;
use crate::{CheckError, LinkrotError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Fetches URLs under a base URL from the local filesystem
pub struct DirectoryFetcher {
    /// Canonical root of the served tree
    root: PathBuf,

    /// URL the root is served at; its path ends with `/`
    base: Url,

    gate: AdmissionGate,

    fallback: Option<Arc<dyn Fetch>>,
}

/// A file or generated listing read from disk
struct LocalDocument {
    content_type: &'static str,
    body: Vec<u8>,

    /// URL relative links resolve against; slash-terminated for directories
    location: Url,
}

impl DirectoryFetcher {
    /// Creates a front end for `root` served at `base`
    ///
    /// # Arguments
    ///
    /// * `root` - Directory to serve
    /// * `base` - Absolute URL the directory is served at
    /// * `gate` - Admission gate shared with the rest of the crawl
    ///
    /// # Returns
    ///
    /// * `Ok(DirectoryFetcher)` - Ready to serve
    /// * `Err(LinkrotError)` - `root` is not a readable directory or `base` cannot hold paths
    pub fn new(
        root: impl AsRef<Path>,
        mut base: Url,
        gate: AdmissionGate,
    ) -> Result<Self, LinkrotError> {
        let root = std::fs::canonicalize(root.as_ref())?;
        if !root.is_dir() {
            return Err(LinkrotError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            )));
        }

        if base.cannot_be_a_base() {
            return Err(LinkrotError::InvalidUrl {
                url: base.to_string(),
                reason: "cannot serve a directory under this URL".to_string(),
            });
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.set_query(None);
        base.set_fragment(None);

        Ok(Self {
            root,
            base,
            gate,
            fallback: None,
        })
    }

    /// Routes URLs outside the base to another fetcher
    pub fn with_fallback(mut self, fallback: Arc<dyn Fetch>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// The URL the root directory is served at
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Returns the index page of every top-level directory, or the base itself
    ///
    /// These make good seeds for a crawl of the whole tree.
    pub fn seed_urls(&self) -> Result<Vec<Url>, LinkrotError> {
        let mut seeds = Vec::new();

        if self.root.join("index.html").is_file() {
            seeds.push(self.base.clone());
        }

        let mut entries = std::fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().join("index.html").is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect::<Vec<_>>();
        entries.sort();

        for name in entries {
            seeds.push(child_url(&self.base, &name, true));
        }

        if seeds.is_empty() {
            seeds.push(self.base.clone());
        }
        Ok(seeds)
    }

    /// Maps a URL under the base to a path under the root
    fn local_path(&self, url: &Url) -> Option<PathBuf> {
        if url.origin() != self.base.origin() {
            return None;
        }
        let relative = url.path().strip_prefix(self.base.path())?;
        let relative = relative.trim_start_matches('/');

        // Percent-decoding through a file URL keeps the platform rules in one place
        let root_url = Url::from_directory_path(&self.root).ok()?;
        let path = root_url.join(relative).ok()?.to_file_path().ok()?;
        path.starts_with(&self.root).then_some(path)
    }

    /// Reads a file, an index page, or a generated listing
    async fn load(&self, url: &Url, path: &Path) -> Result<LocalDocument, (u16, CheckError)> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| (404, CheckError::UnexpectedStatus(404)))?;

        if metadata.is_dir() {
            let directory = directory_url(url);
            let index = path.join("index.html");
            if tokio::fs::metadata(&index).await.map(|m| m.is_file()).unwrap_or(false) {
                return read_file(&index, directory).await;
            }
            let listing = directory_listing(&directory, path)
                .await
                .map_err(|e| (0, CheckError::Transport(e.to_string())))?;
            return Ok(LocalDocument {
                content_type: "text/html",
                body: listing.into_bytes(),
                location: directory,
            });
        }

        read_file(path, url.clone()).await
    }
}

#[async_trait]
impl Fetch for DirectoryFetcher {
    async fn fetch(&self, url: &Url) -> FetchOutcome {
        let Some(path) = self.local_path(url) else {
            return match &self.fallback {
                Some(fallback) => fallback.fetch(url).await,
                None => FetchOutcome::failed(404, CheckError::UnexpectedStatus(404)),
            };
        };

        let Some(_permit) = self.gate.admit().await else {
            return FetchOutcome::failed(0, CheckError::Transport("fetcher closed".to_string()));
        };

        let document = match self.load(url, &path).await {
            Ok(document) => document,
            Err((status, error)) => return FetchOutcome::failed(status, error),
        };

        if let Err(error) = check_media_type(Some(document.content_type)) {
            return FetchOutcome::failed(200, error);
        }

        let html = String::from_utf8_lossy(&document.body);
        FetchOutcome::html(
            200,
            Page::from_redirected_html(url, &document.location, &html),
        )
    }

    async fn fetch_text(&self, url: &Url) -> Result<String, CheckError> {
        let Some(path) = self.local_path(url) else {
            return match &self.fallback {
                Some(fallback) => fallback.fetch_text(url).await,
                None => Err(CheckError::UnexpectedStatus(404)),
            };
        };

        let Some(_permit) = self.gate.admit().await else {
            return Err(CheckError::Transport("fetcher closed".to_string()));
        };

        let document = self.load(url, &path).await.map_err(|(_, error)| error)?;
        Ok(String::from_utf8_lossy(&document.body).into_owned())
    }
}

async fn read_file(path: &Path, location: Url) -> Result<LocalDocument, (u16, CheckError)> {
    let body = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => (404, CheckError::UnexpectedStatus(404)),
        std::io::ErrorKind::PermissionDenied => (403, CheckError::UnexpectedStatus(403)),
        _ => (0, CheckError::Transport(e.to_string())),
    })?;

    Ok(LocalDocument {
        content_type: content_type_for(path),
        body,
        location,
    })
}

/// Guesses a content type from a file extension
fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

/// Builds the URL of a directory entry, percent-encoding its name
fn child_url(parent: &Url, name: &str, is_dir: bool) -> Url {
    let mut url = parent.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(name);
        if is_dir {
            segments.push("");
        }
    }
    url
}

/// Returns the URL with a trailing slash on its path
fn directory_url(url: &Url) -> Url {
    let mut directory = url.clone();
    if !directory.path().ends_with('/') {
        let with_slash = format!("{}/", directory.path());
        directory.set_path(&with_slash);
    }
    directory
}

/// Generates an HTML page linking to every entry of a directory
async fn directory_listing(directory: &Url, path: &Path) -> std::io::Result<String> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(path).await?;
    while let Some(entry) = entries.next_entry().await? {
        let is_dir = entry.file_type().await?.is_dir();
        if let Ok(name) = entry.file_name().into_string() {
            names.push((name, is_dir));
        }
    }
    names.sort();

    let mut html = String::from("<!DOCTYPE html>\n<html><body><ul>\n");
    for (name, is_dir) in names {
        let href = child_url(directory, &name, is_dir);
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            escape_html(href.as_str()),
            escape_html(&name)
        ));
    }
    html.push_str("</ul></body></html>\n");
    Ok(html)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("index.html"),
            r#"<html><body><a href="docs/">Docs</a><a href="guide.pdf">Guide</a></body></html>"#,
        )
        .unwrap();
        fs::write(dir.path().join("guide.pdf"), b"%PDF-1.4").unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(
            dir.path().join("docs").join("index.html"),
            r#"<html><body><h1 id="top">Docs</h1></body></html>"#,
        )
        .unwrap();
        fs::create_dir(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("assets").join("my file.css"), "body {}").unwrap();
        dir
    }

    fn fetcher(dir: &TempDir) -> DirectoryFetcher {
        DirectoryFetcher::new(
            dir.path(),
            Url::parse("http://localhost:8080/site").unwrap(),
            AdmissionGate::new(4),
        )
        .unwrap()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_base_gets_trailing_slash() {
        let dir = site();
        assert_eq!(fetcher(&dir).base().as_str(), "http://localhost:8080/site/");
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let result = DirectoryFetcher::new(
            "/nonexistent/linkrot-root",
            url("http://localhost/"),
            AdmissionGate::new(1),
        );
        assert!(matches!(result, Err(LinkrotError::Io(_))));
    }

    #[tokio::test]
    async fn test_serves_index_page() {
        let dir = site();
        let outcome = fetcher(&dir).fetch(&url("http://localhost:8080/site/")).await;
        assert!(outcome.is_ok());
        let page = outcome.page.unwrap();
        assert_eq!(page.links().len(), 2);
        assert_eq!(page.links()[0].as_str(), "http://localhost:8080/site/docs/");
    }

    #[tokio::test]
    async fn test_directory_without_slash_resolves_links_inside_it() {
        let dir = site();
        fs::write(
            dir.path().join("docs").join("index.html"),
            r#"<a href="setup.html">Setup</a>"#,
        )
        .unwrap();
        fs::write(dir.path().join("docs").join("setup.html"), "<p>Setup</p>").unwrap();
        let fetcher = fetcher(&dir);

        let outcome = fetcher.fetch(&url("http://localhost:8080/site/docs")).await;
        let page = outcome.page.unwrap();
        assert_eq!(page.url().as_str(), "http://localhost:8080/site/docs");
        assert_eq!(
            page.links()[0].as_str(),
            "http://localhost:8080/site/docs/setup.html"
        );

        let target = fetcher
            .fetch(&url("http://localhost:8080/site/docs/setup.html"))
            .await;
        assert!(target.is_ok());
    }

    #[tokio::test]
    async fn test_serves_nested_index() {
        let dir = site();
        let outcome = fetcher(&dir)
            .fetch(&url("http://localhost:8080/site/docs/"))
            .await;
        assert!(outcome.page.unwrap().has_id("top"));
    }

    #[tokio::test]
    async fn test_non_html_file_is_reachable() {
        let dir = site();
        let outcome = fetcher(&dir)
            .fetch(&url("http://localhost:8080/site/guide.pdf"))
            .await;
        assert!(outcome.is_ok());
        assert!(outcome.page.is_none());
        assert_eq!(
            outcome.error,
            Some(CheckError::UnsupportedContentType("application/pdf".to_string()))
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let dir = site();
        let outcome = fetcher(&dir)
            .fetch(&url("http://localhost:8080/site/nope.html"))
            .await;
        assert_eq!(outcome.status, 404);
        assert_eq!(outcome.error, Some(CheckError::UnexpectedStatus(404)));
    }

    #[tokio::test]
    async fn test_generated_listing() {
        let dir = site();
        let outcome = fetcher(&dir)
            .fetch(&url("http://localhost:8080/site/assets/"))
            .await;
        let page = outcome.page.unwrap();
        assert_eq!(
            page.links()[0].as_str(),
            "http://localhost:8080/site/assets/my%20file.css"
        );
    }

    #[tokio::test]
    async fn test_percent_encoded_path() {
        let dir = site();
        let text = fetcher(&dir)
            .fetch_text(&url("http://localhost:8080/site/assets/my%20file.css"))
            .await
            .unwrap();
        assert_eq!(text, "body {}");
    }

    #[tokio::test]
    async fn test_outside_base_without_fallback() {
        let dir = site();
        let fetcher = fetcher(&dir);
        let outcome = fetcher.fetch(&url("https://example.com/")).await;
        assert_eq!(outcome.error, Some(CheckError::UnexpectedStatus(404)));

        let outcome = fetcher.fetch(&url("http://localhost:8080/other/")).await;
        assert_eq!(outcome.error, Some(CheckError::UnexpectedStatus(404)));
    }

    #[test]
    fn test_path_cannot_escape_root() {
        let dir = site();
        let fetcher = fetcher(&dir);
        assert!(fetcher
            .local_path(&url("http://localhost:8080/site/../../etc/passwd"))
            .is_none());
    }

    #[test]
    fn test_seed_urls() {
        let dir = site();
        let seeds = fetcher(&dir).seed_urls().unwrap();
        let seeds: Vec<&str> = seeds.iter().map(Url::as_str).collect();
        assert_eq!(
            seeds,
            vec!["http://localhost:8080/site/", "http://localhost:8080/site/docs/"]
        );
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a/b.HTML")), "text/html");
        assert_eq!(content_type_for(Path::new("x.png")), "image/png");
        assert_eq!(content_type_for(Path::new("README")), "application/octet-stream");
    }
}
