//! Integration tests for the HTTP fetcher
//!
//! These tests use wiremock to create mock HTTP servers and check redirect,
//! status, content type and transport handling.

use linkrot::config::{CheckerOptions, FetcherOptions};
use linkrot::crawler::{build_http_client, Fetch, HttpFetcher};
use linkrot::CheckError;
use std::time::{Duration, Instant};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(options: FetcherOptions) -> HttpFetcher {
    let client = build_http_client(&CheckerOptions::default()).unwrap();
    HttpFetcher::new(client, &options).unwrap()
}

fn url(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=utf-8")
}

fn redirect(to: &str) -> ResponseTemplate {
    ResponseTemplate::new(302).insert_header("location", to)
}

#[tokio::test]
async fn test_html_page_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(html(r#"<h1 id="top">Hi</h1><a href="/next">Next</a>"#))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = fetcher(FetcherOptions::default())
        .fetch(&url(&server, "/page"))
        .await;

    assert_eq!(outcome.status, 200);
    assert!(outcome.error.is_none());
    let page = outcome.page.unwrap();
    assert!(page.has_id("top"));
    assert_eq!(page.links()[0].as_str(), format!("{}/next", server.uri()));
}

#[tokio::test]
async fn test_redirects_are_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs"))
        .respond_with(redirect("/docs/"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/"))
        .respond_with(html(r#"<a href="intro.html">Intro</a>"#))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = fetcher(FetcherOptions::default())
        .fetch(&url(&server, "/docs"))
        .await;

    assert!(outcome.is_ok());
    let page = outcome.page.unwrap();
    assert_eq!(page.url().as_str(), format!("{}/docs", server.uri()));
    assert_eq!(
        page.links()[0].as_str(),
        format!("{}/docs/intro.html", server.uri())
    );
}

#[tokio::test]
async fn test_too_many_redirections_stops_after_limit() {
    let server = MockServer::start().await;
    for hop in 0..6 {
        Mock::given(method("GET"))
            .and(path(format!("/r{}", hop)))
            .respond_with(redirect(&format!("/r{}", hop + 1)))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/r6"))
        .respond_with(html("<p>never reached</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let options = FetcherOptions {
        max_redirections: 5,
        ..FetcherOptions::default()
    };
    let outcome = fetcher(options).fetch(&url(&server, "/r0")).await;

    assert_eq!(outcome.error, Some(CheckError::TooManyRedirections));
    assert!(outcome.page.is_none());
}

#[tokio::test]
async fn test_zero_redirections_allowed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/moved"))
        .respond_with(redirect("/target"))
        .expect(1)
        .mount(&server)
        .await;

    let options = FetcherOptions {
        max_redirections: 0,
        ..FetcherOptions::default()
    };
    let outcome = fetcher(options).fetch(&url(&server, "/moved")).await;
    assert_eq!(outcome.error, Some(CheckError::TooManyRedirections));
}

#[tokio::test]
async fn test_missing_location_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/moved"))
        .respond_with(ResponseTemplate::new(301))
        .mount(&server)
        .await;

    let outcome = fetcher(FetcherOptions::default())
        .fetch(&url(&server, "/moved"))
        .await;
    assert_eq!(outcome.status, 301);
    assert_eq!(outcome.error, Some(CheckError::MissingLocationHeader));
}

#[tokio::test]
async fn test_unexpected_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let outcome = fetcher(FetcherOptions::default())
        .fetch(&url(&server, "/missing"))
        .await;
    assert_eq!(outcome.status, 404);
    assert_eq!(outcome.error, Some(CheckError::UnexpectedStatus(404)));
    assert!(!outcome.is_ok());
}

#[tokio::test]
async fn test_pdf_is_reachable_without_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/guide.pdf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let outcome = fetcher(FetcherOptions::default())
        .fetch(&url(&server, "/guide.pdf"))
        .await;
    assert!(outcome.is_ok());
    assert!(outcome.page.is_none());
    assert_eq!(
        outcome.error,
        Some(CheckError::UnsupportedContentType("application/pdf".to_string()))
    );
}

#[tokio::test]
async fn test_configured_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .and(header("x-token", "secret"))
        .respond_with(html("<p>ok</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut options = FetcherOptions::default();
    options
        .headers
        .insert("X-Token".to_string(), "secret".to_string());
    let outcome = fetcher(options).fetch(&url(&server, "/private")).await;
    assert!(outcome.is_ok());
}

#[tokio::test]
async fn test_timeout_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<p>late</p>").set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let options = FetcherOptions {
        timeout: Duration::from_millis(200),
        ..FetcherOptions::default()
    };
    let outcome = fetcher(options).fetch(&url(&server, "/slow")).await;
    assert_eq!(outcome.status, 0);
    assert!(matches!(outcome.error, Some(CheckError::Transport(_))));
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let target = Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap();
    let outcome = fetcher(FetcherOptions::default()).fetch(&target).await;

    assert_eq!(outcome.status, 0);
    match outcome.error {
        Some(CheckError::Transport(text)) => assert!(!text.is_empty()),
        other => panic!("expected a transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_text_ignores_media_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /x\n"))
        .mount(&server)
        .await;

    let text = fetcher(FetcherOptions::default())
        .fetch_text(&url(&server, "/robots.txt"))
        .await
        .unwrap();
    assert!(text.contains("Disallow: /x"));
}

#[tokio::test]
async fn test_admission_gate_serializes_fetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html("<p>slow</p>").set_delay(Duration::from_millis(200)))
        .mount(&server)
        .await;

    let options = FetcherOptions {
        concurrency: 1,
        ..FetcherOptions::default()
    };
    let fetcher = fetcher(options);
    let first = url(&server, "/one");
    let second = url(&server, "/two");

    let started = Instant::now();
    let (a, b) = tokio::join!(fetcher.fetch(&first), fetcher.fetch(&second));
    assert!(a.is_ok() && b.is_ok());
    assert!(started.elapsed() >= Duration::from_millis(400));
    assert_eq!(fetcher.gate().in_flight(), 0);
}

#[tokio::test]
async fn test_timeout_applies_to_each_redirect_hop() {
    let server = MockServer::start().await;
    for hop in 0..3 {
        Mock::given(method("GET"))
            .and(path(format!("/h{}", hop)))
            .respond_with(redirect(&format!("/h{}", hop + 1)).set_delay(Duration::from_millis(150)))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/h3"))
        .respond_with(html("<p>done</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let options = FetcherOptions {
        timeout: Duration::from_millis(200),
        ..FetcherOptions::default()
    };
    let outcome = fetcher(options).fetch(&url(&server, "/h0")).await;

    assert_eq!(outcome.status, 200);
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn test_redirect_chain_holds_one_permit() {
    let server = MockServer::start().await;
    for hop in 0..3 {
        Mock::given(method("GET"))
            .and(path(format!("/c{}", hop)))
            .respond_with(redirect(&format!("/c{}", hop + 1)).set_delay(Duration::from_millis(50)))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/c3"))
        .respond_with(html("<p>end of chain</p>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/other"))
        .respond_with(html("<p>other</p>").set_delay(Duration::from_millis(50)))
        .mount(&server)
        .await;

    let options = FetcherOptions {
        concurrency: 1,
        ..FetcherOptions::default()
    };
    let fetcher = fetcher(options);
    let chain = url(&server, "/c0");
    let other = url(&server, "/other");

    let mut peak = 0;
    let work = async { tokio::join!(fetcher.fetch(&chain), fetcher.fetch(&other)) };
    tokio::pin!(work);
    let (a, b) = loop {
        tokio::select! {
            done = &mut work => break done,
            _ = tokio::time::sleep(Duration::from_millis(5)) => {
                peak = peak.max(fetcher.gate().in_flight());
            }
        }
    };
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(peak, 1);

    // The chain runs without the other fetch interleaving between its hops
    let paths: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect();
    let first_hop = paths.iter().position(|p| p == "/c0").unwrap();
    assert_eq!(
        &paths[first_hop..first_hop + 4],
        &["/c0", "/c1", "/c2", "/c3"]
    );
}
