use url::Url;

/// Extracts the crawl-scope key of a URL: lowercase host plus port
///
/// The port is included only when it differs from the scheme's default, so
/// `https://example.com/` and `https://example.com:443/` share a key while two
/// local fixture servers on different ports do not.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use linkrot::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(extract_domain(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Returns the origin of a URL (`scheme://host[:port]`) as a base for well-known paths
pub fn origin_of(url: &Url) -> Option<Url> {
    let domain = extract_domain(url)?;
    Url::parse(&format!("{}://{}/", url.scheme(), domain)).ok()
}
