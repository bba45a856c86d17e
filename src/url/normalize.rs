use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use url::Url;

/// Computes the identity of a URL for deduplication
///
/// # Normalization Steps
///
/// 1. Remove fragment (everything after #)
/// 2. Remove query string
///
/// Two links that differ only in fragment or query therefore share one fetch.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use linkrot::url::identity_url;
///
/// let url = Url::parse("https://example.com/page?lang=en#intro").unwrap();
/// assert_eq!(identity_url(&url).as_str(), "https://example.com/page");
/// ```
pub fn identity_url(url: &Url) -> Url {
    let mut identity = url.clone();
    identity.set_fragment(None);
    identity.set_query(None);
    identity
}

/// Returns the non-empty, percent-decoded fragment of a URL, if any
///
/// `Url` keeps fragments encoded (`#caf%C3%A9`), while `id` attributes are
/// raw text, so the decoded form is what gets compared.
pub fn fragment_of(url: &Url) -> Option<Cow<'_, str>> {
    url.fragment()
        .filter(|f| !f.is_empty())
        .map(|f| percent_decode_str(f).decode_utf8_lossy())
}

/// Returns true if the URL uses a scheme the crawler can fetch
pub fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
