//! Sitemap parsing
//!
//! Only `<loc>` values matter here. A `<sitemapindex>` lists further sitemaps,
//! a `<urlset>` lists pages.

/// Locations read from one sitemap document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sitemap {
    /// Page URLs from a `<urlset>`
    pub pages: Vec<String>,

    /// Nested sitemap URLs from a `<sitemapindex>`
    pub sitemaps: Vec<String>,
}

impl Sitemap {
    /// Parses a sitemap or sitemap index
    ///
    /// Malformed markup yields whatever `<loc>` values could be read.
    pub fn parse(xml: &str) -> Self {
        let locations = loc_values(xml);
        if xml.contains("<sitemapindex") {
            Self {
                pages: Vec::new(),
                sitemaps: locations,
            }
        } else {
            Self {
                pages: locations,
                sitemaps: Vec::new(),
            }
        }
    }
}

/// Extracts the text of every `<loc>` element
fn loc_values(xml: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut rest = xml;

    while let Some(start) = rest.find("<loc>") {
        let after = &rest[start + "<loc>".len()..];
        let Some(end) = after.find("</loc>") else {
            break;
        };

        let value = unescape_xml(strip_cdata(after[..end].trim()));
        if !value.is_empty() {
            values.push(value);
        }
        rest = &after[end + "</loc>".len()..];
    }

    values
}

fn strip_cdata(text: &str) -> &str {
    text.strip_prefix("<![CDATA[")
        .and_then(|inner| inner.strip_suffix("]]>"))
        .map(str::trim)
        .unwrap_or(text)
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
