//! URL handling module for Suruga-Watch
//!
//! This module resolves the raw pagination hrefs returned by the parser and
//! normalizes URLs into the keys of the crawl's seen set.

mod normalize;

use crate::{UrlError, UrlResult};
use url::Url;

pub use normalize::normalize_url;

/// Resolves a raw href against the page it was found on
///
/// Returns None if the link should not be followed:
/// - empty hrefs
/// - fragment-only links (same page anchors)
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - hrefs that fail to resolve
/// - non-HTTP(S) URLs after resolution
///
/// # Examples
///
/// ```
/// use suruga_watch::url::resolve_reference;
/// use url::Url;
///
/// let base = Url::parse("https://www.suruga-ya.com/en/products?keyword=figure").unwrap();
/// let next = resolve_reference(&base, "/en/products?keyword=figure&page=2").unwrap();
/// assert_eq!(next.as_str(), "https://www.suruga-ya.com/en/products?keyword=figure&page=2");
/// assert!(resolve_reference(&base, "javascript:void(0)").is_none());
/// ```
pub fn resolve_reference(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let resolved = base.join(href).ok()?;
    if resolved.scheme() == "http" || resolved.scheme() == "https" {
        Some(resolved)
    } else {
        None
    }
}

/// Parses an absolute HTTP(S) URL
pub fn parse_http_url(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Returns the scheme, host and port of a URL, e.g. `https://example.com:8080`
pub fn origin_of(url: &Url) -> UrlResult<Url> {
    let host = url.host_str().ok_or(UrlError::MissingHost)?;
    let origin = match url.port() {
        Some(port) => format!("{}://{}:{}/", url.scheme(), host, port),
        None => format!("{}://{}/", url.scheme(), host),
    };
    Url::parse(&origin).map_err(|e| UrlError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://www.suruga-ya.com/en/products?keyword=figure").unwrap()
    }

    #[test]
    fn test_resolve_absolute_path() {
        let url = resolve_reference(&base_url(), "/en/products?page=3").unwrap();
        assert_eq!(url.as_str(), "https://www.suruga-ya.com/en/products?page=3");
    }

    #[test]
    fn test_resolve_query_only() {
        let url = resolve_reference(&base_url(), "?keyword=figure&page=2").unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.suruga-ya.com/en/products?keyword=figure&page=2"
        );
    }

    #[test]
    fn test_resolve_absolute_url() {
        let url = resolve_reference(&base_url(), "https://other.example.com/list").unwrap();
        assert_eq!(url.as_str(), "https://other.example.com/list");
    }

    #[test]
    fn test_resolve_trims_whitespace() {
        let url = resolve_reference(&base_url(), "  /en/products?page=2 \n").unwrap();
        assert_eq!(url.as_str(), "https://www.suruga-ya.com/en/products?page=2");
    }

    #[test]
    fn test_skip_unfollowable_links() {
        for href in [
            "",
            "   ",
            "#",
            "#top",
            "javascript:void(0)",
            "JavaScript:void(0)",
            "mailto:shop@example.com",
            "tel:+81000000",
            "data:text/html,hi",
            "ftp://example.com/file",
        ] {
            assert!(
                resolve_reference(&base_url(), href).is_none(),
                "{href:?} should not resolve"
            );
        }
    }

    #[test]
    fn test_parse_http_url() {
        assert!(parse_http_url("https://example.com/").is_ok());
        assert!(matches!(
            parse_http_url("ftp://example.com/"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(parse_http_url("nope"), Err(UrlError::Parse(_))));
    }

    #[test]
    fn test_origin_of() {
        let url = Url::parse("http://127.0.0.1:8080/en/products?x=1").unwrap();
        assert_eq!(origin_of(&url).unwrap().as_str(), "http://127.0.0.1:8080/");

        let url = Url::parse("https://www.suruga-ya.com/en/products").unwrap();
        assert_eq!(
            origin_of(&url).unwrap().as_str(),
            "https://www.suruga-ya.com/"
        );
    }
}
