//! Conversion between URL strings and request fields.
//!
//! [`parse_url`] extracts the addressing fields of an absolute URL;
//! [`format_url`] turns a (usually signed) [`HttpRequest`] back into a URL
//! string. Formatting performs no validation: escaping of query keys and
//! values happens in [`build_query_string`].

use std::collections::btree_map::Entry;

use url::Url;

use crate::canonical::build_query_string;
use crate::error::SignError;
use crate::request::{HttpRequest, HttpRequestInit, Query, QueryValue};

/// The addressing fields extracted from a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts {
    /// Host name without port.
    pub hostname: String,
    /// Port, when given and not the scheme's default.
    pub port: Option<u16>,
    /// Scheme including the trailing `:`.
    pub protocol: String,
    /// The URL path, as percent-encoded by the parser, always starting with `/`.
    pub path: String,
    /// `None` from [`parse_url`]; the decoded query from [`parse_url_with_query`].
    pub query: Option<Query>,
}

impl From<&Url> for UrlParts {
    fn from(url: &Url) -> Self {
        let mut path = url.path().to_owned();
        // opaque paths (`mailto:x@y.com`) have no leading slash
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        Self {
            hostname: url.host_str().unwrap_or_default().to_owned(),
            port: url.port(),
            protocol: format!("{}:", url.scheme()),
            path,
            query: None,
        }
    }
}

impl From<UrlParts> for HttpRequestInit {
    fn from(parts: UrlParts) -> Self {
        Self {
            protocol: Some(parts.protocol),
            hostname: Some(parts.hostname),
            port: parts.port,
            path: Some(parts.path),
            query: parts.query,
            ..Self::default()
        }
    }
}

/// Parse an absolute URL string into its addressing fields.
///
/// # Errors
///
/// Returns [`SignError::InvalidUrl`] if `url` is not a valid absolute URL.
///
/// # Examples
///
/// ```
/// use filebase_sigv4::parse_url;
///
/// let parts = parse_url("http://example.com:8080/path").unwrap();
/// assert_eq!(parts.protocol, "http:");
/// assert_eq!(parts.hostname, "example.com");
/// assert_eq!(parts.port, Some(8080));
/// assert_eq!(parts.path, "/path");
///
/// assert!(parse_url("not a valid url").is_err());
/// ```
pub fn parse_url(url: &str) -> Result<UrlParts, SignError> {
    Ok(UrlParts::from(&parse_absolute(url)?))
}

/// Parse an absolute URL string, keeping its query parameters.
///
/// Like [`parse_url`], but `query` holds the decoded query pairs. A key that
/// appears more than once becomes a [`QueryValue::Multiple`] in order of
/// appearance; a key without `=` becomes an empty [`QueryValue::Single`].
///
/// # Errors
///
/// Returns [`SignError::InvalidUrl`] if `url` is not a valid absolute URL.
///
/// # Examples
///
/// ```
/// use filebase_sigv4::{QueryValue, parse_url_with_query};
///
/// let parts = parse_url_with_query("https://s3.filebase.com/b/k?uploadId=abc&partNumber=1").unwrap();
/// let query = parts.query.unwrap();
/// assert_eq!(query["uploadId"], QueryValue::from("abc"));
/// assert_eq!(query["partNumber"], QueryValue::from("1"));
/// ```
pub fn parse_url_with_query(url: &str) -> Result<UrlParts, SignError> {
    let parsed = parse_absolute(url)?;
    let mut query = Query::new();
    for (key, value) in parsed.query_pairs() {
        let value = value.into_owned();
        match query.entry(key.into_owned()) {
            Entry::Vacant(entry) => {
                entry.insert(QueryValue::Single(value));
            }
            Entry::Occupied(mut entry) => match entry.get_mut() {
                QueryValue::Multiple(values) => values.push(value),
                existing => {
                    let first = match std::mem::replace(existing, QueryValue::Absent) {
                        QueryValue::Single(first) => first,
                        _ => String::new(),
                    };
                    *existing = QueryValue::Multiple(vec![first, value]);
                }
            },
        }
    }

    Ok(UrlParts {
        query: Some(query),
        ..UrlParts::from(&parsed)
    })
}

fn parse_absolute(url: &str) -> Result<Url, SignError> {
    Url::parse(url).map_err(|source| SignError::InvalidUrl {
        url: url.to_owned(),
        source,
    })
}

/// Format a request back into a URL string.
///
/// Produces `scheme://[user[:pass]@]host[:port]path[?query][#fragment]`.
/// Fields are repaired rather than validated: a missing `:` after the scheme
/// is added, a relative path gets a leading `/`, and when either `username`
/// or `password` is set both are emitted (the missing one as an empty string).
///
/// # Examples
///
/// ```
/// use filebase_sigv4::{HttpRequest, HttpRequestInit, format_url};
///
/// let request = HttpRequest::new(HttpRequestInit {
///     hostname: Some("example.com".to_owned()),
///     port: Some(8443),
///     path: Some("/bucket/key".to_owned()),
///     fragment: Some("top".to_owned()),
///     ..Default::default()
/// });
/// assert_eq!(format_url(&request), "https://example.com:8443/bucket/key#top");
/// ```
#[must_use]
pub fn format_url(request: &HttpRequest) -> String {
    let mut protocol = request.protocol.clone();
    if !protocol.is_empty() && !protocol.ends_with(':') {
        protocol.push(':');
    }

    let hostname = request.host();

    let mut path = request.path.clone();
    if !path.is_empty() && !path.starts_with('/') {
        path.insert(0, '/');
    }

    let mut query = build_query_string(&request.query);
    if !query.is_empty() && !query.starts_with('?') {
        query.insert(0, '?');
    }

    let auth = if request.username.is_some() || request.password.is_some() {
        format!(
            "{}:{}@",
            request.username.as_deref().unwrap_or_default(),
            request.password.as_deref().unwrap_or_default()
        )
    } else {
        String::new()
    };

    let fragment = match request.fragment.as_deref() {
        Some(fragment) if !fragment.is_empty() => format!("#{fragment}"),
        _ => String::new(),
    };

    format!("{protocol}//{auth}{hostname}{path}{query}{fragment}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_from(url: &str) -> HttpRequest {
        HttpRequest::new(HttpRequestInit::from(parse_url(url).unwrap()))
    }

    #[test]
    fn test_should_parse_protocol_and_hostname() {
        let parts = parse_url("https://example.com/path").unwrap();
        assert_eq!(parts.protocol, "https:");
        assert_eq!(parts.hostname, "example.com");
        assert_eq!(parts.port, None);
        assert_eq!(parts.path, "/path");
        assert_eq!(parts.query, None);
    }

    #[test]
    fn test_should_parse_port() {
        let parts = parse_url("http://example.com:8080/path").unwrap();
        assert_eq!(parts.port, Some(8080));
    }

    #[test]
    fn test_should_drop_default_port() {
        let parts = parse_url("https://example.com:443/").unwrap();
        assert_eq!(parts.port, None);
    }

    #[test]
    fn test_should_not_parse_query() {
        let parts = parse_url("https://example.com/path?a=1").unwrap();
        assert_eq!(parts.query, None);
        assert_eq!(parts.path, "/path");
    }

    #[test]
    fn test_should_reject_invalid_url() {
        let err = parse_url("not a valid url").unwrap_err();
        match err {
            SignError::InvalidUrl { url, .. } => assert_eq!(url, "not a valid url"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_should_accept_structured_url() {
        let url = Url::parse("https://s3.filebase.com/bucket/file.car").unwrap();
        let parts = UrlParts::from(&url);
        assert_eq!(parts, parse_url(url.as_str()).unwrap());
    }

    #[test]
    fn test_should_keep_query_pairs_when_requested() {
        let parts =
            parse_url_with_query("https://s3.filebase.com/b/k?partNumber=1&uploadId=abc&tag=x&tag=y&acl")
                .unwrap();
        let query = parts.query.unwrap();
        assert_eq!(query["partNumber"], QueryValue::from("1"));
        assert_eq!(query["uploadId"], QueryValue::from("abc"));
        assert_eq!(
            query["tag"],
            QueryValue::Multiple(vec!["x".to_owned(), "y".to_owned()])
        );
        assert_eq!(query["acl"], QueryValue::from(""));
        assert_eq!(parts.path, "/b/k");
    }

    #[test]
    fn test_should_decode_escaped_query_values() {
        let parts = parse_url_with_query("https://example.com/?prefix=a%20b%2Fc").unwrap();
        assert_eq!(parts.query.unwrap()["prefix"], QueryValue::from("a b/c"));
    }

    #[test]
    fn test_should_return_empty_query_when_url_has_none() {
        let parts = parse_url_with_query("https://example.com/path").unwrap();
        assert_eq!(parts.query, Some(Query::new()));
        assert!(parse_url_with_query("not a valid url").is_err());
    }

    #[test]
    fn test_should_root_opaque_paths() {
        let parts = parse_url("mailto:x@y.com").unwrap();
        assert_eq!(parts.path, "/x@y.com");
        let formatted = format_url(&HttpRequest::new(HttpRequestInit::from(parts.clone())));
        assert_eq!(parse_url(&formatted).unwrap(), parts);
    }

    #[test]
    fn test_should_omit_port_zero() {
        let mut request = request_from("https://example.com/");
        request.port = Some(0);
        assert_eq!(format_url(&request), "https://example.com/");
    }

    #[test]
    fn test_should_format_query_and_auth() {
        let mut request = request_from("https://example.com/path");
        request.query.insert("b".to_owned(), "2".into());
        request.query.insert("a".to_owned(), QueryValue::Absent);
        request.username = Some("user".to_owned());
        assert_eq!(format_url(&request), "https://user:@example.com/path?a&b=2");
    }

    #[test]
    fn test_should_repair_protocol_and_path() {
        let mut request = HttpRequest::default();
        request.protocol = "http".to_owned();
        request.path = "relative".to_owned();
        assert_eq!(format_url(&request), "http://localhost/relative");
    }

    #[test]
    fn test_should_skip_empty_fragment() {
        let mut request = request_from("https://example.com/");
        request.fragment = Some(String::new());
        assert_eq!(format_url(&request), "https://example.com/");
    }

    #[test]
    fn test_should_round_trip_through_format() {
        for url in [
            "https://example.com/path",
            "http://example.com:8080/a/b%20c",
            "https://s3.filebase.com/bucket/hello.txt",
            "http://[::1]:9000/bucket",
            "https://example.com",
        ] {
            let once = parse_url(url).unwrap();
            let formatted = format_url(&HttpRequest::new(HttpRequestInit::from(once.clone())));
            let twice = parse_url(&formatted).unwrap();
            assert_eq!(once, twice, "round trip of {url}");
        }
    }
}
