//! Canonical request construction for AWS Signature Version 4.
//!
//! This module implements the canonical request format as specified by AWS:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! It also owns the escaping and query serialization rules shared by the
//! signed string and the emitted URL. Both go through [`build_query_string`]
//! so the bytes the server sees are the bytes that were hashed.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::request::{Query, QueryValue};

/// The set of characters that must be percent-encoded in query keys and values.
///
/// All characters except unreserved characters (A-Z, a-z, 0-9, `-`, `_`, `.`,
/// `~`) are encoded. This is standard component escaping plus `! ' ( ) *`.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Headers that are never part of the signature.
///
/// Proxies and HTTP clients rewrite or strip these in transit.
const UNSIGNABLE_HEADERS: &[&str] = &[
    "authorization",
    "connection",
    "expect",
    "presigned-expires",
    "user-agent",
    "x-amzn-trace-id",
];

/// Percent-encode a string using the AWS SigV4 rules.
///
/// Each byte of the UTF-8 encoding outside the unreserved set becomes `%XX`
/// with uppercase hex digits.
///
/// # Examples
///
/// ```
/// use filebase_sigv4::canonical::escape_uri;
///
/// assert_eq!(escape_uri("a b!c'd(e)f*g"), "a%20b%21c%27d%28e%29f%2Ag");
/// assert_eq!(escape_uri("AKID/20130524"), "AKID%2F20130524");
/// ```
#[must_use]
pub fn escape_uri(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}

/// Serialize query parameters into a query string.
///
/// Keys are visited in sorted order and escaped. A [`QueryValue::Multiple`]
/// emits one `key=value` pair per element in its original order, a
/// [`QueryValue::Absent`] emits the bare key, and a [`QueryValue::Single`]
/// emits `key=value` even when the value is empty. Pairs are joined with `&`.
///
/// # Examples
///
/// ```
/// use filebase_sigv4::{Query, QueryValue, build_query_string};
///
/// let mut query = Query::new();
/// query.insert("b".to_owned(), "2".into());
/// query.insert("a".to_owned(), "1".into());
/// assert_eq!(build_query_string(&query), "a=1&b=2");
///
/// let mut query = Query::new();
/// query.insert("a".to_owned(), QueryValue::Multiple(vec!["y".into(), "x".into()]));
/// assert_eq!(build_query_string(&query), "a=y&a=x");
/// ```
#[must_use]
pub fn build_query_string(query: &Query) -> String {
    let mut parts = Vec::with_capacity(query.len());
    for (key, value) in query {
        let key = escape_uri(key);
        match value {
            QueryValue::Multiple(values) => {
                parts.extend(values.iter().map(|v| format!("{key}={}", escape_uri(v))));
            }
            QueryValue::Single(v) => parts.push(format!("{key}={}", escape_uri(v))),
            QueryValue::Absent => parts.push(key),
        }
    }
    parts.join("&")
}

/// Build the canonical query string for a set of query parameters.
///
/// The server canonicalizes a bare key as `key=` and orders repeated values,
/// so the query is normalized that way first and then serialized with
/// [`build_query_string`]. For queries made only of single values the result
/// is byte-identical to [`build_query_string`].
///
/// # Examples
///
/// ```
/// use filebase_sigv4::{Query, QueryValue};
/// use filebase_sigv4::canonical::build_canonical_query_string;
///
/// let mut query = Query::new();
/// query.insert("acl".to_owned(), QueryValue::Absent);
/// query.insert("tag".to_owned(), QueryValue::Multiple(vec!["b".into(), "a".into()]));
/// assert_eq!(build_canonical_query_string(&query), "acl=&tag=a&tag=b");
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &Query) -> String {
    let normalized: Query = query
        .iter()
        .map(|(key, value)| {
            let value = match value {
                QueryValue::Absent => QueryValue::Single(String::new()),
                QueryValue::Single(v) => QueryValue::Single(v.clone()),
                QueryValue::Multiple(values) => {
                    let mut values = values.clone();
                    values.sort_by_cached_key(|v| escape_uri(v));
                    QueryValue::Multiple(values)
                }
            };
            (key.clone(), value)
        })
        .collect();
    build_query_string(&normalized)
}

/// Build the full canonical request string from its already-canonical components.
///
/// The path is used exactly as given; it is not escaped again. The result is
/// a newline-separated string of:
/// 1. HTTP method (upper-cased)
/// 2. Path
/// 3. Canonical query string
/// 4. Canonical headers (terminated by an extra newline)
/// 5. Signed headers
/// 6. Hashed payload
///
/// # Examples
///
/// ```
/// use filebase_sigv4::canonical::build_canonical_request;
///
/// let canonical = build_canonical_request(
///     "get",
///     "/test.txt",
///     "",
///     "host:examplebucket.s3.amazonaws.com",
///     "host",
///     "UNSIGNED-PAYLOAD",
/// );
/// assert_eq!(
///     canonical,
///     "GET\n/test.txt\n\nhost:examplebucket.s3.amazonaws.com\n\nhost\nUNSIGNED-PAYLOAD"
/// );
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    path: &str,
    canonical_query: &str,
    canonical_headers: &str,
    signed_headers: &str,
    payload_hash: &str,
) -> String {
    let method = method.to_ascii_uppercase();
    format!(
        "{method}\n{path}\n{canonical_query}\n{canonical_headers}\n\n{signed_headers}\n{payload_hash}"
    )
}

/// Build the canonical headers string from the request headers.
///
/// Header names are lowercased, values are trimmed of leading/trailing
/// whitespace and consecutive spaces are collapsed to a single space. Headers
/// sharing a name are joined with commas. Headers are sorted by name and
/// unsignable headers are skipped.
///
/// Returns the canonical headers string (without a trailing newline) and the
/// signed headers string (`;`-separated names).
///
/// # Examples
///
/// ```
/// use filebase_sigv4::canonical::build_canonical_headers;
///
/// let (canonical, signed) = build_canonical_headers(&[
///     ("X-Amz-Date", "20130524T000000Z"),
///     ("Host", "example.com"),
///     ("User-Agent", "curl"),
/// ]);
/// assert_eq!(canonical, "host:example.com\nx-amz-date:20130524T000000Z");
/// assert_eq!(signed, "host;x-amz-date");
/// ```
#[must_use]
pub fn build_canonical_headers(headers: &[(&str, &str)]) -> (String, String) {
    let mut header_map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let lower_name = name.to_ascii_lowercase();
        if UNSIGNABLE_HEADERS.contains(&lower_name.as_str()) {
            continue;
        }
        let trimmed_value = collapse_whitespace(value.trim());
        header_map
            .entry(lower_name)
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&trimmed_value);
            })
            .or_insert(trimmed_value);
    }

    let canonical = header_map
        .iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect::<Vec<_>>()
        .join("\n");
    let signed = header_map.keys().map(String::as_str).collect::<Vec<_>>().join(";");

    (canonical, signed)
}

/// Collapse consecutive whitespace characters in a string to a single space.
fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}
