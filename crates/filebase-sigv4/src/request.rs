//! The request description that every signer operates on.
//!
//! [`HttpRequest`] is a plain value: it carries everything needed to build a
//! canonical request and to format the final URL, but it never performs I/O.
//! Signers take it by reference and return a new, signed copy.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::Method;

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// A key without a value. Rendered as the bare key (`?acl`).
    Absent,
    /// A single value. An empty string still renders as `key=`.
    Single(String),
    /// Repeated values, rendered one `key=value` pair per element in order.
    Multiple(Vec<String>),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_owned())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multiple(values)
    }
}

/// Query parameters keyed by their unescaped name.
///
/// A `BTreeMap` keeps keys in byte-wise order, which is the order the
/// canonical query string requires.
pub type Query = BTreeMap<String, QueryValue>;

/// Optional fields used to construct an [`HttpRequest`].
///
/// Every field left as `None` receives the same default the request
/// constructor documents; see [`HttpRequest::new`].
#[derive(Debug, Clone, Default)]
pub struct HttpRequestInit {
    /// HTTP method. Defaults to `GET`.
    pub method: Option<Method>,
    /// URL scheme, with or without the trailing `:`. Defaults to `https:`.
    pub protocol: Option<String>,
    /// Host name without port. Defaults to `localhost`.
    pub hostname: Option<String>,
    /// Explicit port.
    pub port: Option<u16>,
    /// Request path. Defaults to `/`; a missing leading `/` is added.
    pub path: Option<String>,
    /// Query parameters. Defaults to empty.
    pub query: Option<Query>,
    /// Request headers. Defaults to empty.
    pub headers: Option<BTreeMap<String, String>>,
    /// User name for the authority section of the URL.
    pub username: Option<String>,
    /// Password for the authority section of the URL.
    pub password: Option<String>,
    /// URL fragment, without the leading `#`.
    pub fragment: Option<String>,
    /// Request payload.
    pub body: Option<Bytes>,
}

/// A normalized HTTP request description.
///
/// Invariants established by [`HttpRequest::new`]: `protocol` ends with `:`
/// and `path` starts with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// URL scheme including the trailing `:` (e.g. `https:`).
    pub protocol: String,
    /// Host name without port.
    pub hostname: String,
    /// Explicit port, if any.
    pub port: Option<u16>,
    /// Request path, always starting with `/`. Used verbatim when signing.
    pub path: String,
    /// Query parameters.
    pub query: Query,
    /// Request headers, names in their original case.
    pub headers: BTreeMap<String, String>,
    /// User name for the URL authority section.
    pub username: Option<String>,
    /// Password for the URL authority section.
    pub password: Option<String>,
    /// URL fragment, without the leading `#`.
    pub fragment: Option<String>,
    /// Request payload.
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Build a request, applying defaults and normalizing `protocol` and `path`.
    ///
    /// # Examples
    ///
    /// ```
    /// use filebase_sigv4::{HttpRequest, HttpRequestInit};
    ///
    /// let request = HttpRequest::new(HttpRequestInit {
    ///     protocol: Some("http".to_owned()),
    ///     path: Some("bucket/key".to_owned()),
    ///     ..Default::default()
    /// });
    /// assert_eq!(request.protocol, "http:");
    /// assert_eq!(request.path, "/bucket/key");
    /// assert_eq!(request.hostname, "localhost");
    /// assert_eq!(request.method, http::Method::GET);
    /// ```
    #[must_use]
    pub fn new(init: HttpRequestInit) -> Self {
        let protocol = match init.protocol {
            Some(p) if p.is_empty() => "https:".to_owned(),
            Some(p) if p.ends_with(':') => p,
            Some(p) => format!("{p}:"),
            None => "https:".to_owned(),
        };
        let path = match init.path {
            Some(p) if p.is_empty() => "/".to_owned(),
            Some(p) if p.starts_with('/') => p,
            Some(p) => format!("/{p}"),
            None => "/".to_owned(),
        };

        Self {
            method: init.method.unwrap_or(Method::GET),
            protocol,
            hostname: init.hostname.unwrap_or_else(|| "localhost".to_owned()),
            port: init.port,
            path,
            query: init.query.unwrap_or_default(),
            headers: init.headers.unwrap_or_default(),
            username: init.username,
            password: init.password,
            fragment: init.fragment,
            body: init.body,
        }
    }

    /// The value of the `Host` header this request is sent with.
    ///
    /// This is the host name, followed by `:port` when a non-zero port is set.
    #[must_use]
    pub fn host(&self) -> String {
        match self.port {
            Some(port) if port != 0 => format!("{}:{port}", self.hostname),
            _ => self.hostname.clone(),
        }
    }

    /// Look up a header value by name, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing any existing header with the same name in any case.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
        self.headers.insert(name.to_owned(), value.into());
    }
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self::new(HttpRequestInit::default())
    }
}
