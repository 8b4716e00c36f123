//! HTTP transport seam.
//!
//! [`FilebaseClient`](crate::FilebaseClient) hands fully signed requests to a
//! [`Transport`]. [`ReqwestTransport`] sends them over the network; tests plug
//! in an in-memory implementation.
//!
//! The trait uses `#[async_trait]` so that it stays object-safe.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use filebase_sigv4::{HttpRequest, format_url};
use http::{HeaderMap, StatusCode};
use tracing::debug;

use crate::error::TransportError;

/// A buffered HTTP response.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Full response body.
    pub body: Bytes,
}

impl TransportResponse {
    /// Look up a response header as a string.
    ///
    /// Returns `None` if the header is absent or not valid visible ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Sends a signed request and buffers the response.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Execute `request` against the URL produced by [`format_url`].
    async fn execute(&self, request: HttpRequest) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] over a pooled [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a default `reqwest` client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing `reqwest` client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<TransportResponse, TransportError> {
        let url = format_url(&request);
        debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = self.client.request(request.method.clone(), url.as_str());
        for (name, value) in &request.headers {
            // reqwest derives Host from the URL, which is what was signed
            if name.eq_ignore_ascii_case("host") {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        debug!(status = %status, len = body.len(), "Received response");

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
