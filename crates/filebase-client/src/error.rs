//! Client error types.

use bytes::Bytes;
use filebase_sigv4::SignError;
use http::{HeaderMap, StatusCode};

/// Failure to deliver a request or read its response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The HTTP client failed (connection, TLS, invalid header, body read).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A transport-specific failure outside the HTTP client.
    #[error("{0}")]
    Other(String),
}

/// Errors returned by [`FilebaseClient`](crate::FilebaseClient) operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request could not be prepared for signing.
    #[error(transparent)]
    Sign(#[from] SignError),

    /// Filebase answered with a non-success status.
    ///
    /// The response is surfaced as received; it is not interpreted.
    #[error("{operation} rejected by upstream with status {status}")]
    UpstreamRejection {
        /// The client operation that was rejected.
        operation: &'static str,
        /// Response status.
        status: StatusCode,
        /// Response headers.
        headers: HeaderMap,
        /// Response body.
        body: Bytes,
    },

    /// The request never produced a response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Required configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}
