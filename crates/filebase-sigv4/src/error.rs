//! Error types for SigV4 signing.
//!
//! Signing itself is deterministic and cannot fail once its inputs exist, so
//! [`SignError`] only covers the two places where untrusted input enters the
//! crate: URL strings and credential tokens.

/// Errors that can occur while preparing a request for signing.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// The string passed to [`parse_url`](crate::parse_url) is not a valid absolute URL.
    #[error("Invalid URL {url:?}: {source}")]
    InvalidUrl {
        /// The offending input.
        url: String,
        /// The underlying parse failure.
        #[source]
        source: url::ParseError,
    },

    /// A credential token did not decode to a well-formed `accessKeyId:secretAccessKey` pair.
    ///
    /// The message describes the defect only; it never contains the token.
    #[error("Invalid credential token: {0}")]
    CredentialDecode(String),
}
