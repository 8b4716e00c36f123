//! Client configuration.
//!
//! Provides [`ClientConfig`] for pointing the client at a Filebase endpoint,
//! and [`credentials_from_env`] for loading the access token. Values are read
//! from environment variables.

use filebase_sigv4::{Credentials, DEFAULT_EXPIRES_IN};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::ClientError;

/// Default Filebase S3 endpoint host.
pub const DEFAULT_API_URL: &str = "s3.filebase.com";

/// Region Filebase expects signatures to be scoped to.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Environment variable holding the base64 `accessKeyId:secretAccessKey` token.
pub const TOKEN_ENV: &str = "FILEBASE_TOKEN";

/// Filebase client configuration.
///
/// # Examples
///
/// ```
/// use filebase_client::ClientConfig;
///
/// let config = ClientConfig::default();
/// assert_eq!(config.api_url, "s3.filebase.com");
/// assert_eq!(config.expires_in, 3600);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Endpoint host (optionally with `:port`), without scheme.
    #[builder(default = String::from(DEFAULT_API_URL))]
    pub api_url: String,

    /// Region the signatures are scoped to.
    #[builder(default = String::from(DEFAULT_REGION))]
    pub region: String,

    /// Validity of presigned upload URLs, in seconds.
    #[builder(default = DEFAULT_EXPIRES_IN)]
    pub expires_in: i64,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: String::from(DEFAULT_API_URL),
            region: String::from(DEFAULT_REGION),
            expires_in: DEFAULT_EXPIRES_IN,
            log_level: String::from("info"),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `FILEBASE_API_URL` | `s3.filebase.com` |
    /// | `FILEBASE_REGION` | `us-east-1` |
    /// | `FILEBASE_EXPIRES_IN` | `3600` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// An unparseable `FILEBASE_EXPIRES_IN` keeps the default.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("FILEBASE_API_URL") {
            config.api_url = v;
        }
        if let Ok(v) = std::env::var("FILEBASE_REGION") {
            config.region = v;
        }
        if let Ok(v) = std::env::var("FILEBASE_EXPIRES_IN") {
            if let Ok(n) = v.parse::<i64>() {
                config.expires_in = n;
            }
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }
}

/// Decode the credentials held in `FILEBASE_TOKEN`.
///
/// # Errors
///
/// Returns [`ClientError::Config`] if the variable is unset, or
/// [`ClientError::Sign`] if the token does not decode.
pub fn credentials_from_env() -> Result<Credentials, ClientError> {
    let token = std::env::var(TOKEN_ENV)
        .map_err(|_| ClientError::Config(format!("{TOKEN_ENV} is not set")))?;
    Ok(Credentials::from_token(&token)?)
}
