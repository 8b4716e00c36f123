//! Async client for Filebase's S3-compatible API.
//!
//! Builds on [`filebase_sigv4`] to provision buckets, hand out presigned
//! upload URLs, upload CAR files and read objects back together with their
//! IPFS CID.
//!
//! # Usage
//!
//! ```no_run
//! use bytes::Bytes;
//! use filebase_client::{ClientConfig, FilebaseClient, credentials_from_env};
//!
//! # async fn run() -> Result<(), filebase_client::ClientError> {
//! let client = FilebaseClient::new(ClientConfig::from_env(), credentials_from_env()?);
//! client.upload_car("my-bucket", "data.car", Bytes::from_static(b"...")).await?;
//! let (exists, cid) = client.head_object("my-bucket", "data.car").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`client`] - Bucket and object operations
//! - [`config`] - Endpoint configuration and token loading
//! - [`error`] - Client and transport errors
//! - [`transport`] - The HTTP seam and its `reqwest` implementation

pub mod client;
pub mod config;
pub mod error;
pub mod transport;

pub use client::FilebaseClient;
pub use config::{ClientConfig, credentials_from_env};
pub use error::{ClientError, TransportError};
pub use transport::{ReqwestTransport, Transport, TransportResponse};
