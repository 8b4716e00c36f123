//! Filebase bucket and object operations.
//!
//! Bucket creation and object reads are header-signed and addressed
//! virtual-host style (`https://{bucket}.{api}/{key}`). Uploads go through a
//! presigned, path-style URL (`https://{api}/{bucket}/{key}`) and carry
//! `x-amz-meta-import: car` so Filebase imports the body as a CAR file.

use bytes::Bytes;
use filebase_sigv4::{
    Clock, Credentials, HttpRequest, HttpRequestInit, PayloadMode, Presigner, escape_uri,
    format_url, parse_url,
};
use http::{Method, StatusCode};
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::transport::{ReqwestTransport, Transport, TransportResponse};

/// Metadata header asking Filebase to import the uploaded body as a CAR file.
pub const IMPORT_HEADER: &str = "x-amz-meta-import";

/// Response header carrying the IPFS CID of a stored object.
pub const CID_HEADER: &str = "x-amz-meta-cid";

/// Client for one Filebase account.
///
/// # Examples
///
/// ```
/// use filebase_client::{ClientConfig, FilebaseClient};
/// use filebase_sigv4::Credentials;
///
/// let client = FilebaseClient::new(ClientConfig::default(), Credentials::new("AKID", "SECRET"));
/// let request = client.presign_upload("my-bucket", "hello.car").unwrap();
/// assert_eq!(request.hostname, "s3.filebase.com");
/// assert_eq!(request.path, "/my-bucket/hello.car");
/// ```
#[derive(Debug, Clone)]
pub struct FilebaseClient<T = ReqwestTransport> {
    config: ClientConfig,
    presigner: Presigner,
    transport: T,
}

impl FilebaseClient<ReqwestTransport> {
    /// Create a client that talks to Filebase over `reqwest`.
    #[must_use]
    pub fn new(config: ClientConfig, credentials: Credentials) -> Self {
        Self::with_transport(config, credentials, ReqwestTransport::new())
    }
}

impl<T: Transport> FilebaseClient<T> {
    /// Create a client over a custom transport.
    #[must_use]
    pub fn with_transport(config: ClientConfig, credentials: Credentials, transport: T) -> Self {
        let presigner =
            Presigner::new(credentials, config.region.clone()).with_expires_in(config.expires_in);
        Self {
            config,
            presigner,
            transport,
        }
    }

    /// Replace the clock used for signing.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.presigner = self.presigner.with_clock(clock);
        self
    }

    /// The client configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The signer requests are signed with.
    #[must_use]
    pub fn presigner(&self) -> &Presigner {
        &self.presigner
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Create `bucket`, returning whether Filebase answered `200 OK`.
    ///
    /// Any other status (including "already exists") yields `Ok(false)`.
    pub async fn create_bucket(&self, bucket: &str) -> Result<bool, ClientError> {
        let mut request = self.virtual_host_request(Method::PUT, bucket, None)?;
        request.set_header("Content-Length", "0");
        let signed = self.presigner.sign_headers(&request, PayloadMode::Buffered);

        let response = self.transport.execute(signed).await?;
        let created = response.status == StatusCode::OK;
        info!(bucket, status = %response.status, created, "Create bucket");
        Ok(created)
    }

    /// Build the presigned `PUT` request for uploading `key` into `bucket`.
    ///
    /// Pure: no bucket is created and nothing is sent.
    pub fn presign_upload(&self, bucket: &str, key: &str) -> Result<HttpRequest, ClientError> {
        let url = format!(
            "https://{}/{}/{}",
            self.config.api_url,
            escape_uri(bucket),
            escape_key(key)
        );
        let request = HttpRequest::new(HttpRequestInit {
            method: Some(Method::PUT),
            ..HttpRequestInit::from(parse_url(&url)?)
        });
        Ok(self.presigner.presign(&request))
    }

    /// Ensure `bucket` exists, then return a presigned upload URL for `key`.
    ///
    /// A failed bucket creation is logged and otherwise ignored, since the
    /// bucket usually already exists.
    pub async fn create_presigned_url(&self, bucket: &str, key: &str) -> Result<String, ClientError> {
        let signed = self.prepare_upload(bucket, key).await?;
        Ok(format_url(&signed))
    }

    /// Upload `body` as a CAR file to `bucket`/`key` through a presigned URL.
    ///
    /// Returns the upstream response on any 2xx status.
    pub async fn upload_car(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
    ) -> Result<TransportResponse, ClientError> {
        let mut request = self.prepare_upload(bucket, key).await?;
        request.set_header(IMPORT_HEADER, "car");
        let len = body.len();
        request.body = Some(body);

        let response = self.transport.execute(request).await?;
        let response = ensure_success("upload_car", response)?;
        info!(bucket, key, len, status = %response.status, "Uploaded CAR");
        Ok(response)
    }

    /// Check whether `key` exists in `bucket` and read its CID.
    ///
    /// Returns `(status == 200, x-amz-meta-cid)`; non-200 statuses are not errors.
    pub async fn head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<(bool, Option<String>), ClientError> {
        let request = self.virtual_host_request(Method::HEAD, bucket, Some(key))?;
        let signed = self.presigner.sign_headers(&request, PayloadMode::Buffered);

        let response = self.transport.execute(signed).await?;
        let exists = response.status == StatusCode::OK;
        let cid = response.header(CID_HEADER).map(ToOwned::to_owned);
        info!(bucket, key, exists, cid = ?cid, "Head object");
        Ok((exists, cid))
    }

    /// Fetch `key` from `bucket`.
    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<TransportResponse, ClientError> {
        let request = self.virtual_host_request(Method::GET, bucket, Some(key))?;
        let signed = self.presigner.sign_headers(&request, PayloadMode::Buffered);

        let response = self.transport.execute(signed).await?;
        let response = ensure_success("get_object", response)?;
        info!(bucket, key, len = response.body.len(), "Fetched object");
        Ok(response)
    }

    async fn prepare_upload(&self, bucket: &str, key: &str) -> Result<HttpRequest, ClientError> {
        if !self.create_bucket(bucket).await? {
            warn!(bucket, "Bucket creation did not return 200, assuming it already exists");
        }
        self.presign_upload(bucket, key)
    }

    fn virtual_host_request(
        &self,
        method: Method,
        bucket: &str,
        key: Option<&str>,
    ) -> Result<HttpRequest, ClientError> {
        let url = format!(
            "https://{bucket}.{}/{}",
            self.config.api_url,
            key.map(escape_key).unwrap_or_default()
        );
        Ok(HttpRequest::new(HttpRequestInit {
            method: Some(method),
            ..HttpRequestInit::from(parse_url(&url)?)
        }))
    }
}

/// Escape each `/`-separated segment of an object key.
fn escape_key(key: &str) -> String {
    key.trim_start_matches('/')
        .split('/')
        .map(escape_uri)
        .collect::<Vec<_>>()
        .join("/")
}

fn ensure_success(
    operation: &'static str,
    response: TransportResponse,
) -> Result<TransportResponse, ClientError> {
    if response.status.is_success() {
        return Ok(response);
    }
    warn!(operation, status = %response.status, "Upstream rejected request");
    Err(ClientError::UpstreamRejection {
        operation,
        status: response.status,
        headers: response.headers,
        body: response.body,
    })
}
