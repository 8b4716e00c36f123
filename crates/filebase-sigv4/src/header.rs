//! Header-mode signing for AWS Signature Version 4.
//!
//! Instead of embedding the signature in the URL, header signing adds
//! `X-Amz-Date`, `X-Amz-Content-Sha256` and an `Authorization` header:
//!
//! ```text
//! AWS4-HMAC-SHA256 Credential=AKID/20130524/us-east-1/s3/aws4_request,
//!   SignedHeaders=host;x-amz-content-sha256;x-amz-date,
//!   Signature=<hex-signature>
//! ```
//!
//! Every header on the request takes part in the signature except a few that
//! are rewritten in transit (see [`build_canonical_headers`]).

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::canonical::{
    build_canonical_headers, build_canonical_query_string, build_canonical_request,
};
use crate::credentials::Credentials;
use crate::presign::UNSIGNED_PAYLOAD;
use crate::request::HttpRequest;
use crate::signing::{
    ALGORITHM, SigningScope, build_string_to_sign, compute_signature, derive_signing_key,
    format_amz_date, hash_payload,
};

/// How the request payload is covered by the signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadMode {
    /// The payload is not hashed; `UNSIGNED-PAYLOAD` is signed instead.
    Unsigned,
    /// The whole in-memory body is hashed with SHA-256. A missing body hashes as empty.
    #[default]
    Buffered,
}

/// Sign `request` with an `Authorization` header as of `now`.
///
/// Sets `Host`, `X-Amz-Date` and `X-Amz-Content-Sha256` (replacing any
/// existing headers of the same name in any case), then signs every signable
/// header. The query is canonicalized the same way as for presigned URLs and
/// the path is used as stored.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use filebase_sigv4::{Credentials, HttpRequest, HttpRequestInit, PayloadMode};
/// use filebase_sigv4::header::sign_headers_at;
///
/// let request = HttpRequest::new(HttpRequestInit {
///     method: Some(http::Method::HEAD),
///     hostname: Some("bucket.s3.filebase.com".to_owned()),
///     path: Some("/hello.txt".to_owned()),
///     ..Default::default()
/// });
/// let credentials = Credentials::new("AKID", "SECRET");
/// let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
///
/// let signed = sign_headers_at(&request, &credentials, "us-east-1", PayloadMode::Buffered, now);
/// assert_eq!(signed.header("x-amz-date"), Some("20240102T030405Z"));
/// assert!(signed.header("authorization").unwrap().starts_with(
///     "AWS4-HMAC-SHA256 Credential=AKID/20240102/us-east-1/s3/aws4_request,SignedHeaders=host;x-amz-content-sha256;x-amz-date,Signature="
/// ));
/// ```
#[must_use]
pub fn sign_headers_at(
    request: &HttpRequest,
    credentials: &Credentials,
    region: &str,
    payload: PayloadMode,
    now: DateTime<Utc>,
) -> HttpRequest {
    let amz_date = format_amz_date(now);
    let scope = SigningScope::new(now, region);
    let payload_hash = match payload {
        PayloadMode::Unsigned => UNSIGNED_PAYLOAD.to_owned(),
        PayloadMode::Buffered => hash_payload(request.body.as_deref().unwrap_or_default()),
    };

    let mut signed = request.clone();
    signed.set_header("Host", request.host());
    signed.set_header("X-Amz-Date", amz_date.as_str());
    signed.set_header("X-Amz-Content-Sha256", payload_hash.as_str());

    let header_pairs: Vec<(&str, &str)> = signed
        .headers
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    let (canonical_headers, signed_headers) = build_canonical_headers(&header_pairs);
    let canonical_query = build_canonical_query_string(&signed.query);

    let canonical_request = build_canonical_request(
        signed.method.as_str(),
        &signed.path,
        &canonical_query,
        &canonical_headers,
        &signed_headers,
        &payload_hash,
    );

    debug!(canonical_request, "Built canonical request");

    let scope_str = scope.to_string();
    let string_to_sign = build_string_to_sign(&amz_date, &scope_str, &canonical_request);

    debug!(string_to_sign, "Built string to sign");

    let signing_key = derive_signing_key(
        credentials.secret_access_key(),
        &scope.date_stamp,
        &scope.region,
        scope.service,
    );
    let signature = compute_signature(&signing_key, &string_to_sign);

    let authorization = format!(
        "{ALGORITHM} Credential={}/{scope_str},SignedHeaders={signed_headers},Signature={signature}",
        credentials.access_key_id()
    );
    signed.set_header("Authorization", authorization);

    debug!(
        access_key_id = %credentials.access_key_id(),
        scope = %scope_str,
        signed_headers,
        "Signed request headers"
    );

    signed
}
