//! Signing-key derivation and signature computation.
//!
//! These are the cryptographic steps shared by query-string presigning and
//! header signing:
//!
//! 1. Hash the canonical request with SHA-256.
//! 2. Build the string to sign from the timestamp, credential scope, and that hash.
//! 3. Derive the signing key with a four-step HMAC-SHA256 chain.
//! 4. HMAC the string to sign with the signing key and hex-encode the result.

use std::fmt;

use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};

use crate::credentials::SecretKey;

/// The only algorithm supported by this implementation.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// The service identifier every signature is scoped to.
pub const SERVICE: &str = "s3";

/// The terminator of every credential scope.
const SCOPE_TERMINATOR: &str = "aws4_request";

type HmacSha256 = Hmac<Sha256>;

/// The date/region/service scope a signing key is valid for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningScope {
    /// The date component (YYYYMMDD).
    pub date_stamp: String,
    /// The region name.
    pub region: String,
    /// The service name, always [`SERVICE`].
    pub service: &'static str,
}

impl SigningScope {
    /// Build the scope for a signing instant and region.
    #[must_use]
    pub fn new(now: DateTime<Utc>, region: &str) -> Self {
        Self {
            date_stamp: format_date_stamp(now),
            region: region.to_owned(),
            service: SERVICE,
        }
    }
}

impl fmt::Display for SigningScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{SCOPE_TERMINATOR}",
            self.date_stamp, self.region, self.service
        )
    }
}

/// Format an instant as an ISO 8601 basic timestamp (`YYYYMMDDTHHMMSSZ`).
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use filebase_sigv4::signing::format_amz_date;
///
/// let now = Utc.with_ymd_and_hms(2013, 5, 24, 0, 0, 0).unwrap();
/// assert_eq!(format_amz_date(now), "20130524T000000Z");
/// ```
#[must_use]
pub fn format_amz_date(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Format an instant as a date stamp (`YYYYMMDD`).
#[must_use]
pub fn format_date_stamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d").to_string()
}

/// Build the SigV4 string to sign.
///
/// Format:
/// ```text
/// AWS4-HMAC-SHA256\n
/// <ISO8601 timestamp>\n
/// <credential_scope>\n
/// <hex(SHA256(canonical_request))>
/// ```
///
/// # Examples
///
/// ```
/// use filebase_sigv4::signing::build_string_to_sign;
///
/// let sts = build_string_to_sign(
///     "20130524T000000Z",
///     "20130524/us-east-1/s3/aws4_request",
///     "GET\n/test.txt\n\nhost:examplebucket.s3.amazonaws.com\n\nhost\nUNSIGNED-PAYLOAD",
/// );
/// assert!(sts.starts_with("AWS4-HMAC-SHA256\n20130524T000000Z\n"));
/// ```
#[must_use]
pub fn build_string_to_sign(timestamp: &str, credential_scope: &str, canonical_request: &str) -> String {
    let canonical_hash = hash_payload(canonical_request.as_bytes());
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_hash}")
}

/// Derive the SigV4 signing key using the HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
///
/// Every intermediate key, and the returned key, is zeroed when dropped.
///
/// # Examples
///
/// ```
/// use filebase_sigv4::SecretKey;
/// use filebase_sigv4::signing::derive_signing_key;
///
/// let secret = SecretKey::new("wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY");
/// let key = derive_signing_key(&secret, "20130524", "us-east-1", "s3");
/// assert_eq!(key.expose().len(), 32);
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &SecretKey, date: &str, region: &str, service: &str) -> SecretKey {
    let mut seed = Vec::with_capacity(4 + secret_key.expose().len());
    seed.extend_from_slice(b"AWS4");
    seed.extend_from_slice(secret_key.expose());
    let seed = SecretKey::from(seed);

    let date_key = SecretKey::from(hmac_sha256(seed.expose(), date.as_bytes()));
    let date_region_key = SecretKey::from(hmac_sha256(date_key.expose(), region.as_bytes()));
    let date_region_service_key =
        SecretKey::from(hmac_sha256(date_region_key.expose(), service.as_bytes()));
    SecretKey::from(hmac_sha256(
        date_region_service_key.expose(),
        SCOPE_TERMINATOR.as_bytes(),
    ))
}

/// Compute the HMAC-SHA256 signature of `data` using the given `signing_key`.
///
/// Returns the lowercase hex-encoded signature.
#[must_use]
pub fn compute_signature(signing_key: &SecretKey, data: &str) -> String {
    let sig = hmac_sha256(signing_key.expose(), data.as_bytes());
    hex::encode(sig)
}

/// Compute HMAC-SHA256 and return the raw bytes.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Compute the SHA-256 hash of the given payload and return it as a lowercase hex string.
///
/// # Examples
///
/// ```
/// use filebase_sigv4::signing::hash_payload;
///
/// // SHA-256 of empty payload
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const TEST_SECRET_KEY: &str = "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY";

    #[test]
    fn test_should_derive_32_byte_signing_key() {
        let key = derive_signing_key(&SecretKey::new(TEST_SECRET_KEY), "20130524", "us-east-1", "s3");
        assert_eq!(key.expose().len(), 32);
    }

    #[test]
    fn test_should_derive_distinct_keys_per_scope() {
        let secret = SecretKey::new(TEST_SECRET_KEY);
        let a = derive_signing_key(&secret, "20130524", "us-east-1", "s3");
        let b = derive_signing_key(&secret, "20130525", "us-east-1", "s3");
        let c = derive_signing_key(&secret, "20130524", "eu-west-1", "s3");
        assert_ne!(a.expose(), b.expose());
        assert_ne!(a.expose(), c.expose());
    }

    #[test]
    fn test_should_format_scope() {
        let now = Utc.with_ymd_and_hms(2013, 5, 24, 12, 30, 45).unwrap();
        let scope = SigningScope::new(now, "us-east-1");
        assert_eq!(scope.to_string(), "20130524/us-east-1/s3/aws4_request");
        assert_eq!(format_amz_date(now), "20130524T123045Z");
    }

    #[test]
    fn test_should_build_string_to_sign_matching_aws_example() {
        let canonical_request = "GET\n\
            /test.txt\n\
            \n\
            host:examplebucket.s3.amazonaws.com\n\
            range:bytes=0-9\n\
            x-amz-content-sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855\n\
            x-amz-date:20130524T000000Z\n\
            \n\
            host;range;x-amz-content-sha256;x-amz-date\n\
            e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        let sts = build_string_to_sign(
            "20130524T000000Z",
            "20130524/us-east-1/s3/aws4_request",
            canonical_request,
        );
        let expected = "AWS4-HMAC-SHA256\n\
                        20130524T000000Z\n\
                        20130524/us-east-1/s3/aws4_request\n\
                        7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972";
        assert_eq!(sts, expected);
    }

    #[test]
    fn test_should_compute_correct_signature_for_aws_get_object_example() {
        let signing_key =
            derive_signing_key(&SecretKey::new(TEST_SECRET_KEY), "20130524", "us-east-1", "s3");

        let string_to_sign = "AWS4-HMAC-SHA256\n\
                              20130524T000000Z\n\
                              20130524/us-east-1/s3/aws4_request\n\
                              7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972";

        let signature = compute_signature(&signing_key, string_to_sign);
        assert_eq!(
            signature,
            "f0e8bdb87c964420e857bd35b5d6ed310bd44f0170aba48dd91039c6036bdb41"
        );
    }

    #[test]
    fn test_should_hash_nonempty_payload() {
        let hash = hash_payload(b"Hello, World!");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash.to_lowercase());
    }
}
