//! AWS Signature Version 4 primitives.
//!
//! Everything here is pure: given the same inputs the output is
//! byte-for-byte identical, which is what lets the published AWS test-suite
//! vectors pin the implementation down.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Signing algorithm identifier.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Format of `x-amz-date`.
pub const AMZ_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

const SHORT_DATE_FORMAT: &str = "%Y%m%d";

/// Key material and scope for one signature.
#[derive(Clone, Copy)]
pub struct SigningParams<'a> {
    /// Access key id
    pub access_key_id: &'a str,
    /// Secret access key
    pub secret_access_key: &'a str,
    /// AWS region, e.g. `us-east-1`
    pub region: &'a str,
    /// AWS service, `execute-api` for SP-API
    pub service: &'a str,
    /// Signing timestamp
    pub time: DateTime<Utc>,
}

impl std::fmt::Debug for SigningParams<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningParams")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("region", &self.region)
            .field("service", &self.service)
            .field("time", &self.time)
            .finish()
    }
}

/// Intermediate and final products of a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureOutput {
    /// The canonical request that was hashed
    pub canonical_request: String,
    /// The string that was signed
    pub string_to_sign: String,
    /// Semicolon-separated signed header names
    pub signed_headers: String,
    /// Hex signature
    pub signature: String,
    /// Complete `Authorization` header value
    pub authorization: String,
}

/// Hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::Signing(format!("invalid HMAC key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derive the signing key for a date, region and service.
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Result<Vec<u8>> {
    let k_date = hmac(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?;
    let k_region = hmac(&k_date, region.as_bytes())?;
    let k_service = hmac(&k_region, service.as_bytes())?;
    hmac(&k_service, b"aws4_request")
}

/// Canonical URI: every path segment URI-encoded, `/` kept.
pub fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() || path == "/" {
        return "/".to_string();
    }
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Canonical query string: pairs RFC 3986 encoded and sorted by key, then
/// value.
pub fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            (
                urlencoding::encode(&k).into_owned(),
                urlencoding::encode(&v).into_owned(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn normalize_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical header block and signed-header list.
///
/// Names are lower-cased and values trimmed with inner whitespace runs
/// collapsed. Repeated names are joined with commas.
pub fn canonical_headers(headers: &[(&str, &str)]) -> (String, String) {
    let mut normalized: Vec<(String, String)> = headers
        .iter()
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), normalize_header_value(value)))
        .collect();
    normalized.sort_by(|a, b| a.0.cmp(&b.0));

    let mut merged: Vec<(String, String)> = Vec::with_capacity(normalized.len());
    for (name, value) in normalized {
        match merged.last_mut() {
            Some(last) if last.0 == name => {
                last.1.push(',');
                last.1.push_str(&value);
            }
            _ => merged.push((name, value)),
        }
    }

    let canonical = merged
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect::<String>();
    let signed = merged
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");
    (canonical, signed)
}

/// Sign a request.
///
/// `headers` must contain every header to be signed, including `host` and
/// `x-amz-date`.
pub fn sign(
    params: &SigningParams<'_>,
    method: &str,
    url: &Url,
    headers: &[(&str, &str)],
    payload: &[u8],
) -> Result<SignatureOutput> {
    let (canonical_headers, signed_headers) = canonical_headers(headers);

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method.to_ascii_uppercase(),
        canonical_uri(url),
        canonical_query(url),
        canonical_headers,
        signed_headers,
        sha256_hex(payload),
    );

    let amz_date = params.time.format(AMZ_DATE_FORMAT).to_string();
    let short_date = params.time.format(SHORT_DATE_FORMAT).to_string();
    let scope = format!(
        "{}/{}/{}/aws4_request",
        short_date, params.region, params.service
    );

    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        sha256_hex(canonical_request.as_bytes()),
    );

    let key = signing_key(
        params.secret_access_key,
        &short_date,
        params.region,
        params.service,
    )?;
    let signature = hex::encode(hmac(&key, string_to_sign.as_bytes())?);

    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM, params.access_key_id, scope, signed_headers, signature
    );

    Ok(SignatureOutput {
        canonical_request,
        string_to_sign,
        signed_headers,
        signature,
        authorization,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

    fn suite_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap()
    }

    #[test]
    fn test_signing_key_vector() {
        let key = signing_key(SECRET, "20120215", "us-east-1", "iam").unwrap();
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_get_vanilla() {
        let params = SigningParams {
            access_key_id: "AKIDEXAMPLE",
            secret_access_key: SECRET,
            region: "us-east-1",
            service: "service",
            time: suite_time(),
        };
        let url = Url::parse("https://example.amazonaws.com/").unwrap();
        let output = sign(
            &params,
            "GET",
            &url,
            &[("Host", "example.amazonaws.com"), ("X-Amz-Date", "20150830T123600Z")],
            b"",
        )
        .unwrap();

        assert_eq!(
            output.canonical_request,
            "GET\n/\n\nhost:example.amazonaws.com\nx-amz-date:20150830T123600Z\n\nhost;x-amz-date\n\
             e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            output.signature,
            "5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );
        assert_eq!(
            output.authorization,
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
             SignedHeaders=host;x-amz-date, \
             Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );
    }

    #[test]
    fn test_iam_list_users() {
        let params = SigningParams {
            access_key_id: "AKIDEXAMPLE",
            secret_access_key: SECRET,
            region: "us-east-1",
            service: "iam",
            time: suite_time(),
        };
        let url = Url::parse("https://iam.amazonaws.com/?Action=ListUsers&Version=2010-05-08")
            .unwrap();
        let output = sign(
            &params,
            "GET",
            &url,
            &[
                ("Content-Type", "application/x-www-form-urlencoded; charset=utf-8"),
                ("Host", "iam.amazonaws.com"),
                ("X-Amz-Date", "20150830T123600Z"),
            ],
            b"",
        )
        .unwrap();

        assert_eq!(output.signed_headers, "content-type;host;x-amz-date");
        assert_eq!(
            output.signature,
            "5d672d79c15b13162d9279b0855cfba6789a8edb4c82c400e06b5924a6f2b5d7"
        );
    }

    #[test]
    fn test_canonical_query_sorts_and_encodes() {
        let url = Url::parse("https://host/?b=2&a=z&a=y&includedData=summaries,salesRanks&q=a%20b")
            .unwrap();
        assert_eq!(
            canonical_query(&url),
            "a=y&a=z&b=2&includedData=summaries%2CsalesRanks&q=a%20b"
        );
    }

    #[test]
    fn test_canonical_uri_encodes_segments() {
        let url = Url::parse("https://host/catalog/2022-04-01/items/B000123456").unwrap();
        assert_eq!(canonical_uri(&url), "/catalog/2022-04-01/items/B000123456");

        let url = Url::parse("https://host").unwrap();
        assert_eq!(canonical_uri(&url), "/");

        let url = Url::parse("https://host/a b/c").unwrap();
        assert_eq!(canonical_uri(&url), "/a%2520b/c");
    }

    #[test]
    fn test_canonical_headers_normalize() {
        let (canonical, signed) = canonical_headers(&[
            ("X-Amz-Date", "20150830T123600Z"),
            ("My-Header1", "  a   b   c  "),
            ("host", "example.amazonaws.com"),
            ("my-header1", "d"),
        ]);
        assert_eq!(
            canonical,
            "host:example.amazonaws.com\nmy-header1:a b c,d\nx-amz-date:20150830T123600Z\n"
        );
        assert_eq!(signed, "host;my-header1;x-amz-date");
    }
}
