//! Request signing for SP-API calls.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use secrecy::ExposeSecret;
use tracing::debug;

use super::sigv4::{self, SigningParams, AMZ_DATE_FORMAT};
use crate::auth::AuthContext;
use crate::client::{DraftRequest, SignedRequest};
use crate::{Error, Result};

/// AWS service name SP-API is signed under.
pub const SERVICE: &str = "execute-api";

const X_AMZ_DATE: &str = "x-amz-date";
const X_AMZ_ACCESS_TOKEN: &str = "x-amz-access-token";
const X_AMZ_SECURITY_TOKEN: &str = "x-amz-security-token";

/// Turns a [`DraftRequest`] into a [`SignedRequest`].
///
/// Signing is pure: no I/O, and the timestamp is an input.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    service: String,
}

impl Default for RequestSigner {
    fn default() -> Self {
        Self::new(SERVICE)
    }
}

impl RequestSigner {
    /// Create a signer for `service`.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Sign `draft` with the credentials in `ctx` as of `now`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] if either credential has expired at `now`
    /// or the draft does not resolve to a URL.
    pub fn sign(
        &self,
        ctx: &AuthContext,
        draft: &DraftRequest,
        now: DateTime<Utc>,
    ) -> Result<SignedRequest> {
        if ctx.aws.is_expired_at(now) {
            return Err(Error::Signing(format!(
                "AWS credentials expired at {}",
                ctx.aws.expires_at()
            )));
        }
        if ctx.token.is_expired_at(now) {
            return Err(Error::Signing(format!(
                "LWA access token expired at {}",
                ctx.token.expires_at()
            )));
        }

        let url = draft.url(&ctx.endpoint)?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(Error::Signing(format!("URL has no host: {}", url))),
        };

        let aws = ctx.aws.secret();
        let amz_date = now.format(AMZ_DATE_FORMAT).to_string();
        let access_token = ctx.token.secret().expose();
        let session_token = aws.session_token.as_ref().map(|t| t.expose_secret());

        let mut to_sign: Vec<(&str, &str)> = vec![
            ("host", host.as_str()),
            (X_AMZ_DATE, amz_date.as_str()),
            (X_AMZ_ACCESS_TOKEN, access_token),
        ];
        if let Some(token) = session_token {
            to_sign.push((X_AMZ_SECURITY_TOKEN, token));
        }
        if let Some(content_type) = draft.content_type() {
            to_sign.push(("content-type", content_type));
        }

        let params = SigningParams {
            access_key_id: &aws.access_key_id,
            secret_access_key: aws.secret_access_key.expose_secret(),
            region: &ctx.region,
            service: &self.service,
            time: now,
        };
        let output = sigv4::sign(
            &params,
            draft.method().as_str(),
            &url,
            &to_sign,
            draft.body().unwrap_or_default(),
        )?;

        debug!(
            method = %draft.method(),
            path = %url.path(),
            signed_headers = %output.signed_headers,
            "Signed request"
        );

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, header_value(&output.authorization)?);
        headers.insert(HeaderName::from_static(X_AMZ_DATE), header_value(&amz_date)?);
        headers.insert(
            HeaderName::from_static(X_AMZ_ACCESS_TOKEN),
            sensitive(access_token)?,
        );
        if let Some(token) = session_token {
            headers.insert(HeaderName::from_static(X_AMZ_SECURITY_TOKEN), sensitive(token)?);
        }
        if let Some(content_type) = draft.content_type() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }

        Ok(SignedRequest {
            method: draft.method().clone(),
            url,
            headers,
            body: draft.body().map(<[u8]>::to_vec),
            idempotent: draft.is_idempotent(),
        })
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| Error::Signing("header value contains invalid characters".to_string()))
}

fn sensitive(value: &str) -> Result<HeaderValue> {
    let mut value = header_value(value)?;
    value.set_sensitive(true);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AccessToken, AwsCredentials, Credential};
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;
    use url::Url;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 9, 30, 0).unwrap()
    }

    fn context(session_token: Option<&str>, endpoint: &str) -> AuthContext {
        AuthContext::new(
            Arc::new(Credential::new(
                AwsCredentials::new(
                    "AKIDEXAMPLE",
                    "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
                    session_token.map(str::to_string),
                ),
                now() + Duration::hours(1),
            )),
            Arc::new(Credential::new(
                AccessToken::new("Atza|token"),
                now() + Duration::hours(1),
            )),
            "us-east-1",
            Url::parse(endpoint).unwrap(),
        )
    }

    fn draft() -> DraftRequest {
        DraftRequest::get("/products/pricing/v0/items/B000123456/offers")
            .query("MarketplaceId", "ATVPDKIKX0DER")
            .query("ItemCondition", "New")
    }

    #[test]
    fn test_headers_attached() {
        let ctx = context(Some("session"), "https://sellingpartnerapi-na.amazon.com");
        let signed = RequestSigner::default().sign(&ctx, &draft(), now()).unwrap();

        assert_eq!(signed.headers[X_AMZ_DATE], "20240201T093000Z");
        assert_eq!(signed.headers[X_AMZ_ACCESS_TOKEN], "Atza|token");
        assert_eq!(signed.headers[X_AMZ_SECURITY_TOKEN], "session");

        let auth = signed.headers[AUTHORIZATION].to_str().unwrap();
        assert!(auth.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240201/us-east-1/execute-api/aws4_request, "
        ));
        assert!(auth.contains("SignedHeaders=host;x-amz-access-token;x-amz-date;x-amz-security-token,"));
        assert!(signed.idempotent);
    }

    #[test]
    fn test_no_session_token_header_without_token() {
        let ctx = context(None, "https://sellingpartnerapi-na.amazon.com");
        let signed = RequestSigner::default().sign(&ctx, &draft(), now()).unwrap();

        assert!(signed.headers.get(X_AMZ_SECURITY_TOKEN).is_none());
        let auth = signed.headers[AUTHORIZATION].to_str().unwrap();
        assert!(auth.contains("SignedHeaders=host;x-amz-access-token;x-amz-date,"));
    }

    #[test]
    fn test_deterministic() {
        let ctx = context(Some("session"), "https://sellingpartnerapi-na.amazon.com");
        let signer = RequestSigner::default();
        let a = signer.sign(&ctx, &draft(), now()).unwrap();
        let b = signer.sign(&ctx, &draft(), now()).unwrap();
        assert_eq!(a.headers[AUTHORIZATION], b.headers[AUTHORIZATION]);

        let later = signer.sign(&ctx, &draft(), now() + Duration::seconds(1)).unwrap();
        assert_ne!(a.headers[AUTHORIZATION], later.headers[AUTHORIZATION]);
    }

    #[test]
    fn test_expired_credentials_rejected() {
        let ctx = context(None, "https://sellingpartnerapi-na.amazon.com");
        let err = RequestSigner::default()
            .sign(&ctx, &draft(), now() + Duration::hours(2))
            .unwrap_err();
        assert!(matches!(err, Error::Signing(ref m) if m.contains("AWS credentials expired")));

        let mut ctx = context(None, "https://sellingpartnerapi-na.amazon.com");
        ctx.token = Arc::new(Credential::new(AccessToken::new("old"), now()));
        let err = RequestSigner::default().sign(&ctx, &draft(), now()).unwrap_err();
        assert!(matches!(err, Error::Signing(ref m) if m.contains("LWA access token expired")));
    }

    #[test]
    fn test_debug_does_not_leak_headers() {
        let ctx = context(Some("session"), "http://127.0.0.1:9000");
        let signed = RequestSigner::default().sign(&ctx, &draft(), now()).unwrap();
        let debug = format!("{:?}", signed);
        assert!(!debug.contains("Atza|token"));
        assert_eq!(signed.url.port(), Some(9000));
    }
}
