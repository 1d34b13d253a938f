//! Error types for the SP-API client.
//!
//! Every failure the pipeline can produce is a variant of [`Error`]. A
//! resource that does not exist is *not* an error: typed resource clients
//! return `Ok(None)` for it.

use thiserror::Error;

/// A specialized `Result` type for SP-API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for all SP-API operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Credential acquisition failed (STS role assumption or LWA exchange).
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A request was signed with a missing or expired credential.
    ///
    /// Providers refresh before expiry, so this indicates a contract
    /// violation rather than a transient condition.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Network failure or retry exhaustion.
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportFailure),

    /// SP-API answered with a non-retryable 4xx.
    #[error("Client error: status={status}, code={code:?}, message={message}")]
    Client {
        /// HTTP status code
        status: u16,
        /// First error code from the SP-API error envelope, if any
        code: Option<String>,
        /// Human-readable message
        message: String,
        /// Raw response body
        body: String,
    },

    /// The response body did not match the expected schema.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input provided to a function.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP client construction failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// A lower-level failure annotated with the resource call it broke.
    #[error("{operation} failed for ASIN {asin} in {marketplace_id}: {source}")]
    Call {
        /// Operation name, e.g. `catalog.lookup_item`
        operation: &'static str,
        /// ASIN being requested
        asin: String,
        /// Marketplace id being requested
        marketplace_id: String,
        /// The underlying failure
        #[source]
        source: Box<Error>,
    },
}

/// Failure classes reported by the transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// Every attempt hit a retryable condition.
    #[error("retries exhausted after {attempts} attempt(s): {last_error}")]
    RetriesExhausted {
        /// Attempts made
        attempts: u32,
        /// Status of the last response, if one was received
        status: Option<u16>,
        /// Description of the last failure
        last_error: String,
    },

    /// A failure the retry policy does not cover.
    #[error("non-retryable failure: {reason}")]
    NonRetryable {
        /// Status of the response, if one was received
        status: Option<u16>,
        /// Description of the failure
        reason: String,
    },
}

impl Error {
    /// Strips any [`Error::Call`] context and returns the underlying error.
    pub fn root(&self) -> &Error {
        match self {
            Error::Call { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns `true` if repeating the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self.root() {
            Error::Transport(TransportFailure::RetriesExhausted { .. }) => true,
            Error::Client { status, .. } => *status == 429,
            _ => false,
        }
    }

    /// Returns `true` if this is an authentication-related error.
    pub fn is_auth_error(&self) -> bool {
        match self.root() {
            Error::Auth(_) | Error::Signing(_) => true,
            Error::Client { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }

    /// Returns `true` if this error indicates a caller-side issue.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.root(),
            Error::Client { .. } | Error::InvalidInput(_) | Error::Config(_)
        )
    }

    /// HTTP status attached to the underlying failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self.root() {
            Error::Client { status, .. } => Some(*status),
            Error::Transport(TransportFailure::RetriesExhausted { status, .. })
            | Error::Transport(TransportFailure::NonRetryable { status, .. }) => *status,
            _ => None,
        }
    }

    /// Wrap this error with resource-call context.
    pub(crate) fn in_call(
        self,
        operation: &'static str,
        asin: impl Into<String>,
        marketplace_id: impl Into<String>,
    ) -> Self {
        Error::Call {
            operation,
            asin: asin.into(),
            marketplace_id: marketplace_id.into(),
            source: Box::new(self),
        }
    }

    /// Build a client error from an SP-API error response.
    ///
    /// SP-API wraps errors as `{"errors": [{"code": ..., "message": ...}]}`.
    pub(crate) fn from_api_response(status: u16, body: String) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(&body).ok();
        let first = parsed
            .as_ref()
            .and_then(|v| v.get("errors"))
            .and_then(|e| e.get(0));

        let code = first
            .and_then(|e| e.get("code"))
            .and_then(|c| c.as_str())
            .map(String::from);

        let message = first
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(String::from)
            .unwrap_or_else(|| format!("HTTP {}", status));

        Error::Client {
            status,
            code,
            message,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        let exhausted = Error::Transport(TransportFailure::RetriesExhausted {
            attempts: 3,
            status: Some(503),
            last_error: "HTTP 503".into(),
        });
        assert!(exhausted.is_retryable());
        assert!(!Error::Parse("bad".into()).is_retryable());
        assert!(!Error::Transport(TransportFailure::NonRetryable {
            status: Some(501),
            reason: "HTTP 501".into(),
        })
        .is_retryable());
    }

    #[test]
    fn test_error_auth() {
        assert!(Error::Auth("lwa".into()).is_auth_error());
        assert!(Error::Signing("expired".into()).is_auth_error());
        assert!(Error::from_api_response(403, String::new()).is_auth_error());
        assert!(!Error::Parse("x".into()).is_auth_error());
    }

    #[test]
    fn test_from_api_response() {
        let body = serde_json::json!({
            "errors": [{
                "code": "InvalidInput",
                "message": "Invalid ASIN",
                "details": ""
            }]
        })
        .to_string();

        match Error::from_api_response(400, body) {
            Error::Client {
                status,
                code,
                message,
                ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(code.as_deref(), Some("InvalidInput"));
                assert_eq!(message, "Invalid ASIN");
            }
            other => panic!("Expected Client error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_api_response_non_json_body() {
        match Error::from_api_response(418, "teapot".into()) {
            Error::Client { code, message, body, .. } => {
                assert_eq!(code, None);
                assert_eq!(message, "HTTP 418");
                assert_eq!(body, "teapot");
            }
            other => panic!("Expected Client error, got {:?}", other),
        }
    }

    #[test]
    fn test_call_context_root() {
        let err = Error::from_api_response(400, String::new()).in_call(
            "pricing.get_pricing",
            "B000123456",
            "ATVPDKIKX0DER",
        );
        assert!(matches!(err.root(), Error::Client { status: 400, .. }));
        assert_eq!(err.status(), Some(400));
        assert!(err.is_client_error());
        let text = err.to_string();
        assert!(text.contains("pricing.get_pricing"));
        assert!(text.contains("B000123456"));
    }
}
