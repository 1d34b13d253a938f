//! Request values flowing through the pipeline.

use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::Serialize;
use url::Url;

use crate::{Error, Result};

/// An unsigned SP-API request, relative to an endpoint.
///
/// # Example
///
/// ```
/// use marketfit_spapi::client::DraftRequest;
///
/// let draft = DraftRequest::get("/catalog/2022-04-01/items/B000123456")
///     .query("marketplaceIds", "ATVPDKIKX0DER")
///     .query("includedData", "summaries,salesRanks");
///
/// assert!(draft.is_idempotent());
/// assert_eq!(draft.query_pairs().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct DraftRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    content_type: Option<&'static str>,
    idempotent: bool,
}

impl DraftRequest {
    /// Create a request. GET and HEAD are idempotent by default.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let idempotent = method == Method::GET || method == Method::HEAD;
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            content_type: None,
            idempotent,
        }
    }

    /// A GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// A POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append several query parameters.
    pub fn query_pairs_from<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| Error::InvalidInput(format!("Unserializable request body: {}", e)))?;
        self.body = Some(bytes);
        self.content_type = Some("application/json");
        Ok(self)
    }

    /// Override whether the request may be repeated safely.
    pub fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the endpoint.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters in insertion order.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Request body, if any.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Content type of the body, if any.
    pub fn content_type(&self) -> Option<&'static str> {
        self.content_type
    }

    /// Whether the transport may retry this request.
    pub fn is_idempotent(&self) -> bool {
        self.idempotent
    }

    /// Resolve against `endpoint`.
    ///
    /// The query is RFC 3986 encoded so the wire form matches what gets
    /// signed.
    pub fn url(&self, endpoint: &Url) -> Result<Url> {
        if !self.path.starts_with('/') {
            return Err(Error::Signing(format!(
                "request path must start with '/': {}",
                self.path
            )));
        }
        if endpoint.cannot_be_a_base() {
            return Err(Error::Signing(format!("endpoint is not a base URL: {}", endpoint)));
        }

        let mut url = endpoint.clone();
        let base = endpoint.path().trim_end_matches('/');
        url.set_path(&format!("{}{}", base, self.path));
        url.set_fragment(None);

        if self.query.is_empty() {
            url.set_query(None);
        } else {
            let query = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query));
        }
        Ok(url)
    }
}

/// A request ready for the wire.
///
/// Holds live credentials in its headers; never logged or persisted.
#[derive(Clone)]
pub struct SignedRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: Url,
    /// Signed headers plus the `Authorization` header
    pub headers: HeaderMap,
    /// Body bytes
    pub body: Option<Vec<u8>>,
    /// Whether the transport may retry
    pub idempotent: bool,
}

impl std::fmt::Debug for SignedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &"[REDACTED]")
            .field("idempotent", &self.idempotent)
            .finish()
    }
}
