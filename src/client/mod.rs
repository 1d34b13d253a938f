//! HTTP client, signing pipeline and transport for the Selling Partner API.
//!
//! This module provides the main entry point [`SpApiClient`]. A call flows
//! `DraftRequest → AuthContext → SignedRequest → Transport`, with the
//! transport owning timeouts and retries.
//!
//! # Example
//!
//! ```no_run
//! use marketfit_spapi::{Asin, Marketplace, SpApiClient};
//!
//! # async fn example() -> marketfit_spapi::Result<()> {
//! let client = SpApiClient::from_env().await?;
//!
//! let asin = Asin::new("B000123456")?;
//! let pricing = client.pricing().get_pricing(&asin, Marketplace::DE).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod http;
mod request;
mod transport;

pub use config::{
    ClientConfig, LwaConfig, RetryPolicy, SpApiConfig, StsConfig, DEFAULT_LWA_TOKEN_URL,
    DEFAULT_SESSION_NAME,
};
pub use http::{SpApiClient, SpApiClientBuilder, TokenScope};
pub use request::{DraftRequest, SignedRequest};
pub use transport::{parse_retry_after, ApiResponse, Transport};
pub(crate) use http::ClientInner;
