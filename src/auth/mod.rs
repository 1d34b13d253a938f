//! Credential acquisition for the Selling Partner API.
//!
//! Every SP-API call needs two credentials:
//!
//! 1. **AWS credentials** from assuming the app's IAM role through STS
//!    ([`StsRoleSource`]). These sign the request with SigV4.
//! 2. **An LWA access token** from Login with Amazon ([`LwaTokenSource`]).
//!    It travels in the `x-amz-access-token` header.
//!
//! Each source is wrapped in a [`CachedProvider`], which keeps the last
//! credential and replaces it shortly before expiry. Refreshes are
//! single-flight: concurrent callers share one exchange.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use marketfit_spapi::auth::{CachedProvider, LwaTokenSource};
//! use marketfit_spapi::clock::SystemClock;
//! use marketfit_spapi::SpApiConfig;
//!
//! # async fn example() -> marketfit_spapi::Result<()> {
//! let config = SpApiConfig::from_env()?;
//! let tokens = CachedProvider::new(
//!     LwaTokenSource::new(reqwest::Client::new(), config.lwa.clone()),
//!     Arc::new(SystemClock),
//!     Duration::from_secs(60),
//! );
//!
//! let token = tokens.credential().await?;
//! println!("token valid until {}", token.expires_at());
//! # Ok(())
//! # }
//! ```

mod context;
mod credential;
mod lwa;
mod provider;
mod sts;

pub use context::AuthContext;
pub use credential::{AccessToken, AwsCredentials, Credential};
pub use lwa::{LwaGrant, LwaTokenSource, DEFAULT_TOKEN_LIFETIME_SECS};
pub use provider::{CachedProvider, CredentialSource};
pub use sts::StsRoleSource;
