//! # marketfit-spapi
//!
//! An authenticated request pipeline for Amazon's Selling Partner API.
//!
//! Every SP-API call needs AWS credentials from an assumed IAM role and a
//! Login with Amazon access token. This crate acquires and caches both,
//! signs each request with AWS Signature Version 4, and sends it through a
//! transport with timeouts and bounded, jittered retries.
//!
//! ## Features
//!
//! - **Credentials**: STS role assumption and LWA token exchange, cached and
//!   refreshed ahead of expiry with single-flight refresh
//! - **Signing**: SigV4 for the `execute-api` service
//! - **Transport**: retries on throttling and transient server errors,
//!   honouring `Retry-After`
//! - **Resources**: typed Catalog Items and Product Pricing clients, plus a
//!   concurrent cross-marketplace comparison
//! - **Async-first**: built on Tokio; the client is cheap to clone and share
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use marketfit_spapi::{Asin, Marketplace, SpApiClient};
//!
//! #[tokio::main]
//! async fn main() -> marketfit_spapi::Result<()> {
//!     // Reads ROLE_ARN, REGION, LWA_CLIENT_ID, LWA_CLIENT_SECRET and
//!     // LWA_REFRESH_TOKEN, from `.env` if present.
//!     let client = SpApiClient::from_env().await?;
//!     let asin = Asin::new("B000123456")?;
//!
//!     match client.pricing().get_pricing(&asin, Marketplace::US).await? {
//!         Some(snapshot) => println!(
//!             "{} offers, price {:?} {:?}",
//!             snapshot.seller_count, snapshot.price, snapshot.currency
//!         ),
//!         None => println!("{} has no offers in the US", asin),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Comparing Marketplaces
//!
//! ```rust,no_run
//! use marketfit_spapi::{Asin, Marketplace, SpApiClient};
//!
//! #[tokio::main]
//! async fn main() -> marketfit_spapi::Result<()> {
//!     let client = SpApiClient::from_env().await?;
//!     let asin = Asin::new("B000123456")?;
//!
//!     let europe: Vec<Marketplace> =
//!         Marketplace::in_region(marketfit_spapi::SellingRegion::Europe).collect();
//!     for result in client.compare().compare_asin(&asin, &europe).await {
//!         if let Some(row) = result.row() {
//!             println!("{}: {:?} {:?}", result.marketplace, row.price, row.currency);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod api;
pub mod auth;
pub mod client;
pub mod clock;
pub mod error;
pub mod models;
pub mod signing;

// Re-export primary types at crate root for convenience
pub use error::{Error, Result};
pub use models::{Asin, Marketplace, MarketplaceId, SellingRegion};
pub use client::{ClientConfig, RetryPolicy, SpApiClient, SpApiConfig};

/// Prelude module for convenient imports.
///
/// ```rust
/// use marketfit_spapi::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result, TransportFailure};
    pub use crate::models::{
        // Primitives
        Asin, MarketplaceId, SellingRegion,
        // Marketplaces
        Marketplace, MarketplaceTarget,
        // Resource models
        CatalogItem, ItemCondition, PricingSnapshot, Money,
        ComparisonRow, MarketplaceComparison,
    };
    pub use crate::client::{
        ClientConfig, DraftRequest, RetryPolicy, SpApiClient, SpApiConfig, TokenScope,
    };
}
