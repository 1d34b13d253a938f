//! Data models for the Selling Partner API.
//!
//! Models are organized by domain:
//!
//! - [`primitives`] - Core types like `Asin`, `MarketplaceId`, `SellingRegion`
//! - [`marketplace`] - The static marketplace table
//! - [`catalog`] - Catalog Items API models
//! - [`pricing`] - Product Pricing API models and `PricingSnapshot`
//! - [`comparison`] - Per-marketplace comparison rows

pub mod primitives;
pub mod marketplace;
pub mod catalog;
pub mod pricing;
pub mod comparison;

// Re-export commonly used types
pub use primitives::*;
pub use marketplace::*;
pub use catalog::*;
pub use pricing::*;
pub use comparison::*;
