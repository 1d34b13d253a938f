//! API service modules for SP-API resources.
//!
//! Each service provides methods for one SP-API resource and is obtained
//! from [`SpApiClient`](crate::SpApiClient).

mod catalog;
mod compare;
mod pricing;

pub use catalog::{CatalogService, DEFAULT_INCLUDED_DATA};
pub use compare::CompareService;
pub use pricing::PricingService;
