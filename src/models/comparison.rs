//! Per-marketplace comparison rows.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::marketplace::Marketplace;
use super::pricing::PricingSnapshot;
use super::primitives::MarketplaceId;

/// One marketplace's view of an ASIN, in the shape the comparison
/// endpoint serves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    /// Marketplace id
    pub marketplace_id: MarketplaceId,
    /// Headline price
    pub price: Option<Decimal>,
    /// Currency of `price`
    pub currency: Option<String>,
    /// Number of offers
    pub seller_count: u32,
    /// Average customer rating. Neither the catalog nor the pricing
    /// resource exposes it, so rows built here leave it empty.
    pub rating: Option<Decimal>,
    /// Number of customer reviews; see `rating`.
    pub review_count: Option<u64>,
}

impl From<&PricingSnapshot> for ComparisonRow {
    fn from(snapshot: &PricingSnapshot) -> Self {
        Self {
            marketplace_id: snapshot.marketplace_id.clone(),
            price: snapshot.price,
            currency: snapshot.currency.clone(),
            seller_count: snapshot.seller_count,
            rating: None,
            review_count: None,
        }
    }
}

/// Outcome of the comparison call for one marketplace.
///
/// `Ok(None)` means the ASIN is not listed there. The caller decides whether
/// an `Err` degrades the comparison or fails it.
#[derive(Debug)]
pub struct MarketplaceComparison {
    /// Marketplace queried
    pub marketplace: Marketplace,
    /// Row, absence, or failure
    pub outcome: crate::Result<Option<ComparisonRow>>,
}

impl MarketplaceComparison {
    /// The row, if the call succeeded and the item is listed.
    pub fn row(&self) -> Option<&ComparisonRow> {
        self.outcome.as_ref().ok().and_then(|r| r.as_ref())
    }

    /// Whether the call failed.
    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }
}
