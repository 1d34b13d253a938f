//! Cross-marketplace comparison.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::info;

use super::pricing::PricingService;
use crate::client::ClientInner;
use crate::models::{Asin, ComparisonRow, Marketplace, MarketplaceComparison};

/// Fans one ASIN out to several marketplaces.
///
/// No ranking or aggregation happens here; each marketplace reports its own
/// outcome and the caller decides what a failure means.
///
/// # Example
///
/// ```no_run
/// # async fn example(client: marketfit_spapi::SpApiClient) -> marketfit_spapi::Result<()> {
/// use marketfit_spapi::{Asin, Marketplace};
///
/// let asin = Asin::new("B000123456")?;
/// let results = client
///     .compare()
///     .compare_asin(&asin, &[Marketplace::US, Marketplace::DE, Marketplace::JP])
///     .await;
///
/// for result in &results {
///     match &result.outcome {
///         Ok(Some(row)) => println!("{}: {:?} {:?}", result.marketplace, row.price, row.currency),
///         Ok(None) => println!("{}: not listed", result.marketplace),
///         Err(e) => println!("{}: failed: {}", result.marketplace, e),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct CompareService {
    inner: Arc<ClientInner>,
}

impl CompareService {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Fetch pricing for `asin` in every marketplace concurrently.
    ///
    /// Results come back in the order of `marketplaces`. Duplicates are
    /// queried once each time they appear.
    pub async fn compare_asin(
        &self,
        asin: &Asin,
        marketplaces: &[Marketplace],
    ) -> Vec<MarketplaceComparison> {
        let pricing = PricingService::new(Arc::clone(&self.inner));

        let calls = marketplaces.iter().map(|&marketplace| {
            let pricing = &pricing;
            async move {
                let outcome = pricing
                    .get_pricing(asin, marketplace)
                    .await
                    .map(|snapshot| snapshot.as_ref().map(ComparisonRow::from));
                MarketplaceComparison {
                    marketplace,
                    outcome,
                }
            }
        });
        let results = join_all(calls).await;

        info!(
            asin = %asin,
            marketplaces = results.len(),
            listed = results.iter().filter(|r| r.row().is_some()).count(),
            failed = results.iter().filter(|r| r.is_failure()).count(),
            "Comparison finished"
        );
        results
    }
}
