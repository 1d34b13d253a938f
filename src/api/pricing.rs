//! Product Pricing service.

use std::sync::Arc;

use tracing::debug;

use crate::client::{ClientInner, DraftRequest, TokenScope};
use crate::models::{Asin, GetItemOffersResponse, ItemCondition, Marketplace, PricingSnapshot};
use crate::{Error, Result};

/// Service for the Product Pricing API (v0).
///
/// # Example
///
/// ```no_run
/// # async fn example(client: marketfit_spapi::SpApiClient) -> marketfit_spapi::Result<()> {
/// use marketfit_spapi::{Asin, Marketplace};
///
/// let asin = Asin::new("B000123456")?;
/// if let Some(snapshot) = client.pricing().get_pricing(&asin, Marketplace::US).await? {
///     println!(
///         "{} sellers, headline {:?} {:?}",
///         snapshot.seller_count, snapshot.price, snapshot.currency
///     );
/// }
/// # Ok(())
/// # }
/// ```
pub struct PricingService {
    inner: Arc<ClientInner>,
}

impl PricingService {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Get offers for new items.
    ///
    /// Returns `Ok(None)` if the item has no offer data in the marketplace.
    pub async fn get_pricing(
        &self,
        asin: &Asin,
        marketplace: Marketplace,
    ) -> Result<Option<PricingSnapshot>> {
        self.get_pricing_for_condition(asin, marketplace, ItemCondition::New)
            .await
    }

    /// Get offers for a specific item condition.
    pub async fn get_pricing_for_condition(
        &self,
        asin: &Asin,
        marketplace: Marketplace,
        condition: ItemCondition,
    ) -> Result<Option<PricingSnapshot>> {
        let marketplace_id = marketplace.target().id;
        let draft = DraftRequest::get(format!("/products/pricing/v0/items/{}/offers", asin))
            .query("MarketplaceId", marketplace_id)
            .query("ItemCondition", condition.as_str());

        self.fetch(&draft, marketplace)
            .await
            .map_err(|e| e.in_call("pricing.get_pricing", asin.as_str(), marketplace_id))
    }

    async fn fetch(
        &self,
        draft: &DraftRequest,
        marketplace: Marketplace,
    ) -> Result<Option<PricingSnapshot>> {
        let response: Option<GetItemOffersResponse> = self
            .inner
            .get_json(draft, &TokenScope::Seller, marketplace.region())
            .await?;

        let Some(response) = response else {
            return Ok(None);
        };

        if let Some(first) = response.errors.first() {
            if response
                .errors
                .iter()
                .any(|e| e.code.eq_ignore_ascii_case("NotFound"))
            {
                debug!(marketplace = %marketplace, "Pricing reports item not found");
                return Ok(None);
            }
            return Err(Error::Parse(format!(
                "pricing response carried errors: {}: {}",
                first.code, first.message
            )));
        }

        Ok(response
            .payload
            .map(|payload| PricingSnapshot::from_payload(payload, self.inner.now())))
    }
}
