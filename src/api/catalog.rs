//! Catalog Items service.

use std::sync::Arc;

use crate::client::{ClientInner, DraftRequest, TokenScope};
use crate::models::{Asin, CatalogItem, Marketplace};
use crate::Result;

/// Datasets requested by [`CatalogService::lookup_item`].
pub const DEFAULT_INCLUDED_DATA: &[&str] = &["summaries", "salesRanks"];

/// Service for the Catalog Items API (2022-04-01).
///
/// # Example
///
/// ```no_run
/// # async fn example(client: marketfit_spapi::SpApiClient) -> marketfit_spapi::Result<()> {
/// use marketfit_spapi::{Asin, Marketplace};
///
/// let asin = Asin::new("B000123456")?;
/// match client.catalog().lookup_item(&asin, Marketplace::UK).await? {
///     Some(item) => println!("{:?} by {:?}", item.title(), item.brand()),
///     None => println!("{} is not listed in the UK", asin),
/// }
/// # Ok(())
/// # }
/// ```
pub struct CatalogService {
    inner: Arc<ClientInner>,
}

impl CatalogService {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Look up an item's summaries and sales ranks.
    ///
    /// Returns `Ok(None)` if the ASIN does not exist in the marketplace.
    pub async fn lookup_item(
        &self,
        asin: &Asin,
        marketplace: Marketplace,
    ) -> Result<Option<CatalogItem>> {
        self.lookup_item_with(asin, marketplace, DEFAULT_INCLUDED_DATA)
            .await
    }

    /// Look up an item with an explicit `includedData` list,
    /// e.g. `&["summaries", "images"]`.
    pub async fn lookup_item_with(
        &self,
        asin: &Asin,
        marketplace: Marketplace,
        included_data: &[&str],
    ) -> Result<Option<CatalogItem>> {
        let mut draft = DraftRequest::get(format!("/catalog/2022-04-01/items/{}", asin))
            .query("marketplaceIds", marketplace.target().id);
        if !included_data.is_empty() {
            draft = draft.query("includedData", included_data.join(","));
        }

        self.inner
            .get_json(&draft, &TokenScope::Seller, marketplace.region())
            .await
            .map_err(|e| e.in_call("catalog.lookup_item", asin.as_str(), marketplace.target().id))
    }
}
