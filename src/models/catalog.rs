//! Catalog Items API (2022-04-01) models.

use serde::{Deserialize, Serialize};

use super::primitives::MarketplaceId;

/// A catalog item as returned by `GET /catalog/2022-04-01/items/{asin}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// ASIN of the item
    pub asin: String,
    /// Per-marketplace summaries
    #[serde(default)]
    pub summaries: Vec<ItemSummary>,
    /// Per-marketplace sales ranks
    #[serde(default)]
    pub sales_ranks: Vec<ItemSalesRanks>,
    /// Per-marketplace images
    #[serde(default)]
    pub images: Vec<ItemImages>,
}

impl CatalogItem {
    /// Summary for a marketplace, if the item has one there.
    pub fn summary_for(&self, marketplace_id: &MarketplaceId) -> Option<&ItemSummary> {
        self.summaries
            .iter()
            .find(|s| &s.marketplace_id == marketplace_id)
    }

    /// Item name from the first summary.
    pub fn title(&self) -> Option<&str> {
        self.summaries.iter().find_map(|s| s.item_name.as_deref())
    }

    /// Brand from the first summary that has one.
    pub fn brand(&self) -> Option<&str> {
        self.summaries.iter().find_map(|s| s.brand.as_deref())
    }

    /// Best (lowest) classification rank in a marketplace.
    pub fn best_rank(&self, marketplace_id: &MarketplaceId) -> Option<i64> {
        self.sales_ranks
            .iter()
            .filter(|r| &r.marketplace_id == marketplace_id)
            .flat_map(|r| {
                r.classification_ranks
                    .iter()
                    .map(|c| c.rank)
                    .chain(r.display_group_ranks.iter().map(|d| d.rank))
            })
            .min()
    }

    /// Link of the `MAIN` image variant in a marketplace.
    pub fn main_image(&self, marketplace_id: &MarketplaceId) -> Option<&str> {
        self.images
            .iter()
            .filter(|i| &i.marketplace_id == marketplace_id)
            .flat_map(|i| i.images.iter())
            .find(|i| i.variant.as_deref() == Some("MAIN"))
            .map(|i| i.link.as_str())
    }
}

/// Summary attributes of an item in one marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    /// Marketplace the summary applies to
    pub marketplace_id: MarketplaceId,
    /// Display name
    #[serde(default)]
    pub item_name: Option<String>,
    /// Brand
    #[serde(default)]
    pub brand: Option<String>,
    /// Manufacturer
    #[serde(default)]
    pub manufacturer: Option<String>,
    /// Model number
    #[serde(default)]
    pub model_number: Option<String>,
    /// Browse node the item is classified under
    #[serde(default)]
    pub browse_classification: Option<BrowseClassification>,
    /// `BASE_PRODUCT`, `VARIATION_PARENT`, ...
    #[serde(default)]
    pub item_classification: Option<String>,
    /// Website display group
    #[serde(default)]
    pub website_display_group_name: Option<String>,
}

/// Browse node classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseClassification {
    /// Display name
    pub display_name: String,
    /// Browse node id
    pub classification_id: String,
}

/// Sales ranks of an item in one marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSalesRanks {
    /// Marketplace the ranks apply to
    pub marketplace_id: MarketplaceId,
    /// Ranks within browse classifications
    #[serde(default)]
    pub classification_ranks: Vec<ClassificationRank>,
    /// Ranks within website display groups
    #[serde(default)]
    pub display_group_ranks: Vec<DisplayGroupRank>,
}

/// Rank within a browse classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRank {
    /// Browse node id
    pub classification_id: String,
    /// Classification title
    pub title: String,
    /// Link to the ranking page
    #[serde(default)]
    pub link: Option<String>,
    /// Rank (1 is best)
    pub rank: i64,
}

/// Rank within a website display group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayGroupRank {
    /// Display group
    pub website_display_group: String,
    /// Display group title
    pub title: String,
    /// Link to the ranking page
    #[serde(default)]
    pub link: Option<String>,
    /// Rank (1 is best)
    pub rank: i64,
}

/// Images of an item in one marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemImages {
    /// Marketplace the images apply to
    pub marketplace_id: MarketplaceId,
    /// Images
    #[serde(default)]
    pub images: Vec<ItemImage>,
}

/// A single image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemImage {
    /// `MAIN`, `PT01`, ...
    #[serde(default)]
    pub variant: Option<String>,
    /// Image URL
    pub link: String,
    /// Height in pixels
    #[serde(default)]
    pub height: Option<u32>,
    /// Width in pixels
    #[serde(default)]
    pub width: Option<u32>,
}
