//! Product Pricing API (v0) models.
//!
//! The wire types mirror `GET /products/pricing/v0/items/{asin}/offers`.
//! [`PricingSnapshot`] is the flattened view returned by the pricing client.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::primitives::MarketplaceId;

/// A currency amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Money {
    /// ISO 4217 currency code
    pub currency_code: String,
    /// Amount in the currency's major unit
    pub amount: Decimal,
}

/// Item condition filter for offer listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ItemCondition {
    /// New
    #[default]
    New,
    /// Used
    Used,
    /// Collectible
    Collectible,
    /// Refurbished
    Refurbished,
    /// Club
    Club,
}

impl ItemCondition {
    /// Value of the `ItemCondition` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCondition::New => "New",
            ItemCondition::Used => "Used",
            ItemCondition::Collectible => "Collectible",
            ItemCondition::Refurbished => "Refurbished",
            ItemCondition::Club => "Club",
        }
    }
}

impl std::fmt::Display for ItemCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope of a `getItemOffers` response.
#[derive(Debug, Clone, Deserialize)]
pub struct GetItemOffersResponse {
    /// The payload, absent when SP-API reports errors instead
    #[serde(default)]
    pub payload: Option<ItemOffersPayload>,
    /// Per-request errors
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

/// An entry of an SP-API `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Message
    #[serde(default)]
    pub message: String,
    /// Additional details
    #[serde(default)]
    pub details: Option<String>,
}

/// Offers for one ASIN in one marketplace.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemOffersPayload {
    /// ASIN the offers are for
    #[serde(rename = "ASIN")]
    pub asin: String,
    /// Marketplace id
    #[serde(rename = "marketplaceId")]
    pub marketplace_id: MarketplaceId,
    /// `Success`, `NoBuyableOffers`, ...
    pub status: String,
    /// Requested item condition
    #[serde(rename = "ItemCondition", default)]
    pub item_condition: Option<String>,
    /// Aggregated offer summary
    #[serde(rename = "Summary")]
    pub summary: OfferSummary,
    /// Top offers
    #[serde(rename = "Offers", default)]
    pub offers: Vec<Offer>,
}

/// Aggregated pricing information.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OfferSummary {
    /// Number of offers across all conditions and channels
    pub total_offer_count: u32,
    /// Offer counts per condition and fulfillment channel
    #[serde(default)]
    pub number_of_offers: Vec<OfferCount>,
    /// Lowest prices per condition and fulfillment channel
    #[serde(default)]
    pub lowest_prices: Vec<LowestPrice>,
    /// Buy box prices per condition
    #[serde(default)]
    pub buy_box_prices: Vec<BuyBoxPrice>,
    /// Manufacturer list price
    #[serde(default)]
    pub list_price: Option<Money>,
}

/// Offer count for a condition and channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OfferCount {
    /// Item condition
    pub condition: String,
    /// `Amazon` or `Merchant`
    #[serde(rename = "fulfillmentChannel")]
    pub fulfillment_channel: String,
    /// Number of offers
    #[serde(rename = "OfferCount", default)]
    pub offer_count: u32,
}

/// Lowest price for a condition and channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LowestPrice {
    /// Item condition
    pub condition: String,
    /// `Amazon` or `Merchant`
    #[serde(rename = "fulfillmentChannel")]
    pub fulfillment_channel: String,
    /// Listing price plus shipping
    #[serde(rename = "LandedPrice", default)]
    pub landed_price: Option<Money>,
    /// Listing price
    #[serde(rename = "ListingPrice")]
    pub listing_price: Money,
    /// Shipping cost
    #[serde(rename = "Shipping", default)]
    pub shipping: Option<Money>,
}

/// Buy box price for a condition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuyBoxPrice {
    /// Item condition
    pub condition: String,
    /// Listing price plus shipping
    #[serde(rename = "LandedPrice", default)]
    pub landed_price: Option<Money>,
    /// Listing price
    #[serde(rename = "ListingPrice")]
    pub listing_price: Money,
    /// Shipping cost
    #[serde(rename = "Shipping", default)]
    pub shipping: Option<Money>,
}

/// A single seller offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Offer {
    /// Seller id
    #[serde(default)]
    pub seller_id: Option<String>,
    /// `New`, `Mint`, ...
    #[serde(default)]
    pub sub_condition: Option<String>,
    /// Listing price
    pub listing_price: Money,
    /// Shipping cost
    #[serde(default)]
    pub shipping: Option<Money>,
    /// Whether this offer holds the buy box
    #[serde(default)]
    pub is_buy_box_winner: Option<bool>,
    /// Whether Amazon fulfils the offer
    #[serde(default)]
    pub is_fulfilled_by_amazon: bool,
    /// Seller feedback
    #[serde(default)]
    pub seller_feedback_rating: Option<SellerFeedbackRating>,
}

impl Offer {
    /// Listing price plus shipping.
    pub fn landed_amount(&self) -> Decimal {
        self.listing_price.amount + self.shipping.as_ref().map_or(Decimal::ZERO, |s| s.amount)
    }
}

/// Seller feedback summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SellerFeedbackRating {
    /// Positive feedback percentage (0-100)
    #[serde(default)]
    pub seller_positive_feedback_rating: Option<Decimal>,
    /// Number of ratings
    #[serde(default)]
    pub feedback_count: u64,
}

/// Pricing of one ASIN in one marketplace at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSnapshot {
    /// ASIN
    pub asin: String,
    /// Marketplace id
    pub marketplace_id: MarketplaceId,
    /// Item condition the offers were requested for
    pub item_condition: Option<String>,
    /// SP-API status, e.g. `Success` or `NoBuyableOffers`
    pub status: String,
    /// Headline price: buy box landed price, else the lowest landed price
    pub price: Option<Decimal>,
    /// Currency of `price`
    pub currency: Option<String>,
    /// Total number of offers
    pub seller_count: u32,
    /// Buy box price
    pub buy_box_price: Option<Money>,
    /// Lowest landed price across channels
    pub lowest_price: Option<Money>,
    /// Manufacturer list price
    pub list_price: Option<Money>,
    /// Top offers
    pub offers: Vec<Offer>,
    /// When the snapshot was taken
    pub fetched_at: DateTime<Utc>,
}

impl PricingSnapshot {
    /// Flatten a `getItemOffers` payload.
    pub fn from_payload(payload: ItemOffersPayload, fetched_at: DateTime<Utc>) -> Self {
        let condition = payload
            .item_condition
            .as_deref()
            .unwrap_or("New")
            .to_ascii_lowercase();

        let buy_box_price = payload
            .summary
            .buy_box_prices
            .iter()
            .find(|b| b.condition.eq_ignore_ascii_case(&condition))
            .or_else(|| payload.summary.buy_box_prices.first())
            .map(|b| landed(b.landed_price.as_ref(), &b.listing_price, b.shipping.as_ref()));

        let lowest_price = payload
            .summary
            .lowest_prices
            .iter()
            .map(|l| landed(l.landed_price.as_ref(), &l.listing_price, l.shipping.as_ref()))
            .min_by(|a, b| a.amount.cmp(&b.amount));

        let headline = buy_box_price.as_ref().or(lowest_price.as_ref());

        Self {
            price: headline.map(|m| m.amount),
            currency: headline.map(|m| m.currency_code.clone()),
            seller_count: payload.summary.total_offer_count,
            asin: payload.asin,
            marketplace_id: payload.marketplace_id,
            item_condition: payload.item_condition,
            status: payload.status,
            buy_box_price,
            lowest_price,
            list_price: payload.summary.list_price,
            offers: payload.offers,
            fetched_at,
        }
    }

    /// The offer currently holding the buy box.
    pub fn buy_box_winner(&self) -> Option<&Offer> {
        self.offers
            .iter()
            .find(|o| o.is_buy_box_winner == Some(true))
    }

    /// Whether any offer is fulfilled by Amazon.
    pub fn has_fba_offer(&self) -> bool {
        self.offers.iter().any(|o| o.is_fulfilled_by_amazon)
    }
}

fn landed(landed: Option<&Money>, listing: &Money, shipping: Option<&Money>) -> Money {
    match landed {
        Some(m) => m.clone(),
        None => Money {
            currency_code: listing.currency_code.clone(),
            amount: listing.amount + shipping.map_or(Decimal::ZERO, |s| s.amount),
        },
    }
}
