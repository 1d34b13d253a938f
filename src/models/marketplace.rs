//! Static marketplace table.
//!
//! Maps short storefront codes (`US`, `DE`, ...) to their SP-API marketplace
//! id, selling region and default currency.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::primitives::{MarketplaceId, SellingRegion};
use crate::Error;

/// One row of the marketplace table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketplaceTarget {
    /// Marketplace enum value
    pub marketplace: Marketplace,
    /// Short storefront code, e.g. `US`
    pub code: &'static str,
    /// SP-API marketplace id, e.g. `ATVPDKIKX0DER`
    pub id: &'static str,
    /// Selling region hosting the marketplace
    pub region: SellingRegion,
    /// ISO 4217 currency prices are quoted in
    pub currency: &'static str,
}

impl MarketplaceTarget {
    /// Base URL of the production endpoint serving this marketplace.
    pub fn endpoint_url(&self) -> &'static str {
        self.region.endpoint_url()
    }

    /// AWS region requests to this marketplace are signed for.
    pub fn aws_region(&self) -> &'static str {
        self.region.aws_region()
    }
}

/// Amazon storefronts reachable through SP-API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(missing_docs)]
pub enum Marketplace {
    // North America
    US,
    CA,
    MX,
    BR,
    // Europe
    UK,
    IE,
    DE,
    FR,
    IT,
    ES,
    NL,
    SE,
    PL,
    BE,
    TR,
    EG,
    SA,
    AE,
    IN,
    // Far East
    JP,
    AU,
    SG,
}

macro_rules! target {
    ($m:ident, $id:literal, $region:ident, $currency:literal) => {
        MarketplaceTarget {
            marketplace: Marketplace::$m,
            code: stringify!($m),
            id: $id,
            region: SellingRegion::$region,
            currency: $currency,
        }
    };
}

/// Every known marketplace.
pub static MARKETPLACES: &[MarketplaceTarget] = &[
    target!(US, "ATVPDKIKX0DER", NorthAmerica, "USD"),
    target!(CA, "A2EUQ1WTGCTBG2", NorthAmerica, "CAD"),
    target!(MX, "A1AM78C64UM0Y8", NorthAmerica, "MXN"),
    target!(BR, "A2Q3Y263D00KWC", NorthAmerica, "BRL"),
    target!(UK, "A1F83G8C2ARO7P", Europe, "GBP"),
    target!(IE, "A28R8C7NBKEWEA", Europe, "EUR"),
    target!(DE, "A1PA6795UKMFR9", Europe, "EUR"),
    target!(FR, "A13V1IB3VIYZZH", Europe, "EUR"),
    target!(IT, "APJ6JRA9NG5V4", Europe, "EUR"),
    target!(ES, "A1RKKUPIHCS9HS", Europe, "EUR"),
    target!(NL, "A1805IZSGTT6HS", Europe, "EUR"),
    target!(SE, "A2NODRKZP88ZB9", Europe, "SEK"),
    target!(PL, "A1C3SOZRARQ6R3", Europe, "PLN"),
    target!(BE, "AMEN7PMS3EDWL", Europe, "EUR"),
    target!(TR, "A33AVAJ2PDY3EV", Europe, "TRY"),
    target!(EG, "ARBP9OOSHTCHU", Europe, "EGP"),
    target!(SA, "A17E79C6D8DWNP", Europe, "SAR"),
    target!(AE, "A2VIGQ35RCS4UG", Europe, "AED"),
    target!(IN, "A21TJRUUN4KGV", Europe, "INR"),
    target!(JP, "A1VC38T7YXB528", FarEast, "JPY"),
    target!(AU, "A39IBJ37TRP1C6", FarEast, "AUD"),
    target!(SG, "A19VAU5U5O7RUS", FarEast, "SGD"),
];

impl Marketplace {
    /// The table row for this marketplace.
    pub fn target(&self) -> &'static MarketplaceTarget {
        // The table holds every variant in declaration order.
        &MARKETPLACES[*self as usize]
    }

    /// SP-API marketplace id.
    pub fn id(&self) -> MarketplaceId {
        MarketplaceId::new(self.target().id)
    }

    /// Short storefront code.
    pub fn code(&self) -> &'static str {
        self.target().code
    }

    /// Selling region hosting this marketplace.
    pub fn region(&self) -> SellingRegion {
        self.target().region
    }

    /// Default currency.
    pub fn currency(&self) -> &'static str {
        self.target().currency
    }

    /// Look up a marketplace by its SP-API id.
    pub fn from_id(id: &str) -> Option<Self> {
        MARKETPLACES
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.marketplace)
    }

    /// Look up a marketplace by short code (case-insensitive). `GB` is
    /// accepted as an alias for `UK`.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_uppercase();
        let code = if code == "GB" { "UK".to_string() } else { code };
        MARKETPLACES
            .iter()
            .find(|t| t.code == code)
            .map(|t| t.marketplace)
    }

    /// All marketplaces in a selling region.
    pub fn in_region(region: SellingRegion) -> impl Iterator<Item = Marketplace> {
        MARKETPLACES
            .iter()
            .filter(move |t| t.region == region)
            .map(|t| t.marketplace)
    }
}

impl FromStr for Marketplace {
    type Err = Error;

    /// Accepts either a short code (`DE`) or a marketplace id
    /// (`A1PA6795UKMFR9`).
    fn from_str(s: &str) -> Result<Self, Error> {
        Self::from_code(s)
            .or_else(|| Self::from_id(s.trim()))
            .ok_or_else(|| Error::InvalidInput(format!("Unknown marketplace: {}", s)))
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
