//! Primitive types and newtypes for type-safe API interactions.
//!
//! This module provides strongly-typed wrappers around string identifiers
//! to prevent mixing up different types of IDs at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// An Amazon Standard Identification Number.
///
/// ASINs are ten ASCII alphanumeric characters. Input is upper-cased.
///
/// # Example
///
/// ```
/// use marketfit_spapi::Asin;
///
/// let asin = Asin::new("b000123456").expect("valid asin");
/// assert_eq!(asin.as_str(), "B000123456");
/// assert!(Asin::new("too-short").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Asin(String);

impl Asin {
    /// Length of every ASIN.
    pub const LEN: usize = 10;

    /// Create an ASIN, validating its shape.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless the value is exactly ten
    /// ASCII letters or digits.
    pub fn new(s: impl AsRef<str>) -> Result<Self> {
        let s = s.as_ref().trim();
        if s.len() != Self::LEN || !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidInput(format!(
                "Invalid ASIN: {:?}. Expected 10 alphanumeric characters",
                s
            )));
        }
        Ok(Self(s.to_ascii_uppercase()))
    }

    /// Get the ASIN as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Asin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Asin {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Asin {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for Asin {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl From<Asin> for String {
    fn from(asin: Asin) -> Self {
        asin.0
    }
}

/// An SP-API marketplace identifier such as `ATVPDKIKX0DER`.
///
/// Unlike [`Marketplace`](super::Marketplace), this accepts any id the API
/// returns, including marketplaces absent from the built-in table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketplaceId(String);

impl MarketplaceId {
    /// Create a new marketplace id.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the marketplace id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarketplaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for MarketplaceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for MarketplaceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MarketplaceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// SP-API selling region.
///
/// Each region has its own endpoint and AWS signing region.
///
/// # Example
///
/// ```
/// use marketfit_spapi::SellingRegion;
///
/// let region = SellingRegion::Europe;
/// assert_eq!(region.endpoint_url(), "https://sellingpartnerapi-eu.amazon.com");
/// assert_eq!(region.aws_region(), "eu-west-1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SellingRegion {
    /// North America (US, CA, MX, BR).
    #[default]
    NorthAmerica,
    /// Europe, Middle East, India.
    Europe,
    /// Far East (JP, AU, SG).
    FarEast,
}

impl SellingRegion {
    /// Base URL of the production SP-API endpoint.
    pub fn endpoint_url(&self) -> &'static str {
        match self {
            SellingRegion::NorthAmerica => "https://sellingpartnerapi-na.amazon.com",
            SellingRegion::Europe => "https://sellingpartnerapi-eu.amazon.com",
            SellingRegion::FarEast => "https://sellingpartnerapi-fe.amazon.com",
        }
    }

    /// Base URL of the sandbox SP-API endpoint.
    pub fn sandbox_url(&self) -> &'static str {
        match self {
            SellingRegion::NorthAmerica => "https://sandbox.sellingpartnerapi-na.amazon.com",
            SellingRegion::Europe => "https://sandbox.sellingpartnerapi-eu.amazon.com",
            SellingRegion::FarEast => "https://sandbox.sellingpartnerapi-fe.amazon.com",
        }
    }

    /// AWS region used when signing requests for this endpoint.
    pub fn aws_region(&self) -> &'static str {
        match self {
            SellingRegion::NorthAmerica => "us-east-1",
            SellingRegion::Europe => "eu-west-1",
            SellingRegion::FarEast => "us-west-2",
        }
    }

    /// Resolve a region from its AWS signing region.
    pub fn from_aws_region(region: &str) -> Option<Self> {
        match region {
            "us-east-1" => Some(SellingRegion::NorthAmerica),
            "eu-west-1" => Some(SellingRegion::Europe),
            "us-west-2" => Some(SellingRegion::FarEast),
            _ => None,
        }
    }
}

impl fmt::Display for SellingRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SellingRegion::NorthAmerica => write!(f, "na"),
            SellingRegion::Europe => write!(f, "eu"),
            SellingRegion::FarEast => write!(f, "fe"),
        }
    }
}

impl std::str::FromStr for SellingRegion {
    type Err = Error;

    /// Accepts a short code (`na`, `eu`, `fe`) or an AWS signing region.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "na" => Ok(SellingRegion::NorthAmerica),
            "eu" => Ok(SellingRegion::Europe),
            "fe" => Ok(SellingRegion::FarEast),
            other => SellingRegion::from_aws_region(other)
                .ok_or_else(|| Error::InvalidInput(format!("Unknown selling region: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asin_valid() {
        let asin = Asin::new(" b000123456 ").unwrap();
        assert_eq!(asin.as_str(), "B000123456");
        assert_eq!(asin.to_string(), "B000123456");
    }

    #[test]
    fn test_asin_invalid() {
        assert!(Asin::new("B00012345").is_err());
        assert!(Asin::new("B0001234567").is_err());
        assert!(Asin::new("B00012345!").is_err());
        assert!(Asin::new("").is_err());
    }

    #[test]
    fn test_asin_serde_validates() {
        let asin: Asin = serde_json::from_str("\"B07XJ8C8F5\"").unwrap();
        assert_eq!(asin.as_str(), "B07XJ8C8F5");
        assert!(serde_json::from_str::<Asin>("\"nope\"").is_err());
    }

    #[test]
    fn test_marketplace_id() {
        let id: MarketplaceId = "ATVPDKIKX0DER".into();
        assert_eq!(id.as_str(), "ATVPDKIKX0DER");
    }

    #[test]
    fn test_region_from_str() {
        assert_eq!("EU".parse::<SellingRegion>().unwrap(), SellingRegion::Europe);
        assert_eq!("us-west-2".parse::<SellingRegion>().unwrap(), SellingRegion::FarEast);
        assert!("ap-south-1".parse::<SellingRegion>().is_err());
    }

    #[test]
    fn test_region_round_trip() {
        for region in [
            SellingRegion::NorthAmerica,
            SellingRegion::Europe,
            SellingRegion::FarEast,
        ] {
            assert_eq!(SellingRegion::from_aws_region(region.aws_region()), Some(region));
        }
        assert_eq!(SellingRegion::from_aws_region("ap-south-1"), None);
    }
}
