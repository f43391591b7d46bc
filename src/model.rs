//! Records produced by a crawl
//!
//! A [`ProductRecord`] is a flat JSON object: identity fields, the merged
//! [`PriceBlock`], and the product link. Missing values serialize as `null`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// One URL the orchestrator intends to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub url: Url,

    /// Listing page index, `None` for product pages
    pub page: Option<u32>,
}

impl CrawlTarget {
    pub fn listing_page(url: Url, page: u32) -> Self {
        Self {
            url,
            page: Some(page),
        }
    }

    pub fn product(link: &ProductLink) -> Result<Self, url::ParseError> {
        Ok(Self {
            url: Url::parse(link.as_str())?,
            page: None,
        })
    }
}

/// Absolute URL of a product detail page
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductLink(String);

impl ProductLink {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Url> for ProductLink {
    fn from(url: Url) -> Self {
        Self(url.into())
    }
}

/// In-store price line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflinePrice {
    pub actual_price: Option<Decimal>,
    pub old_price: Option<Decimal>,
}

/// Pricing extracted from a product page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBlock {
    pub current_price: Option<Decimal>,
    pub old_price: Option<Decimal>,
    pub discount: Option<String>,
    #[serde(default)]
    pub offline_prices: Vec<OfflinePrice>,
}

impl PriceBlock {
    /// True when no price information was found at all
    pub fn is_empty(&self) -> bool {
        self.current_price.is_none()
            && self.old_price.is_none()
            && self.discount.is_none()
            && self.offline_prices.is_empty()
    }
}

/// Structured result of extracting one product page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub brand: Option<String>,
    #[serde(flatten)]
    pub prices: PriceBlock,
    pub link: String,
}

impl ProductRecord {
    /// A record with nothing extracted except its link
    pub fn empty(link: impl Into<String>) -> Self {
        Self {
            id: None,
            name: None,
            brand: None,
            prices: PriceBlock::default(),
            link: link.into(),
        }
    }
}

/// All records of one run, in completion order
pub type CrawlResult = Vec<ProductRecord>;
