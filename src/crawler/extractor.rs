//! HTML extraction for category listings and product pages
//!
//! All functions here are pure: they take an already parsed document and never
//! perform I/O. A missing element is never an error; it yields `None` (or an
//! empty collection) for the affected field only.
//!
//! # Markup
//!
//! | Data | Selector |
//! |------|----------|
//! | Pagination labels | `ul.catalog-paginate li a` |
//! | Product card links | `.catalog-2-level-product-card a.product-card-name` |
//! | Name | `.product-page-content__product-name` |
//! | Article | `.product-page-content__article` |
//! | Brand | `.product-attributes__list-item a[href*='/brand/']` |
//! | Prices | `.product-unit-prices__{actual,old}-wrapper` |

use crate::model::{OfflinePrice, PriceBlock, ProductLink, ProductRecord};
use crate::url::resolve_link;
use rust_decimal::Decimal;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

const PAGINATION: &str = "ul.catalog-paginate li a";
const PRODUCT_CARD_LINK: &str = ".catalog-2-level-product-card a.product-card-name";

const PRODUCT_NAME: &str = ".product-page-content__product-name";
const PRODUCT_ARTICLE: &str = ".product-page-content__article";
const PRODUCT_BRAND: &str = ".product-attributes__list-item a[href*='/brand/']";

/// Label in front of the article number
const ARTICLE_LABEL: &str = "Артикул:";

const CURRENT_PRICE: &str = ".product-unit-prices__actual-wrapper";
const OLD_PRICE: &str = ".product-unit-prices__old-wrapper";
const DISCOUNT: &str = ".product-discount";
const OFFLINE_PRICES: &str = ".product-page-prices-and-buttons__offline-bmpl-prices";
const OFFLINE_ROW: &str = ".product-prices-lines__item";
const OFFLINE_ACTUAL: &str = ".product-range-prices__item-price-actual";
const OFFLINE_OLD: &str = ".product-prices-lines__item-price-old";
const RUBLES: &str = ".product-price__sum-rubles";
const PENNIES: &str = ".product-price__sum-penny";

/// Errors raised while preparing extraction
///
/// These never leave this module; callers see empty fields instead.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid selector '{css}': {message}")]
    Selector { css: &'static str, message: String },
}

fn selector(css: &'static str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        css,
        message: e.to_string(),
    })
}

/// Concatenated, trimmed text of an element; None when nothing is left
fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text: String = element.text().map(str::trim).collect();
    (!text.is_empty()).then_some(text)
}

/// Text of the first element in `doc` matching `css`
fn select_text(doc: &Html, css: &'static str) -> Option<String> {
    let selector = selector(css).ok()?;
    doc.select(&selector).next().and_then(element_text)
}

// ===== Listing pages =====

/// Returns the highest numeric pagination label on a listing page
///
/// Labels that are not purely numeric ("...", "Next") are ignored. Returns
/// None when the page has no numeric labels at all, so the caller can keep
/// its own default.
pub fn last_page_number(doc: &Html) -> Option<u32> {
    let selector = selector(PAGINATION).ok()?;

    doc.select(&selector)
        .filter_map(|anchor| {
            let label: String = anchor.text().collect();
            let label = label.trim();
            if !label.is_empty() && label.chars().all(|c| c.is_ascii_digit()) {
                label.parse::<u32>().ok()
            } else {
                None
            }
        })
        .max()
}

/// Number of listing pages to visit
///
/// Falls back to `default` when nothing was discovered, then applies `cap`.
/// The result is never below 1.
pub fn clamp_page_count(discovered: Option<u32>, default: u32, cap: Option<u32>) -> u32 {
    let count = discovered.unwrap_or(default).max(1);
    match cap {
        Some(cap) => count.min(cap.max(1)),
        None => count,
    }
}

/// Collects product detail links from a listing page
///
/// Each card anchor's `href` is resolved against `base`. Anchors without an
/// `href` are skipped.
pub fn product_links(doc: &Html, base: &Url) -> BTreeSet<ProductLink> {
    let Ok(selector) = selector(PRODUCT_CARD_LINK) else {
        return BTreeSet::new();
    };

    doc.select(&selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| resolve_link(base, href))
        .map(ProductLink::from)
        .collect()
}

/// Unions per-page link sets into one deduplicated set
pub fn aggregate_links<I>(pages: I) -> BTreeSet<ProductLink>
where
    I: IntoIterator<Item = BTreeSet<ProductLink>>,
{
    pages.into_iter().flatten().collect()
}

// ===== Product pages =====

/// Extracts a product record from a product detail page
///
/// Every field is best-effort. A page with none of the expected markup still
/// produces a record carrying just its `url`.
pub fn parse_product(doc: &Html, url: &str) -> ProductRecord {
    let name = select_text(doc, PRODUCT_NAME);

    let id = select_text(doc, PRODUCT_ARTICLE)
        .map(|text| text.replace(ARTICLE_LABEL, "").trim().to_string())
        .filter(|id| !id.is_empty());

    let brand = select_text(doc, PRODUCT_BRAND);

    ProductRecord {
        id,
        name,
        brand,
        prices: parse_prices(doc),
        link: url.to_string(),
    }
}

/// Extracts the price block of a product page
///
/// Never fails: if the block cannot be computed at all, the empty block is
/// returned and the cause is logged.
pub fn parse_prices(doc: &Html) -> PriceBlock {
    try_parse_prices(doc).unwrap_or_else(|e| {
        tracing::warn!("Price extraction failed: {}", e);
        PriceBlock::default()
    })
}

/// Rubles and pennies selectors, compiled once per page
struct PriceParts {
    rubles: Selector,
    pennies: Selector,
}

impl PriceParts {
    fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            rubles: selector(RUBLES)?,
            pennies: selector(PENNIES)?,
        })
    }

    /// Price inside `block`, defaulting missing rubles to "0" and pennies to "00"
    fn price_in(&self, block: ElementRef<'_>) -> Option<Decimal> {
        let rubles = block
            .select(&self.rubles)
            .next()
            .and_then(element_text)
            .unwrap_or_else(|| "0".to_string());
        let pennies = block
            .select(&self.pennies)
            .next()
            .and_then(element_text)
            .unwrap_or_else(|| "00".to_string());

        clean_price(&format!("{}.{}", rubles, pennies))
    }

    /// Price inside the first element of `scope` matching `css`, if any
    fn price_at(
        &self,
        scope: ElementRef<'_>,
        css: &'static str,
    ) -> Result<Option<Decimal>, ExtractError> {
        let block_selector = selector(css)?;
        Ok(scope
            .select(&block_selector)
            .next()
            .and_then(|block| self.price_in(block)))
    }
}

fn try_parse_prices(doc: &Html) -> Result<PriceBlock, ExtractError> {
    let parts = PriceParts::new()?;
    let root = doc.root_element();

    let current_price = parts.price_at(root, CURRENT_PRICE)?;
    let old_price = parts.price_at(root, OLD_PRICE)?;
    let discount = select_text(doc, DISCOUNT);

    let mut offline_prices = Vec::new();
    let container_selector = selector(OFFLINE_PRICES)?;
    if let Some(container) = doc.select(&container_selector).next() {
        let row_selector = selector(OFFLINE_ROW)?;
        for row in container.select(&row_selector) {
            offline_prices.push(OfflinePrice {
                actual_price: parts.price_at(row, OFFLINE_ACTUAL)?,
                old_price: parts.price_at(row, OFFLINE_OLD)?,
            });
        }
    }

    Ok(PriceBlock {
        current_price,
        old_price,
        discount,
        offline_prices,
    })
}

/// Parses a `"<rubles>.<pennies>"` string into a fixed-point price
///
/// A doubled separator is collapsed and digit-group spaces are dropped, since
/// the catalog renders thousands as `1 299` (often with a non-breaking space).
/// Returns None if the result is still not a number.
pub fn clean_price(text: &str) -> Option<Decimal> {
    let normalized: String = text
        .replace("..", ".")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if normalized.is_empty() {
        return None;
    }

    Decimal::from_str(&normalized).ok()
}
