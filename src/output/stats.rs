//! Run statistics and result summaries
//!
//! `CrawlStatistics` is filled in by the coordinator while a run progresses.
//! `ProductSummary` describes an existing result file.

use crate::model::ProductRecord;
use std::collections::BTreeSet;
use std::time::Duration;

/// Counters collected during one crawl run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlStatistics {
    /// Listing pages the run intended to visit (after capping)
    pub pages_planned: u32,

    /// Listing pages that loaded successfully
    pub pages_loaded: u32,

    /// Listing pages skipped after retry exhaustion
    pub pages_failed: u32,

    /// Product links seen across all pages, duplicates included
    pub links_found: usize,

    /// Product links left after deduplication
    pub unique_links: usize,

    pub products_parsed: usize,

    pub products_failed: usize,

    /// Parsed products whose price block came back empty
    pub products_without_prices: usize,

    pub elapsed: Duration,
}

impl CrawlStatistics {
    /// Returns the product success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.unique_links == 0 {
            return 0.0;
        }
        (self.products_parsed as f64 / self.unique_links as f64) * 100.0
    }
}

/// Prints run statistics to stdout
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Listing pages:");
    println!("  Planned: {}", stats.pages_planned);
    println!("  Loaded: {}", stats.pages_loaded);
    println!("  Skipped: {}", stats.pages_failed);
    println!();

    println!("Product links:");
    println!("  Found: {}", stats.links_found);
    println!("  Unique: {}", stats.unique_links);
    println!();

    println!("Products:");
    println!("  Parsed: {}", stats.products_parsed);
    println!("  Failed: {}", stats.products_failed);
    println!("  Without prices: {}", stats.products_without_prices);
    println!();

    println!(
        "Success Rate: {:.1}% in {:.1}s",
        stats.success_rate(),
        stats.elapsed.as_secs_f64()
    );
}

/// Overview of a saved result document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductSummary {
    pub total: usize,
    pub with_name: usize,
    pub with_current_price: usize,
    pub discounted: usize,
    pub with_offline_prices: usize,
    pub brands: BTreeSet<String>,
}

impl ProductSummary {
    pub fn from_records(records: &[ProductRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Self::default()
        };

        for record in records {
            if record.name.is_some() {
                summary.with_name += 1;
            }
            if record.prices.current_price.is_some() {
                summary.with_current_price += 1;
            }
            if record.prices.discount.is_some() {
                summary.discounted += 1;
            }
            if !record.prices.offline_prices.is_empty() {
                summary.with_offline_prices += 1;
            }
            if let Some(brand) = &record.brand {
                summary.brands.insert(brand.clone());
            }
        }

        summary
    }
}

/// Prints a saved result summary to stdout
pub fn print_product_summary(summary: &ProductSummary) {
    println!("=== Product Summary ===\n");
    println!("  Products: {}", summary.total);
    println!("  With name: {}", summary.with_name);
    println!("  With current price: {}", summary.with_current_price);
    println!("  Discounted: {}", summary.discounted);
    println!("  With offline prices: {}", summary.with_offline_prices);
    println!("  Distinct brands: {}", summary.brands.len());

    for brand in summary.brands.iter().take(20) {
        println!("    - {}", brand);
    }
    if summary.brands.len() > 20 {
        println!("    ... and {} more", summary.brands.len() - 20);
    }
}
