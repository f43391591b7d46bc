//! Crawler module for catalog page fetching and extraction
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - Pagination, link and product field extraction
//! - Retry policy and request concurrency limiting
//! - Overall crawl coordination

mod coordinator;
mod extractor;
mod fetcher;
mod scheduler;

pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use extractor::{
    aggregate_links, clamp_page_count, clean_price, last_page_number, parse_prices,
    parse_product, product_links, ExtractError,
};
pub use fetcher::{build_http_client, Fetcher};
pub use scheduler::{RequestLimiter, RetryPolicy};
