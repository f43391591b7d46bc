//! Crawler coordinator - main crawl orchestration logic
//!
//! One run walks the category listing and its products:
//!
//! 1. Fetch listing page 1 (the only failure that aborts the run)
//! 2. Read the page count from its pagination, capped by `max-pages`
//! 3. Fetch pages 2..=N concurrently, skipping pages that never load
//! 4. Union the product links of all loaded pages
//! 5. Fetch and extract every product concurrently, dropping failures
//! 6. Write the collected records once
//!
//! Everything runs on a single task. Futures are issued together and
//! interleave at network calls and retry pauses, so no locking is needed.

use crate::config::Config;
use crate::crawler::extractor::{
    aggregate_links, clamp_page_count, last_page_number, parse_product, product_links,
};
use crate::crawler::fetcher::Fetcher;
use crate::model::{CrawlResult, CrawlTarget, ProductLink, ProductRecord};
use crate::output::{CrawlStatistics, JsonOutput};
use crate::state::CrawlStage;
use crate::url::{category_url, listing_page_url, parse_origin};
use crate::HarvestError;
use futures::future::join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use scraper::Html;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Instant;
use url::Url;

/// Page count used when the first page has no pagination block
const DEFAULT_PAGE_COUNT: u32 = 1;

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Where the records were written
    pub output_path: PathBuf,

    /// Archive of the previous result file, if there was one
    pub archived_path: Option<PathBuf>,

    pub records_written: usize,

    pub stats: CrawlStatistics,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    category: Url,
    base: Url,
    page_cap: Option<u32>,
    fetcher: Fetcher,
    output: JsonOutput,
    stage: CrawlStage,
    stats: CrawlStatistics,
}

impl Coordinator {
    /// Creates a coordinator for the configured category
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - Invalid URLs or the HTTP client could not be built
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        Self::with_fetcher(config, Fetcher::from_config(config)?)
    }

    /// Creates a coordinator around an already built fetcher
    pub fn with_fetcher(config: &Config, fetcher: Fetcher) -> Result<Self, HarvestError> {
        Ok(Self {
            category: category_url(&config.site)?,
            base: parse_origin(&config.site.base_url)?,
            page_cap: config.crawler.page_cap(),
            fetcher,
            output: JsonOutput::new(config.output.output_path()),
            stage: CrawlStage::Start,
            stats: CrawlStatistics::default(),
        })
    }

    pub fn stage(&self) -> CrawlStage {
        self.stage
    }

    pub fn category(&self) -> &Url {
        &self.category
    }

    pub fn stats(&self) -> &CrawlStatistics {
        &self.stats
    }

    /// Runs the crawl from the first listing page to the written result
    ///
    /// Only a first page that cannot be loaded fails the run. Later pages and
    /// individual products that fail are logged and left out.
    #[tracing::instrument(name = "crawl", skip(self), fields(category = %self.category))]
    pub async fn run(&mut self) -> Result<CrawlReport, HarvestError> {
        let started = Instant::now();
        tracing::info!("Starting crawl of {}", self.category);

        // Page one
        self.advance(CrawlStage::FetchFirstPage)?;
        let first_page = match self.fetch_listing(1).await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Could not load the first category page: {}", e);
                self.advance(CrawlStage::Failed)?;
                return Err(e);
            }
        };

        // Page count
        self.advance(CrawlStage::DiscoverPageCount)?;
        let (discovered, first_links) = {
            let doc = Html::parse_document(&first_page);
            (last_page_number(&doc), product_links(&doc, &self.base))
        };
        let last_page = clamp_page_count(discovered, DEFAULT_PAGE_COUNT, self.page_cap);
        match discovered {
            Some(found) if found > last_page => {
                tracing::info!("Found {} pages, limiting to {}", found, last_page)
            }
            Some(found) => tracing::info!("Found {} pages", found),
            None => tracing::info!("No pagination found, using {} page(s)", last_page),
        }
        tracing::info!("Found {} products on page 1", first_links.len());

        self.stats.pages_planned = last_page;
        self.stats.pages_loaded = 1;
        self.stats.links_found = first_links.len();

        // Remaining pages
        self.advance(CrawlStage::FetchRemainingPages)?;
        let mut page_links = vec![first_links];
        page_links.extend(self.fetch_remaining_pages(last_page).await);

        // Dedupe
        self.advance(CrawlStage::AggregateLinks)?;
        let links = aggregate_links(page_links);
        self.stats.unique_links = links.len();
        tracing::info!(
            "Collected {} unique product links ({} before dedupe)",
            links.len(),
            self.stats.links_found
        );

        // Products
        self.advance(CrawlStage::FetchAndParseProducts)?;
        let records = self.fetch_products(&links).await;
        self.stats.products_parsed = records.len();
        self.stats.products_failed = links.len() - records.len();
        self.stats.products_without_prices =
            records.iter().filter(|r| r.prices.is_empty()).count();

        // Persist
        self.advance(CrawlStage::Persist)?;
        let archived_path = self.output.save(&records)?;

        self.advance(CrawlStage::Done)?;
        self.stats.elapsed = started.elapsed();
        tracing::info!(
            "Crawl finished: {} products saved, {} failed, {} listing pages skipped",
            records.len(),
            self.stats.products_failed,
            self.stats.pages_failed
        );

        Ok(CrawlReport {
            output_path: self.output.path().to_path_buf(),
            archived_path,
            records_written: records.len(),
            stats: self.stats.clone(),
        })
    }

    fn advance(&mut self, to: CrawlStage) -> Result<(), HarvestError> {
        if !self.stage.can_transition_to(to) {
            return Err(HarvestError::InvalidTransition {
                from: self.stage,
                to,
            });
        }

        tracing::debug!("Stage {} -> {}", self.stage, to);
        self.stage = to;
        Ok(())
    }

    async fn fetch_listing(&self, page: u32) -> Result<String, HarvestError> {
        let target = CrawlTarget::listing_page(listing_page_url(&self.category, page), page);
        tracing::info!("Loading category page {}: {}", page, target.url);
        self.fetcher.fetch(&target.url).await
    }

    /// Fetches pages 2..=last_page and returns the link set of each loaded page
    ///
    /// All pages are requested at once; results are inspected in page order.
    async fn fetch_remaining_pages(&mut self, last_page: u32) -> Vec<BTreeSet<ProductLink>> {
        let pages: Vec<u32> = (2..=last_page).collect();
        let bodies = join_all(pages.iter().map(|&page| self.fetch_listing(page))).await;

        let mut page_links = Vec::with_capacity(bodies.len());
        for (page, body) in pages.into_iter().zip(bodies) {
            match body {
                Ok(body) => {
                    let links = {
                        let doc = Html::parse_document(&body);
                        product_links(&doc, &self.base)
                    };
                    tracing::info!("Found {} products on page {}", links.len(), page);
                    self.stats.pages_loaded += 1;
                    self.stats.links_found += links.len();
                    page_links.push(links);
                }
                Err(e) => {
                    tracing::warn!("Skipping category page {}: {}", page, e);
                    self.stats.pages_failed += 1;
                }
            }
        }

        page_links
    }

    /// Fetches and extracts every product, keeping only the successes
    ///
    /// Records are collected in completion order.
    async fn fetch_products(&self, links: &BTreeSet<ProductLink>) -> CrawlResult {
        let mut tasks: FuturesUnordered<_> = links
            .iter()
            .map(|link| async move { (link, self.fetch_product(link).await) })
            .collect();

        let mut records = CrawlResult::with_capacity(links.len());
        while let Some((link, result)) = tasks.next().await {
            match result {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping product {}: {}", link, e),
            }
        }

        records
    }

    async fn fetch_product(&self, link: &ProductLink) -> Result<ProductRecord, HarvestError> {
        let target = CrawlTarget::product(link)?;
        let body = self.fetcher.fetch(&target.url).await?;

        let doc = Html::parse_document(&body);
        let record = parse_product(&doc, link.as_str());
        if record.prices.is_empty() {
            tracing::warn!("No prices found on {}", link);
        }
        Ok(record)
    }
}

/// Runs one complete crawl for the given configuration
///
/// The HTTP connection pool is created here and released when this function
/// returns, on success and on failure alike.
///
/// # Example
///
/// ```no_run
/// use metro_harvest::config::Config;
/// use metro_harvest::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = run_crawl(&Config::default()).await?;
/// println!("Saved {} products", report.records_written);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config) -> Result<CrawlReport, HarvestError> {
    let mut coordinator = Coordinator::new(config)?;
    coordinator.run().await
}
