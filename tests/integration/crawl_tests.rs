//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small category with product pages and
//! run the full crawl cycle end-to-end into a temporary data directory.

use metro_harvest::config::{Config, CrawlerConfig, HttpConfig, OutputConfig, SiteConfig};
use metro_harvest::crawler::{run_crawl, Coordinator};
use metro_harvest::output::load_products;
use metro_harvest::{CrawlStage, HarvestError};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CATEGORY: &str = "/category/tea";

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, data_dir: &Path) -> Config {
    Config {
        site: SiteConfig {
            base_url: base_url.to_string(),
            category_path: CATEGORY.to_string(),
        },
        http: HttpConfig {
            timeout_secs: 5,
            max_retries: 2,
            retry_delay_secs: None, // No pause between attempts in tests
            max_concurrent_requests: 4,
            ..HttpConfig::default()
        },
        crawler: CrawlerConfig { max_pages: 100 },
        output: OutputConfig {
            data_dir: data_dir.to_path_buf(),
            ..OutputConfig::default()
        },
        ..Config::default()
    }
}

/// Listing page with the given pagination labels and product hrefs
fn listing_page(pages: &[&str], products: &[&str]) -> String {
    let pagination: String = pages
        .iter()
        .map(|label| format!(r##"<li><a href="#">{}</a></li>"##, label))
        .collect();
    let cards: String = products
        .iter()
        .map(|href| {
            format!(
                r#"<div class="catalog-2-level-product-card">
                    <a class="product-card-name" href="{}">Product</a>
                </div>"#,
                href
            )
        })
        .collect();

    format!(
        r#"<html><body>
            <div class="catalog-products">{}</div>
            <ul class="catalog-paginate">{}</ul>
        </body></html>"#,
        cards, pagination
    )
}

/// Product page with name, article, brand and a current price
fn product_page(name: &str, article: &str, rubles: &str) -> String {
    format!(
        r#"<html><body>
            <h1 class="product-page-content__product-name">{}</h1>
            <p class="product-page-content__article">Артикул: {}</p>
            <ul>
                <li class="product-attributes__list-item"><a href="/brand/greenfield">Greenfield</a></li>
            </ul>
            <div class="product-unit-prices__actual-wrapper">
                <span class="product-price__sum-rubles">{}</span>
                <span class="product-price__sum-penny">90</span>
            </div>
        </body></html>"#,
        name, article, rubles
    )
}

/// Mounts listing page `page`; pages above 1 must be mounted before page 1
async fn mount_listing(server: &MockServer, page: u32, body: String) {
    let mock = Mock::given(method("GET")).and(path(CATEGORY));
    let mock = if page > 1 {
        mock.and(query_param("page", page.to_string()))
    } else {
        mock
    };

    mock.respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_product(server: &MockServer, product_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(product_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// In-memory log sink shared with a tracing subscriber
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn links_of(records: &[metro_harvest::ProductRecord]) -> BTreeSet<String> {
    records.iter().map(|r| r.link.clone()).collect()
}

#[tokio::test]
async fn test_full_crawl_skips_failed_listing_page() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    // Page 2 never loads
    Mock::given(method("GET"))
        .and(path(CATEGORY))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;
    mount_listing(
        &server,
        1,
        listing_page(&["1", "2"], &["/products/green", "/products/black"]),
    )
    .await;
    mount_product(&server, "/products/green", product_page("Green", "100", "199")).await;
    mount_product(&server, "/products/black", product_page("Black", "200", "249")).await;

    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let _log_guard = tracing::subscriber::set_default(subscriber);

    let config = create_test_config(&base_url, dir.path());
    let report = run_crawl(&config).await.unwrap();

    assert!(
        logs.contents().contains("Skipping category page 2"),
        "missing skip warning in:\n{}",
        logs.contents()
    );
    assert_eq!(report.records_written, 2);
    assert_eq!(report.stats.pages_planned, 2);
    assert_eq!(report.stats.pages_loaded, 1);
    assert_eq!(report.stats.pages_failed, 1);
    assert!(report.archived_path.is_none());

    let records = load_products(&report.output_path).unwrap().unwrap();
    assert_eq!(
        links_of(&records),
        BTreeSet::from([
            format!("{}/products/green", base_url),
            format!("{}/products/black", base_url),
        ])
    );

    let green = records
        .iter()
        .find(|r| r.link.ends_with("/products/green"))
        .unwrap();
    assert_eq!(green.name.as_deref(), Some("Green"));
    assert_eq!(green.id.as_deref(), Some("100"));
    assert_eq!(green.brand.as_deref(), Some("Greenfield"));
    assert_eq!(green.prices.current_price, Some(Decimal::new(19990, 2)));
}

#[tokio::test]
async fn test_product_without_prices_is_kept() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    mount_listing(&server, 1, listing_page(&[], &["/products/sold-out"])).await;
    mount_product(
        &server,
        "/products/sold-out",
        r#"<html><body>
            <h1 class="product-page-content__product-name">Sold out</h1>
            <p class="product-page-content__article">Артикул: 777</p>
            <ul>
                <li class="product-attributes__list-item"><a href="/brand/ahmad">Ahmad</a></li>
            </ul>
        </body></html>"#
            .to_string(),
    )
    .await;

    let config = create_test_config(&base_url, dir.path());
    let report = run_crawl(&config).await.unwrap();

    assert_eq!(report.records_written, 1);
    assert_eq!(report.stats.products_without_prices, 1);

    let records = load_products(&report.output_path).unwrap().unwrap();
    let record = &records[0];
    assert_eq!(record.name.as_deref(), Some("Sold out"));
    assert_eq!(record.id.as_deref(), Some("777"));
    assert_eq!(record.brand.as_deref(), Some("Ahmad"));
    assert!(record.prices.is_empty());
}

#[tokio::test]
async fn test_duplicate_links_fetched_once() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    mount_listing(
        &server,
        2,
        listing_page(&["1", "2"], &["/products/shared", "/products/second"]),
    )
    .await;
    mount_listing(
        &server,
        1,
        listing_page(&["1", "2"], &["/products/shared", "/products/first"]),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/products/shared"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(product_page("Shared", "1", "100")),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_product(&server, "/products/first", product_page("First", "2", "110")).await;
    mount_product(&server, "/products/second", product_page("Second", "3", "120")).await;

    let config = create_test_config(&base_url, dir.path());
    let report = run_crawl(&config).await.unwrap();

    assert_eq!(report.stats.links_found, 4);
    assert_eq!(report.stats.unique_links, 3);
    assert_eq!(report.records_written, 3);

    let records = load_products(&report.output_path).unwrap().unwrap();
    assert_eq!(links_of(&records).len(), 3);
}

#[tokio::test]
async fn test_failed_product_is_omitted() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    mount_listing(
        &server,
        1,
        listing_page(&[], &["/products/ok", "/products/gone"]),
    )
    .await;
    mount_product(&server, "/products/ok", product_page("Ok", "5", "50")).await;
    Mock::given(method("GET"))
        .and(path("/products/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let config = create_test_config(&base_url, dir.path());
    let report = run_crawl(&config).await.unwrap();

    assert_eq!(report.records_written, 1);
    assert_eq!(report.stats.products_failed, 1);

    let records = load_products(&report.output_path).unwrap().unwrap();
    assert_eq!(
        links_of(&records),
        BTreeSet::from([format!("{}/products/ok", base_url)])
    );
}

#[tokio::test]
async fn test_first_page_failure_aborts_run() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(CATEGORY))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let config = create_test_config(&base_url, dir.path());
    let mut coordinator = Coordinator::new(&config).unwrap();
    let result = coordinator.run().await;

    assert!(matches!(
        result,
        Err(HarvestError::Fetch { attempts: 2, .. })
    ));
    assert_eq!(coordinator.stage(), CrawlStage::Failed);
    assert!(!config.output.output_path().exists());
}

#[tokio::test]
async fn test_max_pages_limits_listing_fetches() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(CATEGORY))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[], &[])))
        .expect(0)
        .mount(&server)
        .await;
    mount_listing(&server, 2, listing_page(&[], &["/products/two"])).await;
    mount_listing(
        &server,
        1,
        listing_page(&["1", "2", "3", "...", "5"], &["/products/one"]),
    )
    .await;
    mount_product(&server, "/products/one", product_page("One", "1", "10")).await;
    mount_product(&server, "/products/two", product_page("Two", "2", "20")).await;

    let mut config = create_test_config(&base_url, dir.path());
    config.crawler.max_pages = 2;
    let report = run_crawl(&config).await.unwrap();

    assert_eq!(report.stats.pages_planned, 2);
    assert_eq!(report.stats.pages_loaded, 2);
    assert_eq!(report.records_written, 2);
}

#[tokio::test]
async fn test_raw_responses_saved_when_enabled() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    mount_listing(&server, 1, listing_page(&[], &["/products/only"])).await;
    mount_product(&server, "/products/only", product_page("Only", "9", "90")).await;

    let mut config = create_test_config(&base_url, dir.path());
    config.output.save_raw_responses = true;
    run_crawl(&config).await.unwrap();

    let saved: Vec<_> = std::fs::read_dir(config.output.responses_path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(saved.len(), 2);
    assert!(saved
        .iter()
        .all(|p| p.extension().and_then(|e| e.to_str()) == Some("html")));
}

#[tokio::test]
async fn test_second_run_archives_previous_output() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    mount_listing(&server, 1, listing_page(&[], &["/products/only"])).await;
    mount_product(&server, "/products/only", product_page("Only", "9", "90")).await;

    let config = create_test_config(&base_url, dir.path());
    let first = run_crawl(&config).await.unwrap();
    assert!(first.archived_path.is_none());

    let second = run_crawl(&config).await.unwrap();
    let archived = second.archived_path.unwrap();
    assert!(archived.exists());
    assert!(archived.to_string_lossy().ends_with(".bak"));
    assert_eq!(load_products(&archived).unwrap().unwrap().len(), 1);
}
