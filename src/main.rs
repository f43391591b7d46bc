//! Metro-Harvest main entry point
//!
//! This is the command-line interface for the Metro-Harvest catalog crawler.

use anyhow::Context;
use clap::Parser;
use metro_harvest::config::{load_or_default, validate, Config};
use metro_harvest::crawler::run_crawl;
use metro_harvest::output::{
    archive_file, ensure_directories, load_products, print_product_summary, print_statistics,
    ProductSummary, ResponseArchive,
};
use metro_harvest::url::category_url;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Exit status for a configuration that cannot be loaded or validated
const EXIT_CONFIG: u8 = 2;

/// Metro-Harvest: a category crawler for the Metro online catalog
///
/// Walks every page of a category listing, visits each product it finds and
/// writes names, articles, brands and prices to a JSON document.
#[derive(Parser, Debug)]
#[command(name = "metro-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A catalog category crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults if omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Category path or absolute category URL to crawl
    #[arg(long, value_name = "PATH_OR_URL")]
    category: Option<String>,

    /// Maximum number of listing pages to visit (0 for no limit)
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Keep a copy of every fetched HTML page
    #[arg(long)]
    save_responses: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["summary", "cleanup"])]
    dry_run: bool,

    /// Summarize the current output file and exit
    #[arg(long, conflicts_with_all = ["dry_run", "cleanup"])]
    summary: bool,

    /// Remove expired raw responses and exit
    #[arg(long, conflicts_with_all = ["dry_run", "summary"])]
    cleanup: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_with_overrides(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    // Flushes the log file when dropped at the end of main
    let _log_guard = match setup_logging(&config, cli.verbose, cli.quiet) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to set up logging: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.summary {
        handle_summary(&config)
    } else if cli.cleanup {
        handle_cleanup(&config)
    } else {
        let result = handle_crawl(&config).await;
        if config.output.save_raw_responses {
            if let Err(e) = handle_cleanup(&config) {
                tracing::warn!("Raw response cleanup failed: {:#}", e);
            }
        }
        result
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Loads the configuration file and applies command-line overrides
fn load_with_overrides(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = load_or_default(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("loading {}", path.display()),
        None => "validating built-in defaults".to_string(),
    })?;

    if let Some(category) = &cli.category {
        config.site.category_path = category.clone();
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if cli.save_responses {
        config.output.save_raw_responses = true;
    }

    validate(&config).context("validating command-line overrides")?;
    category_url(&config.site).context("building the category URL")?;
    Ok(config)
}

/// Sets up console and file logging
///
/// An existing log file is archived first so each run starts a fresh one.
/// `RUST_LOG` takes precedence over `-v`/`-q` and the configured level.
fn setup_logging(config: &Config, verbose: u8, quiet: bool) -> anyhow::Result<WorkerGuard> {
    let logs_dir = config.output.logs_path();
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("creating {}", logs_dir.display()))?;
    let archived = archive_file(&logs_dir.join(&config.output.log_file))
        .context("archiving the previous log file")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new(format!("metro_harvest={},warn", config.logging.level)),
                1 => EnvFilter::new("metro_harvest=debug,info"),
                2 => EnvFilter::new("metro_harvest=trace,debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    let file_appender = tracing_appender::rolling::never(&logs_dir, &config.output.log_file);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_target(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false),
        )
        .try_init()
        .context("installing the tracing subscriber")?;

    if let Some(archived) = archived {
        tracing::debug!("Archived previous log to {}", archived.display());
    }

    Ok(guard)
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Metro-Harvest Dry Run ===\n");

    println!("Category:");
    println!("  URL: {}", category_url(&config.site)?);
    match config.crawler.page_cap() {
        Some(cap) => println!("  Max pages: {}", cap),
        None => println!("  Max pages: unlimited"),
    }

    println!("\nHTTP:");
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!("  Attempts per URL: {}", config.http.max_retries);
    match config.http.retry_delay() {
        Some(delay) => println!("  Retry delay: {}s", delay.as_secs()),
        None => println!("  Retry delay: none"),
    }
    println!(
        "  Max concurrent requests: {}",
        config.http.max_concurrent_requests
    );
    match &config.proxy {
        Some(proxy) => println!("  Proxy: {}", proxy.url()),
        None => println!("  Proxy: none"),
    }

    println!("\nOutput:");
    println!("  Results: {}", config.output.output_path().display());
    println!("  Logs: {}", config.output.logs_path().display());
    if config.output.save_raw_responses {
        println!(
            "  Raw responses: {} (kept {} days)",
            config.output.responses_path().display(),
            config.output.retention_days
        );
    } else {
        println!("  Raw responses: disabled");
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --summary mode: summarizes the current output file
fn handle_summary(config: &Config) -> anyhow::Result<()> {
    let path = config.output.output_path();
    println!("Output file: {}\n", path.display());

    match load_products(&path).with_context(|| format!("reading {}", path.display()))? {
        Some(records) => print_product_summary(&ProductSummary::from_records(&records)),
        None => println!("No output file yet. Run a crawl first."),
    }

    Ok(())
}

/// Removes raw responses older than the retention window
fn handle_cleanup(config: &Config) -> anyhow::Result<()> {
    let archive = ResponseArchive::new(config.output.responses_path(), true);
    let removed = archive
        .cleanup(config.output.retention_days)
        .with_context(|| format!("cleaning {}", archive.dir().display()))?;

    tracing::info!(
        "Removed {} raw responses older than {} days",
        removed,
        config.output.retention_days
    );
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    ensure_directories(&config.output).context("creating data directories")?;

    let report = run_crawl(config).await.context("crawl failed")?;

    tracing::info!(
        "Crawl completed: {} products written to {}",
        report.records_written,
        report.output_path.display()
    );
    if let Some(archived) = &report.archived_path {
        tracing::info!("Previous results kept at {}", archived.display());
    }
    if tracing::enabled!(tracing::Level::INFO) {
        print_statistics(&report.stats);
    }

    Ok(())
}
