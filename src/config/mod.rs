//! Configuration module for Metro-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! All keys are optional; missing ones fall back to the production defaults.
//!
//! # Example
//!
//! ```no_run
//! use metro_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Retries per URL: {}", config.http.max_retries);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, HttpConfig, LoggingConfig, OutputConfig, ProxyConfig, ProxyKind,
    SiteConfig,
};

// Re-export parser functions
pub use parser::{load_config, load_or_default, parse_config};
pub use validation::validate;
