//! Output module for persisting crawl results
//!
//! This module handles:
//! - Writing the result JSON document with one-generation backup
//! - Archiving raw HTML responses and pruning them by age
//! - Creating the data directory layout
//! - Recording run statistics

mod json;
mod responses;
pub mod stats;

pub use json::{archive_file, load_products, JsonOutput};
pub use responses::ResponseArchive;
pub use stats::{
    print_product_summary, print_statistics, CrawlStatistics, ProductSummary,
};

use crate::config::OutputConfig;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Creates the data, outputs, responses and logs directories
///
/// Existing directories are left untouched. Returns the directories in the
/// order they were ensured.
pub fn ensure_directories(config: &OutputConfig) -> OutputResult<Vec<PathBuf>> {
    let mut dirs = vec![config.data_dir.clone()];
    if let Some(parent) = config.output_path().parent() {
        dirs.push(parent.to_path_buf());
    }
    dirs.push(config.responses_path());
    dirs.push(config.logs_path());

    for dir in &dirs {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }

    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_directories() {
        let root = TempDir::new().unwrap();
        let config = OutputConfig {
            data_dir: root.path().join("data"),
            ..OutputConfig::default()
        };

        ensure_directories(&config).unwrap();
        // Second call must be a no-op
        ensure_directories(&config).unwrap();

        assert!(root.path().join("data/outputs").is_dir());
        assert!(root.path().join("data/responses").is_dir());
        assert!(root.path().join("data/logs").is_dir());
    }
}
