//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlStage`: the forward-only stage machine a run walks through

mod crawl_stage;

// Re-export main types
pub use crawl_stage::CrawlStage;
