//! URL handling module for Metro-Harvest
//!
//! This module builds category and listing page URLs, resolves product links
//! against the catalog origin, and derives file names for raw responses.

mod resolve;
mod response_id;

// Re-export main functions
pub use resolve::{category_url, listing_page_url, parse_origin, resolve_link};
pub use response_id::{response_id, TIMESTAMP_FORMAT};
