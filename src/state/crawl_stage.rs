/// Crawl stage definitions for tracking a run's progress
///
/// A run moves strictly forward through these stages. The only failure exit is
/// from `FetchFirstPage`; everything after it degrades per item instead.
use std::fmt;

/// Represents the current stage of one crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlStage {
    /// Run created, nothing fetched yet
    Start,

    /// Fetching the first category listing page
    FetchFirstPage,

    /// Reading the pagination block of page one
    DiscoverPageCount,

    /// Fetching listing pages 2..=N concurrently
    FetchRemainingPages,

    /// Unioning product links from all loaded pages
    AggregateLinks,

    /// Fetching and extracting every product page concurrently
    FetchAndParseProducts,

    /// Writing the result document
    Persist,

    // ===== Terminal States =====
    /// Result written
    Done,

    /// First page could not be loaded
    Failed,
}

impl CrawlStage {
    /// Returns true if no further stage follows
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// The stage that follows this one on the success path
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Start => Some(Self::FetchFirstPage),
            Self::FetchFirstPage => Some(Self::DiscoverPageCount),
            Self::DiscoverPageCount => Some(Self::FetchRemainingPages),
            Self::FetchRemainingPages => Some(Self::AggregateLinks),
            Self::AggregateLinks => Some(Self::FetchAndParseProducts),
            Self::FetchAndParseProducts => Some(Self::Persist),
            Self::Persist => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// Returns true if moving from this stage to `to` is allowed
    pub fn can_transition_to(&self, to: CrawlStage) -> bool {
        if to == Self::Failed {
            return *self == Self::FetchFirstPage;
        }
        self.next() == Some(to)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::FetchFirstPage => "fetch_first_page",
            Self::DiscoverPageCount => "discover_page_count",
            Self::FetchRemainingPages => "fetch_remaining_pages",
            Self::AggregateLinks => "aggregate_links",
            Self::FetchAndParseProducts => "fetch_and_parse_products",
            Self::Persist => "persist",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CrawlStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
