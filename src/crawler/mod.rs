//! Crawler module for dealer catalog scraping
//!
//! This module contains the crawl side of the pipeline, including:
//! - HTTP fetching with optional retry of transient failures
//! - Listing page parsing into partial listings
//! - Detail page gallery enrichment
//! - Pagination, deduplication and batched enrichment

mod coordinator;
mod detail;
mod fetcher;
mod parser;
mod source;

pub use coordinator::{
    run_crawl, Coordinator, CrawlReport, CrawlSettings, EnrichmentStats, StopReason,
};
pub use detail::{enrich_listing, extract_gallery, EnrichOutcome, GalleryError};
pub use fetcher::{
    build_http_client, fetch_bytes, fetch_url, fetch_with_retry, FetchResult, FetchedBytes,
    ImageFetchError,
};
pub use parser::{
    current_year, parse_listing_page, ListingParser, ParserError, ANNOUNCEMENT_MARKER,
};
pub use source::{DealerSite, ListingSource};
