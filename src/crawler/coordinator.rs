//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the pagination loop that coordinates one crawl:
//! - Fetching listing pages in order, up to the page ceiling
//! - Parsing cards and dropping titles already collected in this run
//! - Enriching each page's listings in fixed-size concurrent batches
//! - Deciding when pagination has ended

use crate::config::{Config, MAX_PAGES};
use crate::crawler::detail::{enrich_listing, EnrichOutcome};
use crate::crawler::fetcher::FetchResult;
use crate::crawler::parser::{current_year, ListingParser};
use crate::crawler::source::{DealerSite, ListingSource};
use crate::listing::ScrapedListing;
use crate::HarvestError;
use futures::future::join_all;
use std::collections::HashSet;
use std::fmt;

/// Why the pagination loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The configured page limit was reached
    PageLimit,

    /// A page had no listing cards (end of the catalog)
    EmptyPage { page: u32 },

    /// A page could not be fetched; later pages were not attempted
    FetchFailed { page: u32, reason: String },

    /// The parser could not be set up for a page
    ParseFailed { page: u32, reason: String },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageLimit => write!(f, "page limit reached"),
            Self::EmptyPage { page } => write!(f, "page {} has no listings", page),
            Self::FetchFailed { page, reason } => {
                write!(f, "page {} could not be fetched ({})", page, reason)
            }
            Self::ParseFailed { page, reason } => {
                write!(f, "page {} could not be parsed ({})", page, reason)
            }
        }
    }
}

/// Counters for detail-page enrichment across a crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentStats {
    pub enriched: usize,
    pub no_source_id: usize,
    pub fetch_failed: usize,
    pub no_gallery: usize,
    pub malformed: usize,
}

impl EnrichmentStats {
    fn record(&mut self, outcome: &EnrichOutcome) {
        match outcome {
            EnrichOutcome::Enriched { .. } => self.enriched += 1,
            EnrichOutcome::NoSourceId => self.no_source_id += 1,
            EnrichOutcome::FetchFailed(_) => self.fetch_failed += 1,
            EnrichOutcome::NoGallery => self.no_gallery += 1,
            EnrichOutcome::Malformed(_) => self.malformed += 1,
        }
    }

    /// Listings that kept only their thumbnail
    pub fn degraded(&self) -> usize {
        self.no_source_id + self.fetch_failed + self.no_gallery + self.malformed
    }
}

/// Everything a crawl produced
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Deduplicated, enriched listings in page order
    pub listings: Vec<ScrapedListing>,

    /// Pages fetched and parsed successfully
    pub pages_crawled: u32,

    /// Listings dropped because their title was already collected
    pub duplicates_dropped: usize,

    pub stop_reason: StopReason,

    pub enrichment: EnrichmentStats,
}

/// Crawl limits
#[derive(Debug, Clone, Copy)]
pub struct CrawlSettings {
    /// Pages to visit, clamped to the hard ceiling
    pub max_pages: u32,

    /// Detail fetches in flight per batch
    pub detail_concurrency: usize,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_pages: MAX_PAGES,
            detail_concurrency: 5,
        }
    }
}

impl From<&Config> for CrawlSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_pages: config.source.max_pages,
            detail_concurrency: config.source.detail_concurrency,
        }
    }
}

/// Main crawler coordinator structure
///
/// One coordinator drives one crawl. The title set lives here so two
/// crawls never share deduplication state.
pub struct Coordinator<S> {
    source: S,
    settings: CrawlSettings,
    current_year: i32,
    seen_titles: HashSet<String>,
    listings: Vec<ScrapedListing>,
    duplicates_dropped: usize,
    enrichment: EnrichmentStats,
}

impl<S: ListingSource> Coordinator<S> {
    /// Creates a new coordinator instance
    pub fn new(source: S, settings: CrawlSettings) -> Self {
        Self {
            source,
            settings,
            current_year: current_year(),
            seen_titles: HashSet::new(),
            listings: Vec::new(),
            duplicates_dropped: 0,
            enrichment: EnrichmentStats::default(),
        }
    }

    /// Overrides the year used for cards without one
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    /// Runs the pagination loop to completion
    ///
    /// Pages are processed strictly in order; a page's enrichment finishes
    /// before the next page is requested. Fetch and parse trouble ends the
    /// crawl with whatever was collected so far.
    pub async fn run(mut self) -> CrawlReport {
        let max_pages = self.settings.max_pages.clamp(1, MAX_PAGES);
        let batch_size = self.settings.detail_concurrency.max(1);

        let parser = match ListingParser::new() {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("Failed to set up listing parser: {}", e);
                let reason = e.to_string();
                return self.finish(0, StopReason::ParseFailed { page: 1, reason });
            }
        };

        let mut pages_crawled = 0;
        let mut page = 1;
        let stop_reason = loop {
            if page > max_pages {
                break StopReason::PageLimit;
            }

            let body = match self.source.fetch_listing_page(page).await {
                FetchResult::Success { body, .. } => body,
                failure => {
                    tracing::error!("Failed to fetch page {}: {}", page, failure.describe());
                    break StopReason::FetchFailed {
                        page,
                        reason: failure.describe(),
                    };
                }
            };

            let (cards, parsed) = parser.parse_page(&body, self.source.origin(), self.current_year);
            if cards == 0 {
                tracing::info!("Page {} has no listings, stopping", page);
                break StopReason::EmptyPage { page };
            }
            pages_crawled += 1;

            let mut fresh = self.deduplicate(parsed);
            tracing::info!(
                "Page {}: {} cards, {} new listings",
                page,
                cards,
                fresh.len()
            );

            self.enrich_in_batches(&mut fresh, batch_size).await;
            self.listings.append(&mut fresh);
            page += 1;
        };

        tracing::info!(
            "Crawl finished after {} pages with {} listings: {}",
            pages_crawled,
            self.listings.len(),
            stop_reason
        );

        self.finish(pages_crawled, stop_reason)
    }

    /// Drops listings whose title was already collected, on this page or earlier
    fn deduplicate(&mut self, parsed: Vec<ScrapedListing>) -> Vec<ScrapedListing> {
        let mut fresh = Vec::with_capacity(parsed.len());
        for listing in parsed {
            if listing.title.is_empty() {
                continue;
            }

            if self.seen_titles.insert(listing.title.to_uppercase()) {
                fresh.push(listing);
            } else {
                tracing::debug!("Skipping duplicate listing: {}", listing.title);
                self.duplicates_dropped += 1;
            }
        }
        fresh
    }

    /// Enriches listings `batch_size` at a time
    ///
    /// Each batch is awaited in full before the next one starts, so at most
    /// `batch_size` detail fetches are ever in flight.
    async fn enrich_in_batches(&mut self, listings: &mut [ScrapedListing], batch_size: usize) {
        for batch in listings.chunks_mut(batch_size) {
            let source = &self.source;
            let outcomes = join_all(
                batch
                    .iter_mut()
                    .map(|listing| enrich_listing(source, listing)),
            )
            .await;

            for outcome in &outcomes {
                self.enrichment.record(outcome);
            }
        }
    }

    fn finish(self, pages_crawled: u32, stop_reason: StopReason) -> CrawlReport {
        CrawlReport {
            listings: self.listings,
            pages_crawled,
            duplicates_dropped: self.duplicates_dropped,
            stop_reason,
            enrichment: self.enrichment,
        }
    }
}

/// Runs a complete crawl against the configured dealer site
///
/// # Arguments
///
/// * `config` - The harvester configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl ran; the report may hold a partial result
/// * `Err(HarvestError)` - The HTTP client could not be built
///
/// # Example
///
/// ```no_run
/// use moto_harvest::config::load_config;
/// use moto_harvest::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let report = run_crawl(&config).await?;
/// println!("{} listings", report.listings.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config) -> Result<CrawlReport, HarvestError> {
    let source = DealerSite::from_config(config)?;
    let coordinator = Coordinator::new(source, CrawlSettings::from(config));
    Ok(coordinator.run().await)
}
