//! Run summaries
//!
//! Summaries go to stderr so that stdout can carry the JSON payload.

use crate::crawler::CrawlReport;
use crate::listing::ImportResult;

/// Crawl run summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    pub listings: usize,
    pub pages_crawled: u32,
    pub duplicates_dropped: usize,
    pub enriched: usize,
    /// Listings left with only their thumbnail
    pub thumbnail_only: usize,
    pub stop_reason: String,
}

impl CrawlSummary {
    pub fn from_report(report: &CrawlReport) -> Self {
        Self {
            listings: report.listings.len(),
            pages_crawled: report.pages_crawled,
            duplicates_dropped: report.duplicates_dropped,
            enriched: report.enrichment.enriched,
            thumbnail_only: report.enrichment.degraded(),
            stop_reason: report.stop_reason.to_string(),
        }
    }
}

/// Import run summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub total: usize,
    pub imported: usize,
    pub failed: usize,
}

impl ImportSummary {
    pub fn from_results(results: &[ImportResult]) -> Self {
        let imported = results.iter().filter(|r| r.is_success()).count();
        Self {
            total: results.len(),
            imported,
            failed: results.len() - imported,
        }
    }
}

/// Prints a crawl summary to stderr
///
/// # Arguments
///
/// * `summary` - The summary to display
pub fn print_crawl_summary(summary: &CrawlSummary) {
    eprintln!("=== Crawl Summary ===\n");
    eprintln!("  Listings: {}", summary.listings);
    eprintln!("  Pages crawled: {}", summary.pages_crawled);
    eprintln!("  Duplicates dropped: {}", summary.duplicates_dropped);
    eprintln!("  Galleries found: {}", summary.enriched);
    if summary.thumbnail_only > 0 {
        eprintln!("  Thumbnail only: {}", summary.thumbnail_only);
    }
    eprintln!("  Stopped: {}", summary.stop_reason);
}

/// Prints an import summary to stderr
pub fn print_import_summary(summary: &ImportSummary, results: &[ImportResult]) {
    eprintln!("=== Import Summary ===\n");
    eprintln!(
        "  Imported: {} / {} ({} failed)",
        summary.imported, summary.total, summary.failed
    );

    let failures: Vec<_> = results.iter().filter(|r| !r.is_success()).collect();
    if !failures.is_empty() {
        eprintln!("\nFailures:");
        for result in failures {
            eprintln!(
                "  - {}: {}",
                result.title,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}
