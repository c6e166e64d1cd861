//! Detail page enrichment
//!
//! Detail pages embed the listing gallery in a script assignment of the form
//! `var annuncio_<id> = [{"href": "..."}, ...];`. Enrichment replaces the
//! listing's single thumbnail with that gallery when it can be read, and
//! leaves the listing untouched otherwise.

use crate::crawler::fetcher::FetchResult;
use crate::crawler::source::ListingSource;
use crate::listing::ScrapedListing;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// What happened when enriching one listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// Gallery found; `images` now holds this many URLs
    Enriched { images: usize },

    /// Listing has no catalog identifier, nothing fetched
    NoSourceId,

    /// Detail page could not be fetched
    FetchFailed(String),

    /// Page fetched but carries no usable gallery
    NoGallery,

    /// Gallery assignment present but not valid JSON
    Malformed(String),
}

/// Reasons a gallery could not be read from a detail page body
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GalleryError {
    #[error("gallery assignment not found")]
    NotFound,

    #[error("gallery has no image links")]
    Empty,

    #[error("malformed gallery data: {0}")]
    Malformed(String),
}

/// Extracts the ordered gallery URLs for `source_id` from a detail page body
///
/// # Example
///
/// ```
/// use moto_harvest::crawler::extract_gallery;
///
/// let body = r#"<script>var annuncio_7 = [{"href":"https://img/a.jpg"},{"href":"https://img/b.jpg"}];</script>"#;
/// assert_eq!(
///     extract_gallery(body, "7").unwrap(),
///     vec!["https://img/a.jpg", "https://img/b.jpg"]
/// );
/// ```
pub fn extract_gallery(body: &str, source_id: &str) -> Result<Vec<String>, GalleryError> {
    let pattern = format!(
        r"(?s)var annuncio_{}\s*=\s*(\[.*?\]);",
        regex::escape(source_id)
    );
    let re = Regex::new(&pattern).map_err(|e| GalleryError::Malformed(e.to_string()))?;

    let literal = re
        .captures(body)
        .and_then(|c| c.get(1))
        .ok_or(GalleryError::NotFound)?
        .as_str();

    let items: Vec<Value> =
        serde_json::from_str(literal).map_err(|e| GalleryError::Malformed(e.to_string()))?;

    let images: Vec<String> = items
        .iter()
        .filter_map(|item| item.get("href").and_then(Value::as_str))
        .map(|href| href.to_string())
        .collect();

    if images.is_empty() {
        return Err(GalleryError::Empty);
    }

    Ok(images)
}

/// Replaces a listing's images with its detail-page gallery
///
/// Never fails: every problem is reported through the returned outcome and
/// the listing keeps its thumbnail.
pub async fn enrich_listing<S>(source: &S, listing: &mut ScrapedListing) -> EnrichOutcome
where
    S: ListingSource + ?Sized,
{
    if !listing.can_enrich() {
        return EnrichOutcome::NoSourceId;
    }

    let body = match source.fetch_detail_page(&listing.source_id).await {
        FetchResult::Success { body, .. } => body,
        failure => {
            tracing::debug!(
                "Failed to fetch detail for {}: {}",
                listing.source_id,
                failure.describe()
            );
            return EnrichOutcome::FetchFailed(failure.describe());
        }
    };

    match extract_gallery(&body, &listing.source_id) {
        Ok(images) => {
            let count = images.len();
            listing.images = images;
            EnrichOutcome::Enriched { images: count }
        }
        Err(GalleryError::Malformed(reason)) => {
            tracing::debug!("Malformed gallery for {}: {}", listing.source_id, reason);
            EnrichOutcome::Malformed(reason)
        }
        Err(_) => EnrichOutcome::NoGallery,
    }
}
