//! Listing records exchanged between the crawler, the operator and the importer
//!
//! Field names follow the JSON payloads the review UI sends and receives
//! (camelCase). Aliases accept payloads written by older exports that used
//! `id` and `imageUrl`.

mod payload;

pub use payload::{CrawlResponse, ErrorResponse, ImportRequest, ImportResponse};

use serde::{Deserialize, Serialize};

/// One vehicle scraped from the dealer catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedListing {
    /// Catalog identifier from the card's detail anchor; may be empty
    #[serde(default, alias = "id")]
    pub source_id: String,

    /// Normalized, uppercased title
    pub title: String,

    #[serde(default)]
    pub price: u64,

    #[serde(default)]
    pub kilometers: u64,

    /// Model year; the current year when a payload leaves it out
    #[serde(default = "crate::crawler::current_year")]
    pub year: i32,

    /// Single fallback image taken from the listing card
    #[serde(default, alias = "imageUrl")]
    pub thumbnail_url: String,

    /// Gallery URLs; `[thumbnail_url]` until enrichment replaces it
    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default)]
    pub external_url: String,

    /// Set by the operator when choosing what to import
    #[serde(default)]
    pub selected: bool,
}

impl ScrapedListing {
    /// Images to upload on import: the gallery, else the thumbnail, else nothing
    pub fn image_sources(&self) -> Vec<String> {
        if !self.images.is_empty() {
            self.images.clone()
        } else if !self.thumbnail_url.is_empty() {
            vec![self.thumbnail_url.clone()]
        } else {
            Vec::new()
        }
    }

    /// Returns true if a detail page can be looked up for this listing
    pub fn can_enrich(&self) -> bool {
        !self.source_id.is_empty()
    }
}

/// Outcome status of one import attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Success,
    Error,
}

/// Result reported back to the operator for one listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub title: String,
    pub status: ImportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Store-assigned document id on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ImportResult {
    pub fn success(title: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: ImportStatus::Success,
            error: None,
            id: Some(id.into()),
        }
    }

    pub fn failure(title: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: ImportStatus::Error,
            error: Some(error.into()),
            id: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ImportStatus::Success
    }
}
