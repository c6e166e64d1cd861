use crate::listing::{ImportResult, ScrapedListing};
use serde::{Deserialize, Serialize};

/// Body returned by the crawl operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResponse {
    pub bikes: Vec<ScrapedListing>,
}

/// Body accepted by the import operation
///
/// Entries stay untyped here so that one bad entry fails on its own instead
/// of rejecting the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRequest {
    pub bikes: Vec<serde_json::Value>,
}

/// Body returned by a completed import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResponse {
    pub results: Vec<ImportResult>,
}

/// Single top-level error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl ToString) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}
