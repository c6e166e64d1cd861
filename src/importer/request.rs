//! Import request validation
//!
//! Only the envelope can reject a request: the body must be JSON with a
//! `bikes` array. Each entry is then converted on its own, and an entry that
//! is not a valid listing is carried through as [`ImportEntry::Invalid`] so it
//! gets its own error result.

use crate::listing::{ImportRequest, ScrapedListing};
use crate::ImportError;
use serde_json::Value;

const INVALID_FORMAT: &str = "Invalid data format";

/// Title reported for an invalid entry that has none
pub const UNTITLED: &str = "(untitled)";

/// An entry that could not be read as a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidEntry {
    pub title: String,
    pub reason: String,
    pub selected: bool,
}

/// One entry of an import request
#[derive(Debug, Clone, PartialEq)]
pub enum ImportEntry {
    Listing(ScrapedListing),
    Invalid(InvalidEntry),
}

impl ImportEntry {
    /// Converts one raw `bikes` entry
    pub fn from_value(value: Value) -> Self {
        let title = value
            .get("title")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(UNTITLED)
            .to_string();
        let selected = value
            .get("selected")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        match serde_json::from_value::<ScrapedListing>(value) {
            Ok(listing) => Self::Listing(listing),
            Err(e) => Self::Invalid(InvalidEntry {
                title,
                reason: format!("Invalid listing: {}", e),
                selected,
            }),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Listing(listing) => &listing.title,
            Self::Invalid(invalid) => &invalid.title,
        }
    }

    pub fn is_selected(&self) -> bool {
        match self {
            Self::Listing(listing) => listing.selected,
            Self::Invalid(invalid) => invalid.selected,
        }
    }

    pub fn as_listing(&self) -> Result<&ScrapedListing, &InvalidEntry> {
        match self {
            Self::Listing(listing) => Ok(listing),
            Self::Invalid(invalid) => Err(invalid),
        }
    }
}

/// Validates a raw `{ "bikes": [...] }` import body
///
/// # Returns
///
/// * `Ok(entries)` - One entry per element of `bikes`, in request order
/// * `Err(ImportError::MalformedInput)` - Body is not JSON, or `bikes` is
///   missing or not an array
pub fn parse_import_request(body: &str) -> Result<Vec<ImportEntry>, ImportError> {
    let request: ImportRequest = serde_json::from_str(body).map_err(|e| {
        tracing::debug!("Rejected import body: {}", e);
        ImportError::MalformedInput(INVALID_FORMAT.to_string())
    })?;

    Ok(request
        .bikes
        .into_iter()
        .map(ImportEntry::from_value)
        .collect())
}
