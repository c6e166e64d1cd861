//! Output module for crawl and import payloads
//!
//! This module handles:
//! - Writing JSON response bodies to a file or stdout
//! - Summarising crawl and import runs for the operator

pub mod stats;

pub use stats::{print_crawl_summary, print_import_summary, CrawlSummary, ImportSummary};

use crate::HarvestError;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Serializes a payload as pretty-printed JSON
///
/// # Arguments
///
/// * `payload` - Response body to render
///
/// # Returns
///
/// * `Ok(String)` - JSON text terminated by a newline
/// * `Err(HarvestError)` - Serialization failed
pub fn render_payload<T: Serialize>(payload: &T) -> Result<String, HarvestError> {
    let mut json = serde_json::to_string_pretty(payload)?;
    json.push('\n');
    Ok(json)
}

/// Writes a payload to `path`, or to stdout when no path is given
///
/// # Arguments
///
/// * `payload` - Response body to write
/// * `path` - Destination file; replaced if it exists
///
/// # Returns
///
/// * `Ok(())` - Payload written
/// * `Err(HarvestError)` - Serialization or I/O failed
pub fn write_payload<T: Serialize>(payload: &T, path: Option<&Path>) -> Result<(), HarvestError> {
    let json = render_payload(payload)?;

    match path {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!("Wrote {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(json.as_bytes())?;
            handle.flush()?;
        }
    }

    Ok(())
}
