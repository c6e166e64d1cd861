//! Importer module for content store persistence
//!
//! This module contains the import side of the pipeline, including:
//! - Import request validation
//! - Canonical document construction
//! - The content store trait and its HTTP client
//! - Sequential, failure-isolated import of selected listings

mod coordinator;
mod document;
mod request;
mod store;

pub use coordinator::{GalleryUpload, ImageError, Importer, RecordOutcome};
pub use document::{
    brand_from_title, provenance_description, slugify, AssetReference, ImageRef, Slug,
    VehicleDocument,
};
pub use request::{parse_import_request, ImportEntry, InvalidEntry, UNTITLED};
pub use store::{classify_failure, ContentStore, HttpContentStore, ImageUpload, StoreError};

use crate::config::Config;
use crate::crawler::build_http_client;
use crate::listing::ImportResult;
use crate::HarvestError;

/// Imports request entries into the content store described by `config`
///
/// The write token is read from the environment variable named by
/// `content-store.token-env`.
pub async fn run_import(
    config: &Config,
    entries: &[ImportEntry],
) -> Result<Vec<ImportResult>, HarvestError> {
    let client = build_http_client(&config.http)?;
    let store = HttpContentStore::from_env(client.clone(), &config.content_store);
    let importer = Importer::new(store, client, config.content_store.document_type.clone());

    tracing::info!(
        "Importing {} listings into dataset {}",
        entries.len(),
        config.content_store.dataset
    );

    let results = importer.import_entries(entries).await?;
    Ok(results)
}
