//! Import orchestration
//!
//! Listings are imported one at a time, in input order. Each listing's images
//! are fetched and uploaded sequentially before its document is created.
//! Image and document failures only affect the listing they belong to;
//! credential failures end the whole batch.

use crate::crawler::{fetch_bytes, ImageFetchError};
use crate::importer::document::{ImageRef, VehicleDocument};
use crate::importer::request::{ImportEntry, InvalidEntry};
use crate::importer::store::{ContentStore, ImageUpload, StoreError};
use crate::listing::{ImportResult, ScrapedListing};
use crate::url::filename_from_url;
use crate::{CredentialError, ImportError};
use reqwest::Client;
use thiserror::Error;

/// Why one image was left out of a gallery
#[derive(Debug, Error)]
pub enum ImageError {
    #[error(transparent)]
    Fetch(#[from] ImageFetchError),

    #[error("upload failed: {0}")]
    Upload(#[from] StoreError),
}

/// Images uploaded for one listing
#[derive(Debug, Default)]
pub struct GalleryUpload {
    /// References to uploaded assets, in source order
    pub images: Vec<ImageRef>,
    /// Number of images that could not be fetched or uploaded
    pub skipped: usize,
}

/// Result of importing a single listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Document created; the gallery is partial when `skipped > 0`
    Imported {
        id: String,
        uploaded: usize,
        skipped: usize,
    },

    /// Document not created
    Failed(String),
}

impl RecordOutcome {
    /// Converts the outcome into the result reported for `title`
    pub fn into_result(self, title: &str) -> ImportResult {
        match self {
            Self::Imported { id, .. } => ImportResult::success(title, id),
            Self::Failed(reason) => ImportResult::failure(title, reason),
        }
    }
}

/// Drives the import of a batch of listings into a content store
pub struct Importer<S> {
    store: S,
    client: Client,
    document_type: String,
}

impl<S: ContentStore> Importer<S> {
    /// Creates a new importer
    ///
    /// # Arguments
    ///
    /// * `store` - Destination for assets and documents
    /// * `client` - HTTP client used to download source images
    /// * `document_type` - `_type` given to created documents
    pub fn new(store: S, client: Client, document_type: impl Into<String>) -> Self {
        Self {
            store,
            client,
            document_type: document_type.into(),
        }
    }

    /// Imports every listing and returns one result per listing, in order
    ///
    /// # Returns
    ///
    /// * `Ok(results)` - Every listing was attempted
    /// * `Err(ImportError::Credential)` - The write credential is missing or
    ///   was refused; listings after the failing one were not attempted and
    ///   no per-listing results are returned
    pub async fn import_all(
        &self,
        listings: &[ScrapedListing],
    ) -> Result<Vec<ImportResult>, ImportError> {
        self.import_each(listings.iter().map(Ok), listings.len()).await
    }

    /// Imports the entries of a request, in order
    ///
    /// Entries that could not be read as listings get an error result
    /// without touching the store. Errors are as for [`Importer::import_all`].
    pub async fn import_entries(
        &self,
        entries: &[ImportEntry],
    ) -> Result<Vec<ImportResult>, ImportError> {
        self.import_each(entries.iter().map(ImportEntry::as_listing), entries.len())
            .await
    }

    async fn import_each<'a, I>(
        &self,
        entries: I,
        total: usize,
    ) -> Result<Vec<ImportResult>, ImportError>
    where
        I: Iterator<Item = Result<&'a ScrapedListing, &'a InvalidEntry>>,
    {
        self.store.check_credentials()?;

        let mut results = Vec::with_capacity(total);
        for (index, entry) in entries.enumerate() {
            let listing = match entry {
                Ok(listing) => listing,
                Err(invalid) => {
                    tracing::error!("Failed to import {}: {}", invalid.title, invalid.reason);
                    results.push(ImportResult::failure(&invalid.title, &invalid.reason));
                    continue;
                }
            };

            tracing::info!("Importing {}/{}: {}", index + 1, total, listing.title);

            let outcome = match self.import_listing(listing).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Aborting import at {}: {}", listing.title, e);
                    return Err(e.into());
                }
            };

            match &outcome {
                RecordOutcome::Imported {
                    id,
                    uploaded,
                    skipped,
                } => {
                    if *skipped > 0 {
                        tracing::warn!(
                            "Imported {} as {} with {} of {} images",
                            listing.title,
                            id,
                            uploaded,
                            uploaded + skipped
                        );
                    } else {
                        tracing::info!("Imported {} as {}", listing.title, id);
                    }
                }
                RecordOutcome::Failed(reason) => {
                    tracing::error!("Failed to import {}: {}", listing.title, reason);
                }
            }

            results.push(outcome.into_result(&listing.title));
        }

        Ok(results)
    }

    /// Imports one listing
    ///
    /// Only credential failures are returned as errors; every other problem
    /// is folded into the outcome.
    pub async fn import_listing(
        &self,
        listing: &ScrapedListing,
    ) -> Result<RecordOutcome, CredentialError> {
        let gallery = self.upload_gallery(listing).await;
        let uploaded = gallery.images.len();
        let document = VehicleDocument::from_listing(listing, gallery.images, &self.document_type);

        match self.store.create_document(&document).await {
            Ok(id) => Ok(RecordOutcome::Imported {
                id,
                uploaded,
                skipped: gallery.skipped,
            }),
            Err(StoreError::Fatal(e)) => Err(e),
            Err(StoreError::Recoverable(reason)) => Ok(RecordOutcome::Failed(reason)),
        }
    }

    /// Fetches and uploads the listing's images one after another
    pub async fn upload_gallery(&self, listing: &ScrapedListing) -> GalleryUpload {
        let mut gallery = GalleryUpload::default();

        for source in listing.image_sources() {
            match self.upload_one(&source).await {
                Ok(asset_id) => gallery.images.push(ImageRef::new(asset_id)),
                Err(reason) => {
                    tracing::warn!("Skipping image {}: {}", source, reason);
                    gallery.skipped += 1;
                }
            }
        }

        gallery
    }

    async fn upload_one(&self, source: &str) -> Result<String, ImageError> {
        let fetched = fetch_bytes(&self.client, source).await?;
        let upload = ImageUpload {
            bytes: fetched.bytes,
            filename: filename_from_url(source),
            content_type: fetched.content_type,
        };
        Ok(self.store.upload_image(upload).await?)
    }
}
