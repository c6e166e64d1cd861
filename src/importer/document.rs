//! Canonical vehicle document written to the content store

use crate::listing::ScrapedListing;
use serde::Serialize;
use uuid::Uuid;

/// Reference from a document to an uploaded image asset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRef {
    #[serde(rename = "_type")]
    pub kind: &'static str,
    /// Unique per array item; the store requires it for array members
    #[serde(rename = "_key")]
    pub key: String,
    pub asset: AssetReference,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetReference {
    #[serde(rename = "_type")]
    pub kind: &'static str,
    #[serde(rename = "_ref")]
    pub asset_id: String,
}

impl ImageRef {
    /// References `asset_id` under a freshly generated key
    pub fn new(asset_id: impl Into<String>) -> Self {
        Self {
            kind: "image",
            key: Uuid::new_v4().simple().to_string(),
            asset: AssetReference {
                kind: "reference",
                asset_id: asset_id.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slug {
    #[serde(rename = "_type")]
    pub kind: &'static str,
    pub current: String,
}

/// Document created for one imported listing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDocument {
    #[serde(rename = "_type")]
    pub document_type: String,
    pub title: String,
    pub slug: Slug,
    pub price: u64,
    pub brand: String,
    pub year: i32,
    pub displacement: u32,
    pub is_used: bool,
    pub kilometers: u64,
    pub images: Vec<ImageRef>,
    pub description: String,
}

impl VehicleDocument {
    /// Builds the document for `listing` with its successfully uploaded images
    pub fn from_listing(
        listing: &ScrapedListing,
        images: Vec<ImageRef>,
        document_type: &str,
    ) -> Self {
        Self {
            document_type: document_type.to_string(),
            title: listing.title.clone(),
            slug: Slug {
                kind: "slug",
                current: slugify(&listing.title),
            },
            price: listing.price,
            brand: brand_from_title(&listing.title),
            year: listing.year,
            // Not published by the catalog cards.
            displacement: 0,
            is_used: true,
            kilometers: listing.kilometers,
            images,
            description: provenance_description(&listing.external_url),
        }
    }
}

/// Lowercases and joins alphanumeric runs with single hyphens
///
/// ```
/// use moto_harvest::importer::slugify;
///
/// assert_eq!(slugify("KTM 390 DUKE!!"), "ktm-390-duke");
/// ```
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// First word of the title, uppercased
pub fn brand_from_title(title: &str) -> String {
    title
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_uppercase()
}

pub fn provenance_description(external_url: &str) -> String {
    format!("Scraped from Moto.it. Original Link: {}", external_url)
}
