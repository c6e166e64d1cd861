//! Catalog source abstraction
//!
//! The coordinator talks to the dealer site through [`ListingSource`], so
//! pagination and enrichment can be driven against the real site or an
//! in-memory source in tests.

use crate::config::{Config, SourceConfig};
use crate::crawler::fetcher::{build_http_client, fetch_with_retry, FetchResult};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Where listing and detail pages come from
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Origin used to absolutize relative listing links
    fn origin(&self) -> &str;

    /// Fetches listing page `page` (1-based)
    async fn fetch_listing_page(&self, page: u32) -> FetchResult;

    /// Fetches the detail page for a catalog identifier
    async fn fetch_detail_page(&self, source_id: &str) -> FetchResult;
}

/// The dealer catalog reached over HTTP
pub struct DealerSite {
    client: Client,
    origin: String,
    dealer_path: String,
    retries: u32,
    retry_delay: Duration,
}

impl DealerSite {
    /// Creates a dealer site from an existing client and source settings
    pub fn new(client: Client, source: &SourceConfig) -> Self {
        Self {
            client,
            origin: source.origin.trim_end_matches('/').to_string(),
            dealer_path: source.dealer_path.clone(),
            retries: source.page_retries,
            retry_delay: Duration::from_millis(source.retry_delay_ms),
        }
    }

    /// Builds the HTTP client from configuration and wraps it
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.http)?;
        Ok(Self::new(client, &config.source))
    }

    /// `<origin>/<dealer>/Usato` for page 1, `.../Usato/pagina-<n>` after
    pub fn listing_url(&self, page: u32) -> String {
        if page <= 1 {
            format!("{}/{}/Usato", self.origin, self.dealer_path)
        } else {
            format!("{}/{}/Usato/pagina-{}", self.origin, self.dealer_path, page)
        }
    }

    pub fn detail_url(&self, source_id: &str) -> String {
        format!(
            "{}/{}/Detail/Detail?ID={}",
            self.origin, self.dealer_path, source_id
        )
    }
}

#[async_trait]
impl ListingSource for DealerSite {
    fn origin(&self) -> &str {
        &self.origin
    }

    async fn fetch_listing_page(&self, page: u32) -> FetchResult {
        let url = self.listing_url(page);
        tracing::info!("Scraping page {}: {}", page, url);
        fetch_with_retry(&self.client, &url, self.retries, self.retry_delay).await
    }

    async fn fetch_detail_page(&self, source_id: &str) -> FetchResult {
        let url = self.detail_url(source_id);
        tracing::debug!("Fetching detail page: {}", url);
        fetch_with_retry(&self.client, &url, self.retries, self.retry_delay).await
    }
}
