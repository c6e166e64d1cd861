//! Content store client
//!
//! The importer writes through [`ContentStore`]. Failures are classified at
//! this seam into credential problems, which stop a whole import, and
//! everything else, which only fails the current listing.

use crate::config::ContentStoreConfig;
use crate::importer::document::VehicleDocument;
use crate::CredentialError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Message fragment the store uses for privilege failures
const INSUFFICIENT_PERMISSIONS: &str = "Insufficient permissions";

/// Errors reported by a content store operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Credential problem; retrying other listings cannot succeed
    #[error(transparent)]
    Fatal(#[from] CredentialError),

    /// Failure limited to this operation
    #[error("{0}")]
    Recoverable(String),
}

impl StoreError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Binary image ready for upload
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: Option<String>,
}

/// Asset and document persistence used by the importer
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Checks that a write credential is configured at all
    fn check_credentials(&self) -> Result<(), CredentialError> {
        Ok(())
    }

    /// Uploads an image and returns the store's asset id
    async fn upload_image(&self, image: ImageUpload) -> Result<String, StoreError>;

    /// Creates a document and returns its id
    async fn create_document(&self, document: &VehicleDocument) -> Result<String, StoreError>;
}

#[derive(Debug, Deserialize)]
struct AssetResponse {
    document: AssetDocument,
}

#[derive(Debug, Deserialize)]
struct AssetDocument {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct MutateResponse {
    #[serde(default)]
    results: Vec<MutateResult>,
}

#[derive(Debug, Deserialize)]
struct MutateResult {
    id: String,
}

/// Content store reached over its HTTP API
///
/// Assets go to `/v<version>/assets/images/<dataset>` and documents are
/// created through `/v<version>/data/mutate/<dataset>`.
pub struct HttpContentStore {
    client: Client,
    api_base: String,
    api_version: String,
    dataset: String,
    token_env: String,
    token: Option<String>,
}

impl HttpContentStore {
    pub fn new(client: Client, config: &ContentStoreConfig, token: Option<String>) -> Self {
        Self {
            client,
            api_base: config.resolved_api_base(),
            api_version: config.api_version.clone(),
            dataset: config.dataset.clone(),
            token_env: config.token_env.clone(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Reads the write token from the environment variable named in the config
    pub fn from_env(client: Client, config: &ContentStoreConfig) -> Self {
        let token = std::env::var(&config.token_env).ok();
        Self::new(client, config, token)
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/v{}/{}/{}",
            self.api_base, self.api_version, path, self.dataset
        )
    }

    fn token(&self) -> Result<&str, StoreError> {
        self.token.as_deref().ok_or_else(|| {
            StoreError::Fatal(CredentialError::Missing {
                env_var: self.token_env.clone(),
            })
        })
    }
}

#[async_trait]
impl ContentStore for HttpContentStore {
    fn check_credentials(&self) -> Result<(), CredentialError> {
        match self.token {
            Some(_) => Ok(()),
            None => Err(CredentialError::Missing {
                env_var: self.token_env.clone(),
            }),
        }
    }

    async fn upload_image(&self, image: ImageUpload) -> Result<String, StoreError> {
        let token = self.token()?;
        let url = self.api_url("assets/images");
        let content_type = image
            .content_type
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .query(&[("filename", image.filename.as_str())])
            .header(CONTENT_TYPE, content_type)
            .body(image.bytes)
            .send()
            .await
            .map_err(|e| StoreError::Recoverable(format!("Asset upload failed: {}", e)))?;

        let status = response.status();
        let body = settle_response(status, response.text().await, "Asset upload")?;

        let parsed: AssetResponse = serde_json::from_str(&body).map_err(|e| {
            StoreError::Recoverable(format!("Unexpected asset upload response: {}", e))
        })?;
        Ok(parsed.document.id)
    }

    async fn create_document(&self, document: &VehicleDocument) -> Result<String, StoreError> {
        let token = self.token()?;
        let url = self.api_url("data/mutate");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .query(&[("returnIds", "true")])
            .json(&json!({ "mutations": [ { "create": document } ] }))
            .send()
            .await
            .map_err(|e| StoreError::Recoverable(format!("Document create failed: {}", e)))?;

        let status = response.status();
        let body = settle_response(status, response.text().await, "Document create")?;

        let parsed: MutateResponse = serde_json::from_str(&body).map_err(|e| {
            StoreError::Recoverable(format!("Unexpected mutation response: {}", e))
        })?;

        parsed
            .results
            .into_iter()
            .next()
            .map(|r| r.id)
            .ok_or_else(|| StoreError::Recoverable("Mutation returned no document id".to_string()))
    }
}

/// Turns a response status and its body read into the body of a success
///
/// A credential status stays fatal even when its body cannot be read; any
/// other unreadable body fails only this operation.
fn settle_response<E: std::fmt::Display>(
    status: StatusCode,
    body: Result<String, E>,
    action: &str,
) -> Result<String, StoreError> {
    match body {
        Ok(body) if status.is_success() => Ok(body),
        Ok(body) => Err(classify_failure(status, &body)),
        Err(e) => match classify_failure(status, "") {
            fatal @ StoreError::Fatal(_) => Err(fatal),
            StoreError::Recoverable(_) => Err(StoreError::Recoverable(format!(
                "{} response unreadable: {}",
                action, e
            ))),
        },
    }
}

/// Maps a failed store response to a fatal or recoverable error
///
/// | Response | Error |
/// |----------|-------|
/// | HTTP 401 | `Fatal(Rejected)` |
/// | HTTP 403 | `Fatal(InsufficientPrivilege)` |
/// | Body mentions insufficient permissions | `Fatal(InsufficientPrivilege)` |
/// | Anything else | `Recoverable` with the store's message |
pub fn classify_failure(status: StatusCode, body: &str) -> StoreError {
    if status == StatusCode::UNAUTHORIZED {
        return StoreError::Fatal(CredentialError::Rejected);
    }

    if status == StatusCode::FORBIDDEN || body.contains(INSUFFICIENT_PERMISSIONS) {
        return StoreError::Fatal(CredentialError::InsufficientPrivilege);
    }

    StoreError::Recoverable(format!("HTTP {}: {}", status.as_u16(), error_message(body)))
}

/// Pulls a readable message out of an error body
fn error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.pointer("/error/description")
            .or_else(|| v.get("message"))
            .or_else(|| v.get("error"))
            .and_then(Value::as_str)
            .map(|s| s.to_string())
    });

    match from_json {
        Some(message) => message,
        None => body.trim().chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ContentStoreConfig {
        ContentStoreConfig {
            project_id: "abc123".to_string(),
            dataset: "production".to_string(),
            api_version: "2024-01-01".to_string(),
            token_env: "TEST_TOKEN".to_string(),
            document_type: "motorcycle".to_string(),
            api_base: None,
        }
    }

    #[test]
    fn test_classify_permission_statuses() {
        assert_eq!(
            classify_failure(StatusCode::FORBIDDEN, ""),
            StoreError::Fatal(CredentialError::InsufficientPrivilege)
        );
        assert_eq!(
            classify_failure(StatusCode::UNAUTHORIZED, ""),
            StoreError::Fatal(CredentialError::Rejected)
        );
    }

    #[test]
    fn test_classify_permission_message() {
        let body = r#"{"error":{"description":"Insufficient permissions; permission \"create\" required"}}"#;
        assert!(classify_failure(StatusCode::BAD_REQUEST, body).is_fatal());
    }

    #[test]
    fn test_classify_recoverable_uses_store_message() {
        let body = r#"{"error":{"description":"Document has invalid slug"}}"#;
        assert_eq!(
            classify_failure(StatusCode::BAD_REQUEST, body),
            StoreError::Recoverable("HTTP 400: Document has invalid slug".to_string())
        );

        let err = classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "  upstream down ");
        assert_eq!(err, StoreError::Recoverable("HTTP 500: upstream down".to_string()));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_unreadable_body_is_recoverable() {
        let read: Result<String, &str> = Err("connection reset");
        assert_eq!(
            settle_response(StatusCode::OK, read, "Document create"),
            Err(StoreError::Recoverable(
                "Document create response unreadable: connection reset".to_string()
            ))
        );

        let read: Result<String, &str> = Err("connection reset");
        assert!(matches!(
            settle_response(StatusCode::BAD_GATEWAY, read, "Asset upload"),
            Err(StoreError::Recoverable(_))
        ));

        let read: Result<String, &str> = Err("connection reset");
        assert_eq!(
            settle_response(StatusCode::UNAUTHORIZED, read, "Asset upload"),
            Err(StoreError::Fatal(CredentialError::Rejected))
        );

        let read: Result<String, &str> = Ok("{}".to_string());
        assert_eq!(settle_response(StatusCode::OK, read, "Asset upload").unwrap(), "{}");
    }

    #[test]
    fn test_api_urls() {
        let store = HttpContentStore::new(Client::new(), &config(), Some("t".to_string()));
        assert_eq!(
            store.api_url("data/mutate"),
            "https://abc123.api.sanity.io/v2024-01-01/data/mutate/production"
        );
        assert_eq!(
            store.api_url("assets/images"),
            "https://abc123.api.sanity.io/v2024-01-01/assets/images/production"
        );
    }

    #[test]
    fn test_missing_token() {
        let store = HttpContentStore::new(Client::new(), &config(), None);
        assert_eq!(
            store.check_credentials(),
            Err(CredentialError::Missing {
                env_var: "TEST_TOKEN".to_string()
            })
        );

        let blank = HttpContentStore::new(Client::new(), &config(), Some("  ".to_string()));
        assert!(blank.check_credentials().is_err());
    }

    #[tokio::test]
    async fn test_create_without_token_is_fatal() {
        let store = HttpContentStore::new(Client::new(), &config(), None);
        let listing = crate::listing::ScrapedListing {
            source_id: String::new(),
            title: "HONDA".to_string(),
            price: 0,
            kilometers: 0,
            year: 2020,
            thumbnail_url: String::new(),
            images: vec![],
            external_url: String::new(),
            selected: false,
        };
        let doc = VehicleDocument::from_listing(&listing, vec![], "motorcycle");
        let err = store.create_document(&doc).await.unwrap_err();
        assert!(err.is_fatal());
    }
}
