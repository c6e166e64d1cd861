//! Moto-Harvest: dealer catalog crawler and content store importer
//!
//! This crate scrapes a dealer's used-vehicle catalog into structured
//! listings, enriches each listing with its detail-page gallery, and imports
//! an operator-selected subset into a content store.

pub mod config;
pub mod crawler;
pub mod importer;
pub mod listing;
pub mod output;
pub mod url;

use thiserror::Error;

/// Main error type for Moto-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors that abort a whole import batch
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("{0}")]
    MalformedInput(String),
}

/// Write-credential problems reported by the content store
///
/// Each variant needs a different fix from the operator, so the messages
/// point at the specific remediation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("Configuration Error: {env_var} is missing. Add an \"Editor\" token for the content store to your environment or .env file.")]
    Missing { env_var: String },

    #[error("Authentication Failed! The content store rejected the write token. Check that the token is valid and has not been revoked.")]
    Rejected,

    #[error("Permission Denied! The write token is likely a \"Viewer\" token. Replace it with an \"Editor\" token.")]
    InsufficientPrivilege,
}

/// Result type alias for Moto-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_crawl, CrawlReport, StopReason};
pub use importer::{parse_import_request, run_import, ImportEntry};
pub use listing::{ImportResult, ImportStatus, ScrapedListing};
