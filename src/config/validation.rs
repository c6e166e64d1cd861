use crate::config::types::{Config, ContentStoreConfig, HttpConfig, SourceConfig};
use crate::config::MAX_PAGES;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_http_config(&config.http)?;
    validate_content_store_config(&config.content_store)?;
    Ok(())
}

/// Validates the catalog source configuration
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let origin = validate_http_url(&config.origin, "origin")?;
    if origin.path() != "/" || origin.query().is_some() {
        return Err(ConfigError::InvalidUrl(format!(
            "origin must not contain a path or query, got '{}'",
            config.origin
        )));
    }

    if config.dealer_path.is_empty() {
        return Err(ConfigError::Validation(
            "dealer_path cannot be empty".to_string(),
        ));
    }

    if config.dealer_path.contains('/') {
        return Err(ConfigError::Validation(format!(
            "dealer_path must be a single path segment, got '{}'",
            config.dealer_path
        )));
    }

    if config.max_pages < 1 || config.max_pages > MAX_PAGES {
        return Err(ConfigError::Validation(format!(
            "max_pages must be between 1 and {}, got {}",
            MAX_PAGES, config.max_pages
        )));
    }

    if config.detail_concurrency < 1 || config.detail_concurrency > 20 {
        return Err(ConfigError::Validation(format!(
            "detail_concurrency must be between 1 and 20, got {}",
            config.detail_concurrency
        )));
    }

    if config.page_retries > 5 {
        return Err(ConfigError::Validation(format!(
            "page_retries must be <= 5, got {}",
            config.page_retries
        )));
    }

    Ok(())
}

/// Validates HTTP client configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Validates content store configuration
fn validate_content_store_config(config: &ContentStoreConfig) -> Result<(), ConfigError> {
    if config.project_id.is_empty()
        || !config
            .project_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "project_id must be non-empty and contain only alphanumeric characters and hyphens, got '{}'",
            config.project_id
        )));
    }

    if config.dataset.is_empty()
        || !config
            .dataset
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "dataset must be non-empty and contain only lowercase letters, digits, '_' and '-', got '{}'",
            config.dataset
        )));
    }

    validate_api_version(&config.api_version)?;

    if config.token_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "token_env cannot be empty".to_string(),
        ));
    }

    if config.document_type.trim().is_empty() {
        return Err(ConfigError::Validation(
            "document_type cannot be empty".to_string(),
        ));
    }

    if let Some(base) = &config.api_base {
        validate_http_url(base, "api_base")?;
    }

    Ok(())
}

/// Accepts "1" or a dated version such as "2024-01-01"
fn validate_api_version(version: &str) -> Result<(), ConfigError> {
    if version == "1" {
        return Ok(());
    }

    if chrono::NaiveDate::parse_from_str(version, "%Y-%m-%d").is_err() {
        return Err(ConfigError::Validation(format!(
            "api_version must be '1' or a date like '2024-01-01', got '{}'",
            version
        )));
    }

    Ok(())
}

fn validate_http_url(value: &str, field: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field, value
        )));
    }

    Ok(url)
}
