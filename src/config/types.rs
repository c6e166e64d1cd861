use serde::Deserialize;

/// Main configuration structure for Moto-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(rename = "content-store")]
    pub content_store: ContentStoreConfig,
}

/// Dealer catalog being crawled
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Scheme and host of the catalog site (e.g. "https://dealer.moto.it")
    pub origin: String,

    /// Dealer segment of the catalog paths (e.g. "avanzimoto")
    #[serde(rename = "dealer-path")]
    pub dealer_path: String,

    /// Maximum number of listing pages to visit
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Number of detail pages fetched together in one batch
    #[serde(rename = "detail-concurrency", default = "default_detail_concurrency")]
    pub detail_concurrency: usize,

    /// Extra attempts for a transient fetch failure (0 disables retrying)
    #[serde(rename = "page-retries", default)]
    pub page_retries: u32,

    /// Delay between retry attempts (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// Outbound HTTP client settings
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Content store the import writes to
#[derive(Debug, Clone, Deserialize)]
pub struct ContentStoreConfig {
    #[serde(rename = "project-id")]
    pub project_id: String,

    pub dataset: String,

    #[serde(rename = "api-version", default = "default_api_version")]
    pub api_version: String,

    /// Name of the environment variable holding the write token
    #[serde(rename = "token-env", default = "default_token_env")]
    pub token_env: String,

    /// Document type created for each imported listing
    #[serde(rename = "document-type", default = "default_document_type")]
    pub document_type: String,

    /// Overrides the API host derived from the project id
    #[serde(rename = "api-base", default)]
    pub api_base: Option<String>,
}

impl ContentStoreConfig {
    /// Returns the API host, e.g. "https://abc123.api.sanity.io"
    pub fn resolved_api_base(&self) -> String {
        match &self.api_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}.api.sanity.io", self.project_id),
        }
    }
}

fn default_max_pages() -> u32 {
    10
}

fn default_detail_concurrency() -> usize {
    5
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_api_version() -> String {
    "2024-01-01".to_string()
}

fn default_token_env() -> String {
    "SANITY_API_TOKEN".to_string()
}

fn default_document_type() -> String {
    "motorcycle".to_string()
}
