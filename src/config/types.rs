use serde::Deserialize;

/// Main configuration structure for the LDES client
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub client: ClientConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

/// What to crawl and how to read it
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Starting fragment URLs
    pub urls: Vec<String>,

    /// RDF media type or format name of the fragments
    #[serde(rename = "source-format", default = "default_source_format")]
    pub source_format: String,

    /// Seconds to wait before revisiting a mutable fragment without a max-age
    #[serde(rename = "polling-interval", default = "default_polling_interval")]
    pub polling_interval: u64,

    /// Predicate holding the member timestamp
    #[serde(rename = "timestamp-path", default)]
    pub timestamp_path: Option<String>,

    /// Predicate linking a member version to the entity it versions
    #[serde(rename = "version-of-path", default)]
    pub version_of_path: Option<String>,

    /// Only supply versions newer than the last supplied version of the same entity
    #[serde(rename = "use-latest-state", default)]
    pub use_latest_state: bool,
}

/// Authentication strategy for outgoing requests
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AuthConfig {
    #[default]
    NoAuth,

    ApiKey {
        #[serde(default = "default_api_key_header")]
        header: String,
        key: String,
    },

    ClientCredentials {
        #[serde(rename = "client-id")]
        client_id: String,
        #[serde(rename = "client-secret")]
        client_secret: String,
        #[serde(rename = "token-endpoint")]
        token_endpoint: String,
        #[serde(default)]
        scope: Option<String>,
    },
}

/// Retry behaviour for failed requests
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Total attempts, the first one included
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts (milliseconds)
    #[serde(default = "default_retry_delay")]
    pub delay: u64,

    /// Additional statuses that trigger a retry
    #[serde(rename = "statuses-to-retry", default)]
    pub statuses_to_retry: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: default_max_attempts(),
            delay: default_retry_delay(),
            statuses_to_retry: Vec::new(),
        }
    }
}

/// Where crawl state lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatePersistenceStrategy {
    #[default]
    Memory,
    Sqlite,
}

/// Crawl state persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub strategy: StatePersistenceStrategy,

    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,

    /// Keep crawl state after shutdown so the next run resumes
    #[serde(rename = "keep-state", default)]
    pub keep_state: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            strategy: StatePersistenceStrategy::default(),
            database_path: default_database_path(),
            keep_state: false,
        }
    }
}

fn default_source_format() -> String {
    "text/turtle".to_string()
}

fn default_polling_interval() -> u64 {
    60
}

fn default_api_key_header() -> String {
    "X-API-KEY".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    500
}

fn default_database_path() -> String {
    "ldes-client.db".to_string()
}
