//! ldes-client: a Linked Data Event Stream client
//!
//! This crate crawls the fragments of an LDES, tracks which fragments may still
//! change and when they can be revisited, deduplicates members across
//! fragments, and hands every member to the caller exactly once.

pub mod config;
pub mod crawler;
pub mod executor;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for LDES client operations
#[derive(Debug, Error)]
pub enum LdesError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(reqwest::Error),

    #[error("Invalid request header: {0}")]
    InvalidHeader(String),

    #[error("Cannot handle response {status} of tree node {url}")]
    UnexpectedStatus { url: String, status: u16 },

    #[error("Redirect from {url} has no Location header")]
    MissingLocation { url: String },

    #[error("Response from {url} has no body")]
    MissingBody { url: String },

    #[error("RDF parse error for {url}: {message}")]
    RdfParse { url: String, message: String },

    #[error("Request to {url} is still unauthorized after refreshing the token")]
    Unauthorized { url: String },

    #[error("Token acquisition failed: {0}")]
    TokenAcquisition(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),
}

impl LdesError {
    /// Returns true for transport-level failures (connection, timeout, body read)
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http { .. })
    }
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

    #[error("Invalid IRI in config: {0}")]
    InvalidIri(String),

    #[error("Unknown RDF format: {0}")]
    UnknownFormat(String),
}

/// Result type alias for LDES client operations
pub type Result<T> = std::result::Result<T, LdesError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{MemberSupplier, StopHandle, SuppliedMember, TreeNodeProcessor};
pub use state::{FragmentStatus, MemberStatus};
