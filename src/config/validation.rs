use crate::config::types::{
    AuthConfig, ClientConfig, Config, PersistenceConfig, RetryConfig, StatePersistenceStrategy,
};
use crate::crawler::MAX_REVISIT_DELAY_SECS;
use crate::ConfigError;
use oxrdf::NamedNode;
use oxrdfio::RdfFormat;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_client_config(&config.client)?;
    validate_auth_config(&config.auth)?;
    validate_retry_config(&config.retry)?;
    validate_persistence_config(&config.persistence)?;
    Ok(())
}

/// Resolves a configured source format to an RDF format
///
/// Accepts a media type (`text/turtle`), a file extension (`ttl`) or a
/// format name (`turtle`, `n-triples`, `json-ld`, ...).
pub fn resolve_rdf_format(name: &str) -> Result<RdfFormat, ConfigError> {
    let trimmed = name.trim();
    if let Some(format) = RdfFormat::from_media_type(trimmed) {
        return Ok(format);
    }
    if let Some(format) = RdfFormat::from_extension(trimmed) {
        return Ok(format);
    }

    let format = match trimmed.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
        "turtle" => RdfFormat::Turtle,
        "ntriples" => RdfFormat::NTriples,
        "nquads" => RdfFormat::NQuads,
        "trig" => RdfFormat::TriG,
        "n3" => RdfFormat::N3,
        "rdfxml" => RdfFormat::RdfXml,
        "jsonld" => match RdfFormat::from_extension("jsonld") {
            Some(format) => format,
            None => return Err(ConfigError::UnknownFormat(name.to_string())),
        },
        _ => return Err(ConfigError::UnknownFormat(name.to_string())),
    };
    Ok(format)
}

/// Validates the crawl configuration
fn validate_client_config(config: &ClientConfig) -> Result<(), ConfigError> {
    if config.urls.is_empty() {
        return Err(ConfigError::Validation(
            "at least one starting url is required".to_string(),
        ));
    }

    for url in &config.urls {
        validate_http_url(url, "starting url")?;
    }

    resolve_rdf_format(&config.source_format)?;

    if config.polling_interval == 0 {
        return Err(ConfigError::Validation(
            "polling_interval must be >= 1 second".to_string(),
        ));
    }
    if config.polling_interval > MAX_REVISIT_DELAY_SECS {
        return Err(ConfigError::Validation(format!(
            "polling_interval must be <= {} seconds",
            MAX_REVISIT_DELAY_SECS
        )));
    }

    if let Some(path) = &config.timestamp_path {
        validate_iri(path, "timestamp-path")?;
    }
    if let Some(path) = &config.version_of_path {
        validate_iri(path, "version-of-path")?;
    }

    if config.use_latest_state
        && (config.timestamp_path.is_none() || config.version_of_path.is_none())
    {
        return Err(ConfigError::Validation(
            "use-latest-state requires both timestamp-path and version-of-path".to_string(),
        ));
    }

    Ok(())
}

/// Validates the authentication configuration
fn validate_auth_config(config: &AuthConfig) -> Result<(), ConfigError> {
    match config {
        AuthConfig::NoAuth => Ok(()),
        AuthConfig::ApiKey { header, key } => {
            if header.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "api key header cannot be empty".to_string(),
                ));
            }
            if key.is_empty() {
                return Err(ConfigError::Validation("api key cannot be empty".to_string()));
            }
            Ok(())
        }
        AuthConfig::ClientCredentials {
            client_id,
            client_secret,
            token_endpoint,
            ..
        } => {
            if client_id.is_empty() || client_secret.is_empty() {
                return Err(ConfigError::Validation(
                    "client-id and client-secret cannot be empty".to_string(),
                ));
            }
            validate_http_url(token_endpoint, "token-endpoint")
        }
    }
}

/// Validates the retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    for status in &config.statuses_to_retry {
        if !(100..=599).contains(status) {
            return Err(ConfigError::Validation(format!(
                "statuses-to-retry contains an invalid HTTP status: {}",
                status
            )));
        }
    }

    Ok(())
}

/// Validates the persistence configuration
fn validate_persistence_config(config: &PersistenceConfig) -> Result<(), ConfigError> {
    if config.strategy == StatePersistenceStrategy::Sqlite && config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates that a URL parses and uses http or https
fn validate_http_url(value: &str, what: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, value, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            what, value
        )));
    }

    Ok(())
}

fn validate_iri(value: &str, what: &str) -> Result<(), ConfigError> {
    NamedNode::new(value)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidIri(format!("{} '{}': {}", what, value, e)))
}
